use crate::db::models::Application;
use crate::db::types::ApplicationStatus;

const COLUMNS: &str = "\
    id, first_name, last_name, email, phone, course_id, status, reviewer_id, \
    reviewed_at, student_id, created_at, updated_at, deleted_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Application>, sqlx::Error> {
    sqlx::query_as::<_, Application>(&format!(
        "SELECT {COLUMNS} FROM applications WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Locked read for state transitions; concurrent reviews of the same
/// application serialise here.
pub(crate) async fn find_by_id_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Application>, sqlx::Error> {
    sqlx::query_as::<_, Application>(&format!(
        "SELECT {COLUMNS} FROM applications WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateApplication<'a> {
    pub(crate) id: &'a str,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) phone: Option<&'a str>,
    pub(crate) course_id: &'a str,
    pub(crate) status: ApplicationStatus,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateApplication<'_>,
) -> Result<Application, sqlx::Error> {
    sqlx::query_as::<_, Application>(&format!(
        "INSERT INTO applications (
            id, first_name, last_name, email, phone, course_id, status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.email)
    .bind(params.phone)
    .bind(params.course_id)
    .bind(params.status)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn set_reviewed(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: ApplicationStatus,
    reviewer_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE applications \
         SET status = $1, reviewer_id = $2, reviewed_at = $3, updated_at = $3 \
         WHERE id = $4",
    )
    .bind(status)
    .bind(reviewer_id)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn set_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: ApplicationStatus,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE applications SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn set_enrolled(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    student_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE applications SET status = $1, student_id = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(ApplicationStatus::Enrolled)
    .bind(student_id)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}
