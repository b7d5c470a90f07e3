use crate::db::models::Enrollment;
use crate::db::types::EnrollmentStatus;

const COLUMNS: &str = "id, student_id, group_id, status, created_at, updated_at";

/// Count of students currently occupying a seat; withdrawn and completed
/// enrollments do not.
pub(crate) async fn count_enrolled(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE group_id = $1 AND status = $2")
        .bind(group_id)
        .bind(EnrollmentStatus::Enrolled)
        .fetch_one(executor)
        .await
}

pub(crate) async fn is_enrolled(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    group_id: &str,
) -> Result<bool, sqlx::Error> {
    let row: Option<i32> = sqlx::query_scalar(
        "SELECT 1 FROM enrollments WHERE student_id = $1 AND group_id = $2 AND status = $3",
    )
    .bind(student_id)
    .bind(group_id)
    .bind(EnrollmentStatus::Enrolled)
    .fetch_optional(executor)
    .await?;

    Ok(row.is_some())
}

pub(crate) async fn enrolled_student_ids(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT student_id FROM enrollments WHERE group_id = $1 AND status = $2")
        .bind(group_id)
        .bind(EnrollmentStatus::Enrolled)
        .fetch_all(executor)
        .await
}

pub(crate) struct CreateEnrollment<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) status: EnrollmentStatus,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateEnrollment<'_>,
) -> Result<Enrollment, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(&format!(
        "INSERT INTO enrollments (id, student_id, group_id, status, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.group_id)
    .bind(params.status)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}
