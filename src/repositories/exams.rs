use time::PrimitiveDateTime;

use crate::db::models::Exam;

const COLUMNS: &str = "id, group_id, title, starts_at, ends_at, created_at, updated_at, deleted_at";

/// Live exams of every group in the course. Exam scope is course-transitive
/// (a cohort cannot sit two exams at once, and a course's groups share
/// examiners and rooms), so the course is the scope unit; overlap is
/// decided by the caller.
pub(crate) async fn list_for_course(
    executor: impl sqlx::PgExecutor<'_>,
    course_id: &str,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(
        "SELECT e.id, e.group_id, e.title, e.starts_at, e.ends_at, \
                e.created_at, e.updated_at, e.deleted_at \
         FROM exams e \
         JOIN groups g ON g.id = e.group_id \
         WHERE e.deleted_at IS NULL AND g.course_id = $1",
    )
    .bind(course_id)
    .fetch_all(executor)
    .await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) starts_at: PrimitiveDateTime,
    pub(crate) ends_at: PrimitiveDateTime,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateExam<'_>,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (id, group_id, title, starts_at, ends_at, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.group_id)
    .bind(params.title)
    .bind(params.starts_at)
    .bind(params.ends_at)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}
