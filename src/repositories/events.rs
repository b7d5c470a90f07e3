use time::PrimitiveDateTime;

use crate::db::models::CalendarEvent;

const COLUMNS: &str = "\
    id, title, starts_at, ends_at, group_id, course_id, teacher_id, \
    created_at, updated_at, deleted_at";

/// Live events sharing any scope key the candidate sets. Unset keys on
/// either side do not collide; overlap is decided by the caller.
pub(crate) async fn list_in_scope(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: Option<&str>,
    course_id: Option<&str>,
    teacher_id: Option<&str>,
) -> Result<Vec<CalendarEvent>, sqlx::Error> {
    sqlx::query_as::<_, CalendarEvent>(&format!(
        "SELECT {COLUMNS} FROM calendar_events \
         WHERE deleted_at IS NULL \
           AND (($1::text IS NOT NULL AND group_id = $1) \
             OR ($2::text IS NOT NULL AND course_id = $2) \
             OR ($3::text IS NOT NULL AND teacher_id = $3))"
    ))
    .bind(group_id)
    .bind(course_id)
    .bind(teacher_id)
    .fetch_all(executor)
    .await
}

pub(crate) struct CreateCalendarEvent<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) starts_at: PrimitiveDateTime,
    pub(crate) ends_at: PrimitiveDateTime,
    pub(crate) group_id: Option<&'a str>,
    pub(crate) course_id: Option<&'a str>,
    pub(crate) teacher_id: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateCalendarEvent<'_>,
) -> Result<CalendarEvent, sqlx::Error> {
    sqlx::query_as::<_, CalendarEvent>(&format!(
        "INSERT INTO calendar_events (
            id, title, starts_at, ends_at, group_id, course_id, teacher_id, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.starts_at)
    .bind(params.ends_at)
    .bind(params.group_id)
    .bind(params.course_id)
    .bind(params.teacher_id)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}
