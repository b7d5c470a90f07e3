use time::Time;

use crate::db::models::TimetableEntry;

const COLUMNS: &str = "\
    id, group_id, weekday, start_time, end_time, room, created_at, updated_at, deleted_at";

/// Live entries sharing a scope key with the candidate: same group on that
/// weekday, or same room when both sides name one. Overlap itself is
/// decided by the caller.
pub(crate) async fn list_in_scope(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
    weekday: i16,
    room: Option<&str>,
) -> Result<Vec<TimetableEntry>, sqlx::Error> {
    sqlx::query_as::<_, TimetableEntry>(&format!(
        "SELECT {COLUMNS} FROM timetable_entries \
         WHERE deleted_at IS NULL \
           AND weekday = $1 \
           AND (group_id = $2 OR ($3::text IS NOT NULL AND room = $3))"
    ))
    .bind(weekday)
    .bind(group_id)
    .bind(room)
    .fetch_all(executor)
    .await
}

pub(crate) struct CreateTimetableEntry<'a> {
    pub(crate) id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) weekday: i16,
    pub(crate) start_time: Time,
    pub(crate) end_time: Time,
    pub(crate) room: Option<&'a str>,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateTimetableEntry<'_>,
) -> Result<TimetableEntry, sqlx::Error> {
    sqlx::query_as::<_, TimetableEntry>(&format!(
        "INSERT INTO timetable_entries (
            id, group_id, weekday, start_time, end_time, room, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.group_id)
    .bind(params.weekday)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(params.room)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}
