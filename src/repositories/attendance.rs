use time::Date;

use crate::db::models::Attendance;
use crate::db::types::AttendanceStatus;

const COLUMNS: &str = "id, student_id, group_id, date, status, note, created_at, updated_at";

pub(crate) struct UpsertAttendance<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) date: Date,
    pub(crate) status: AttendanceStatus,
    pub(crate) note: Option<&'a str>,
    pub(crate) now: time::PrimitiveDateTime,
}

/// Insert-or-update on the (student, group, date) key. The insert id is
/// only used for fresh rows; an update keeps the original id and
/// created_at and refreshes status, note and updated_at.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAttendance<'_>,
) -> Result<Attendance, sqlx::Error> {
    sqlx::query_as::<_, Attendance>(&format!(
        "INSERT INTO attendance (id, student_id, group_id, date, status, note, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,$6,$7,$7)
         ON CONFLICT (student_id, group_id, date)
         DO UPDATE SET status = EXCLUDED.status, note = EXCLUDED.note, updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.group_id)
    .bind(params.date)
    .bind(params.status)
    .bind(params.note)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_for_group_date(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
    date: Date,
) -> Result<Vec<Attendance>, sqlx::Error> {
    sqlx::query_as::<_, Attendance>(&format!(
        "SELECT {COLUMNS} FROM attendance WHERE group_id = $1 AND date = $2 ORDER BY student_id"
    ))
    .bind(group_id)
    .bind(date)
    .fetch_all(executor)
    .await
}
