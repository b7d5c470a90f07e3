use crate::db::models::WaitlistEntry;
use crate::db::types::WaitlistStatus;

const COLUMNS: &str = "\
    id, group_id, first_name, last_name, email, position, joined_at, status, \
    offered_at, student_id, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<WaitlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WaitlistEntry>(&format!(
        "SELECT {COLUMNS} FROM waitlist_entries WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Locked re-read, taken after the owning group row lock.
pub(crate) async fn find_by_id_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<WaitlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WaitlistEntry>(&format!(
        "SELECT {COLUMNS} FROM waitlist_entries WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn max_waiting_position(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), 0) FROM waitlist_entries \
         WHERE group_id = $1 AND status = $2",
    )
    .bind(group_id)
    .bind(WaitlistStatus::Waiting)
    .fetch_one(executor)
    .await
}

pub(crate) struct CreateWaitlistEntry<'a> {
    pub(crate) id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) first_name: &'a str,
    pub(crate) last_name: &'a str,
    pub(crate) email: &'a str,
    pub(crate) position: i32,
    pub(crate) now: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateWaitlistEntry<'_>,
) -> Result<WaitlistEntry, sqlx::Error> {
    sqlx::query_as::<_, WaitlistEntry>(&format!(
        "INSERT INTO waitlist_entries (
            id, group_id, first_name, last_name, email, position, joined_at,
            status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$7,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.group_id)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.email)
    .bind(params.position)
    .bind(params.now)
    .bind(WaitlistStatus::Waiting)
    .fetch_one(executor)
    .await
}

pub(crate) async fn set_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: WaitlistStatus,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE waitlist_entries SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn set_offered(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE waitlist_entries SET status = $1, offered_at = $2, updated_at = $2 WHERE id = $3",
    )
    .bind(WaitlistStatus::Offered)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn set_accepted(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    student_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE waitlist_entries \
         SET status = $1, student_id = $2, updated_at = $3 WHERE id = $4",
    )
    .bind(WaitlistStatus::Accepted)
    .bind(student_id)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Close the gap an entry leaves behind: every waiting entry ranked below
/// it moves up one. Runs under the group row lock.
pub(crate) async fn compact_after(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
    vacated_position: i32,
    now: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE waitlist_entries \
         SET position = position - 1, updated_at = $3 \
         WHERE group_id = $1 AND status = $4 AND position > $2",
    )
    .bind(group_id)
    .bind(vacated_position)
    .bind(now)
    .bind(WaitlistStatus::Waiting)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn list_waiting(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
) -> Result<Vec<WaitlistEntry>, sqlx::Error> {
    sqlx::query_as::<_, WaitlistEntry>(&format!(
        "SELECT {COLUMNS} FROM waitlist_entries \
         WHERE group_id = $1 AND status = $2 \
         ORDER BY position"
    ))
    .bind(group_id)
    .bind(WaitlistStatus::Waiting)
    .fetch_all(executor)
    .await
}
