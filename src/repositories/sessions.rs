use sqlx::PgPool;

use crate::db::models::Session;

pub(crate) const COLUMNS: &str = "\
    id, user_id, token_hash, issued_at, expires_at, last_seen_at, \
    ip_address, user_agent, revoked_at";

pub(crate) struct CreateSession<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) token_hash: &'a str,
    pub(crate) issued_at: time::PrimitiveDateTime,
    pub(crate) expires_at: time::PrimitiveDateTime,
    pub(crate) ip_address: Option<&'a str>,
    pub(crate) user_agent: Option<&'a str>,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    session: CreateSession<'_>,
) -> Result<Session, sqlx::Error> {
    sqlx::query_as::<_, Session>(&format!(
        "INSERT INTO sessions (
            id, user_id, token_hash, issued_at, expires_at, last_seen_at,
            ip_address, user_agent
        ) VALUES ($1,$2,$3,$4,$5,$4,$6,$7)
        RETURNING {COLUMNS}",
    ))
    .bind(session.id)
    .bind(session.user_id)
    .bind(session.token_hash)
    .bind(session.issued_at)
    .bind(session.expires_at)
    .bind(session.ip_address)
    .bind(session.user_agent)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_token_hash(
    executor: impl sqlx::PgExecutor<'_>,
    token_hash: &str,
) -> Result<Option<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(&format!("SELECT {COLUMNS} FROM sessions WHERE token_hash = $1"))
        .bind(token_hash)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn list_active_for_user(
    pool: &PgPool,
    user_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Vec<Session>, sqlx::Error> {
    sqlx::query_as::<_, Session>(&format!(
        "SELECT {COLUMNS} FROM sessions \
         WHERE user_id = $1 AND revoked_at IS NULL AND expires_at > $2 \
         ORDER BY issued_at DESC"
    ))
    .bind(user_id)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Revoke one session, owner-scoped. Returns false when the session does
/// not exist, belongs to someone else, or is already revoked.
pub(crate) async fn revoke_for_user(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    user_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE sessions SET revoked_at = $1 \
         WHERE id = $2 AND user_id = $3 AND revoked_at IS NULL",
    )
    .bind(now)
    .bind(id)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn revoke_all_for_user(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE sessions SET revoked_at = $1 WHERE user_id = $2 AND revoked_at IS NULL")
            .bind(now)
            .bind(user_id)
            .execute(executor)
            .await?;

    Ok(result.rows_affected())
}

/// Coalesced activity tracking: the row only updates when the stored
/// last_seen_at is older than the caller's staleness cutoff, keeping this
/// at most one write per session per minute.
pub(crate) async fn touch_last_seen(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: time::PrimitiveDateTime,
    stale_before: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE sessions SET last_seen_at = $1 WHERE id = $2 AND last_seen_at < $3")
        .bind(now)
        .bind(id)
        .bind(stale_before)
        .execute(executor)
        .await?;
    Ok(())
}
