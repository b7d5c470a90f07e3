/// Transaction-scoped advisory lock keyed by name; released automatically
/// at commit or rollback. Used for contention scopes that have no single
/// owning row (rooms, course-wide exam windows).
pub(crate) async fn advisory_xact_lock(
    executor: impl sqlx::PgExecutor<'_>,
    key: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(key)
        .execute(executor)
        .await?;
    Ok(())
}
