use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::AuditLog;

const COLUMNS: &str = "\
    id, seq, user_id, request_id, action, resource, resource_id, old_value, \
    new_value, ip_address, user_agent, success, error_msg, created_at";

pub(crate) struct InsertAuditLog<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: Option<&'a str>,
    pub(crate) request_id: &'a str,
    pub(crate) action: &'a str,
    pub(crate) resource: &'a str,
    pub(crate) resource_id: &'a str,
    pub(crate) old_value: Option<serde_json::Value>,
    pub(crate) new_value: Option<serde_json::Value>,
    pub(crate) ip_address: Option<&'a str>,
    pub(crate) user_agent: Option<&'a str>,
    pub(crate) success: bool,
    pub(crate) error_msg: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    row: InsertAuditLog<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_logs (
            id, user_id, request_id, action, resource, resource_id,
            old_value, new_value, ip_address, user_agent, success, error_msg, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)",
    )
    .bind(row.id)
    .bind(row.user_id)
    .bind(row.request_id)
    .bind(row.action)
    .bind(row.resource)
    .bind(row.resource_id)
    .bind(row.old_value)
    .bind(row.new_value)
    .bind(row.ip_address)
    .bind(row.user_agent)
    .bind(row.success)
    .bind(row.error_msg)
    .bind(row.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[derive(Debug, Default)]
pub(crate) struct AuditFilter<'a> {
    pub(crate) user_id: Option<&'a str>,
    pub(crate) resource: Option<&'a str>,
    pub(crate) resource_id: Option<&'a str>,
    pub(crate) action: Option<&'a str>,
    pub(crate) search: Option<&'a str>,
    pub(crate) from: Option<PrimitiveDateTime>,
    pub(crate) to: Option<PrimitiveDateTime>,
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &AuditFilter<'a>) {
    builder.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(resource) = filter.resource {
        builder.push(" AND resource = ").push_bind(resource);
    }
    if let Some(resource_id) = filter.resource_id {
        builder.push(" AND resource_id = ").push_bind(resource_id);
    }
    if let Some(action) = filter.action {
        builder.push(" AND action = ").push_bind(action);
    }
    if let Some(search) = filter.search {
        let pattern = format!("%{search}%");
        builder.push(" AND (action ILIKE ").push_bind(pattern.clone());
        builder.push(" OR resource ILIKE ").push_bind(pattern.clone());
        builder.push(" OR resource_id ILIKE ").push_bind(pattern);
        builder.push(")");
    }
    if let Some(from) = filter.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
}

/// `sort` and `order` come from the handler's whitelist, never from raw
/// input; seq breaks created_at ties deterministically.
pub(crate) async fn list(
    pool: &PgPool,
    filter: &AuditFilter<'_>,
    sort: &'static str,
    order: &'static str,
    offset: i64,
    limit: i64,
) -> Result<Vec<AuditLog>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM audit_logs"));
    push_filters(&mut builder, filter);
    builder.push(format!(" ORDER BY {sort} {order}, seq {order} OFFSET "));
    builder.push_bind(offset.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit);

    builder.build_query_as::<AuditLog>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    filter: &AuditFilter<'_>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM audit_logs");
    push_filters(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn list_for_resource(
    executor: impl sqlx::PgExecutor<'_>,
    resource: &str,
    resource_id: &str,
) -> Result<Vec<AuditLog>, sqlx::Error> {
    sqlx::query_as::<_, AuditLog>(&format!(
        "SELECT {COLUMNS} FROM audit_logs \
         WHERE resource = $1 AND resource_id = $2 \
         ORDER BY created_at ASC, seq ASC"
    ))
    .bind(resource)
    .bind(resource_id)
    .fetch_all(executor)
    .await
}
