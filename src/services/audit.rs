use serde_json::Value;
use uuid::Uuid;

use crate::api::context::RequestContext;
use crate::core::time::primitive_now_utc;
use crate::repositories;

const REDACTED: &str = "[REDACTED]";
const SENSITIVE_KEYS: &[&str] = &["password", "password_hash", "token", "token_hash"];

/// One mutation worth of audit data. `record` must run on the same
/// transaction as the mutation it describes so the row commits iff the
/// mutation commits.
pub(crate) struct AuditEvent<'a> {
    pub(crate) user_id: Option<&'a str>,
    pub(crate) action: &'a str,
    pub(crate) resource: &'a str,
    pub(crate) resource_id: &'a str,
    pub(crate) old_value: Option<Value>,
    pub(crate) new_value: Option<Value>,
    pub(crate) success: bool,
    pub(crate) error_msg: Option<&'a str>,
}

pub(crate) async fn record(
    executor: impl sqlx::PgExecutor<'_>,
    ctx: &RequestContext,
    event: AuditEvent<'_>,
) -> Result<(), sqlx::Error> {
    repositories::audit::insert(
        executor,
        repositories::audit::InsertAuditLog {
            id: &Uuid::new_v4().to_string(),
            user_id: event.user_id,
            request_id: &ctx.request_id,
            action: event.action,
            resource: event.resource,
            resource_id: event.resource_id,
            old_value: event.old_value.map(redact),
            new_value: event.new_value.map(redact),
            ip_address: ctx.ip_address.as_deref(),
            user_agent: ctx.user_agent.as_deref(),
            success: event.success,
            error_msg: event.error_msg,
            created_at: primitive_now_utc(),
        },
    )
    .await
}

/// Replace the values of credential-bearing keys anywhere in the snapshot.
pub(crate) fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| {
                    if SENSITIVE_KEYS.contains(&key.as_str()) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact(inner))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::redact;
    use serde_json::json;

    #[test]
    fn redacts_sensitive_keys_recursively() {
        let value = json!({
            "email": "ada@x.io",
            "password": "hunter2",
            "nested": { "token_hash": "abc123", "note": "keep" },
            "items": [{ "password_hash": "xyz" }]
        });

        let redacted = redact(value);

        assert_eq!(redacted["email"], "ada@x.io");
        assert_eq!(redacted["password"], "[REDACTED]");
        assert_eq!(redacted["nested"]["token_hash"], "[REDACTED]");
        assert_eq!(redacted["nested"]["note"], "keep");
        assert_eq!(redacted["items"][0]["password_hash"], "[REDACTED]");
    }

    #[test]
    fn leaves_scalars_untouched() {
        assert_eq!(redact(json!("plain")), json!("plain"));
        assert_eq!(redact(json!(42)), json!(42));
    }
}
