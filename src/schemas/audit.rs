use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::AuditLog;

/// Filter half of the audit listing query; pagination and sorting ride in
/// the shared `PageParams`.
#[derive(Debug, Deserialize)]
pub(crate) struct AuditListQuery {
    #[serde(default)]
    pub(crate) user_id: Option<String>,
    #[serde(default)]
    pub(crate) resource: Option<String>,
    #[serde(default)]
    pub(crate) resource_id: Option<String>,
    #[serde(default)]
    pub(crate) action: Option<String>,
    #[serde(default)]
    pub(crate) from: Option<String>,
    #[serde(default)]
    pub(crate) to: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuditLogResponse {
    pub(crate) id: String,
    pub(crate) user_id: Option<String>,
    pub(crate) request_id: String,
    pub(crate) action: String,
    pub(crate) resource: String,
    pub(crate) resource_id: String,
    pub(crate) old_value: Option<serde_json::Value>,
    pub(crate) new_value: Option<serde_json::Value>,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) success: bool,
    pub(crate) error_msg: Option<String>,
    pub(crate) created_at: String,
}

impl AuditLogResponse {
    pub(crate) fn from_db(log: AuditLog) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            request_id: log.request_id,
            action: log.action,
            resource: log.resource,
            resource_id: log.resource_id,
            old_value: log.old_value.map(|value| value.0),
            new_value: log.new_value.map(|value| value.0),
            ip_address: log.ip_address,
            user_agent: log.user_agent,
            success: log.success,
            error_msg: log.error_msg,
            created_at: format_primitive(log.created_at),
        }
    }
}
