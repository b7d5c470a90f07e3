use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::WaitlistEntry;
use crate::db::types::WaitlistStatus;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct WaitlistJoinRequest {
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, message = "first_name must not be empty"))]
    pub(crate) first_name: String,
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, message = "last_name must not be empty"))]
    pub(crate) last_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct WaitlistEntryResponse {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) position: i32,
    pub(crate) joined_at: String,
    pub(crate) status: WaitlistStatus,
    pub(crate) offered_at: Option<String>,
    pub(crate) student_id: Option<String>,
}

impl WaitlistEntryResponse {
    pub(crate) fn from_db(entry: WaitlistEntry) -> Self {
        Self {
            id: entry.id,
            group_id: entry.group_id,
            first_name: entry.first_name,
            last_name: entry.last_name,
            email: entry.email,
            position: entry.position,
            joined_at: format_primitive(entry.joined_at),
            status: entry.status,
            offered_at: entry.offered_at.map(format_primitive),
            student_id: entry.student_id,
        }
    }
}
