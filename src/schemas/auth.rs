use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Session;
use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    pub(crate) token: String,
    pub(crate) session_id: String,
    pub(crate) expires_at: String,
    pub(crate) user: UserResponse,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) issued_at: String,
    pub(crate) expires_at: String,
    pub(crate) last_seen_at: String,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
}

impl SessionResponse {
    pub(crate) fn from_db(session: Session) -> Self {
        Self {
            id: session.id,
            issued_at: format_primitive(session.issued_at),
            expires_at: format_primitive(session.expires_at),
            last_seen_at: format_primitive(session.last_seen_at),
            ip_address: session.ip_address,
            user_agent: session.user_agent,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RevokedResponse {
    pub(crate) revoked: u64,
}
