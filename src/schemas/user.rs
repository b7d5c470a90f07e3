use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct UserCreate {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub(crate) password: String,
    pub(crate) role: UserRole,
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, message = "first_name must not be empty"))]
    pub(crate) first_name: String,
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, message = "last_name must not be empty"))]
    pub(crate) last_name: String,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(default = "default_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
    #[serde(default)]
    #[serde(alias = "teacherId")]
    pub(crate) teacher_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "studentId")]
    pub(crate) student_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) role: UserRole,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) phone: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) teacher_id: Option<String>,
    pub(crate) student_id: Option<String>,
    pub(crate) last_login_at: Option<String>,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            is_active: user.is_active,
            teacher_id: user.teacher_id,
            student_id: user.student_id,
            last_login_at: user.last_login_at.map(format_primitive),
            created_at: format_primitive(user.created_at),
        }
    }
}

fn default_true() -> bool {
    true
}
