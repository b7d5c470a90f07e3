use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Application;
use crate::db::types::ApplicationStatus;
use crate::services::transitions::ReviewDecision;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ApplicationCreate {
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, message = "first_name must not be empty"))]
    pub(crate) first_name: String,
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, message = "last_name must not be empty"))]
    pub(crate) last_name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(alias = "courseId")]
    pub(crate) course_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewRequest {
    pub(crate) decision: ReviewDecision,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnrollRequest {
    #[serde(alias = "groupId")]
    pub(crate) group_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ApplicationResponse {
    pub(crate) id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) course_id: String,
    pub(crate) status: ApplicationStatus,
    pub(crate) reviewer_id: Option<String>,
    pub(crate) reviewed_at: Option<String>,
    pub(crate) student_id: Option<String>,
    pub(crate) created_at: String,
}

impl ApplicationResponse {
    pub(crate) fn from_db(application: Application) -> Self {
        Self {
            id: application.id,
            first_name: application.first_name,
            last_name: application.last_name,
            email: application.email,
            phone: application.phone,
            course_id: application.course_id,
            status: application.status,
            reviewer_id: application.reviewer_id,
            reviewed_at: application.reviewed_at.map(format_primitive),
            student_id: application.student_id,
            created_at: format_primitive(application.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrollResponse {
    pub(crate) application: ApplicationResponse,
    pub(crate) group_id: String,
    pub(crate) student_id: String,
}
