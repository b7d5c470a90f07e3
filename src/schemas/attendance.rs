use serde::{Deserialize, Serialize};
use time::Date;

use crate::core::time::format_primitive;
use crate::db::models::Attendance;
use crate::db::types::AttendanceStatus;
use crate::schemas::{deserialize_date, format_date};

#[derive(Debug, Deserialize)]
pub(crate) struct AttendanceEntryUpsert {
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    pub(crate) status: AttendanceStatus,
    #[serde(default)]
    pub(crate) note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttendanceBatchRequest {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) date: Date,
    pub(crate) entries: Vec<AttendanceEntryUpsert>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttendanceResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) group_id: String,
    pub(crate) date: String,
    pub(crate) status: AttendanceStatus,
    pub(crate) note: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl AttendanceResponse {
    pub(crate) fn from_db(attendance: Attendance) -> Self {
        Self {
            id: attendance.id,
            student_id: attendance.student_id,
            group_id: attendance.group_id,
            date: format_date(attendance.date),
            status: attendance.status,
            note: attendance.note,
            created_at: format_primitive(attendance.created_at),
            updated_at: format_primitive(attendance.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttendanceBatchResponse {
    pub(crate) date: String,
    pub(crate) records: Vec<AttendanceResponse>,
}
