use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime, Time};

use crate::db::types::{
    ApplicationStatus, AttendanceStatus, Cadence, EnrollmentStatus, GroupState, InvoiceStatus,
    UserRole, WaitlistStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) role: UserRole,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) phone: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) teacher_id: Option<String>,
    pub(crate) student_id: Option<String>,
    pub(crate) last_login_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Session {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) token_hash: String,
    pub(crate) issued_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) last_seen_at: PrimitiveDateTime,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) revoked_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AuditLog {
    pub(crate) id: String,
    pub(crate) seq: i64,
    pub(crate) user_id: Option<String>,
    pub(crate) request_id: String,
    pub(crate) action: String,
    pub(crate) resource: String,
    pub(crate) resource_id: String,
    pub(crate) old_value: Option<Json<serde_json::Value>>,
    pub(crate) new_value: Option<Json<serde_json::Value>>,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) success: bool,
    pub(crate) error_msg: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Teacher {
    pub(crate) id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Group {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) course_id: String,
    pub(crate) teacher_id: Option<String>,
    pub(crate) capacity: i32,
    pub(crate) start_date: Date,
    pub(crate) end_date: Date,
    pub(crate) state: GroupState,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Enrollment {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) group_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attendance {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) group_id: String,
    pub(crate) date: Date,
    pub(crate) status: AttendanceStatus,
    pub(crate) note: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TimetableEntry {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) weekday: i16,
    pub(crate) start_time: Time,
    pub(crate) end_time: Time,
    pub(crate) room: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) title: String,
    pub(crate) starts_at: PrimitiveDateTime,
    pub(crate) ends_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct CalendarEvent {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) starts_at: PrimitiveDateTime,
    pub(crate) ends_at: PrimitiveDateTime,
    pub(crate) group_id: Option<String>,
    pub(crate) course_id: Option<String>,
    pub(crate) teacher_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Application {
    pub(crate) id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) course_id: String,
    pub(crate) status: ApplicationStatus,
    pub(crate) reviewer_id: Option<String>,
    pub(crate) reviewed_at: Option<PrimitiveDateTime>,
    pub(crate) student_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct RecurringInvoiceSchedule {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) amount_cents: i64,
    pub(crate) currency: String,
    pub(crate) cadence: Cadence,
    pub(crate) anchor_date: Date,
    pub(crate) next_due_date: Date,
    pub(crate) active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Invoice {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) schedule_id: Option<String>,
    pub(crate) amount_cents: i64,
    pub(crate) currency: String,
    pub(crate) period_start: Date,
    pub(crate) period_end: Date,
    pub(crate) due_date: Date,
    pub(crate) status: InvoiceStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct WaitlistEntry {
    pub(crate) id: String,
    pub(crate) group_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) position: i32,
    pub(crate) joined_at: PrimitiveDateTime,
    pub(crate) status: WaitlistStatus,
    pub(crate) offered_at: Option<PrimitiveDateTime>,
    pub(crate) student_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
