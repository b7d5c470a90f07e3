use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Staff,
    Teacher,
    Student,
    Parent,
}

impl UserRole {
    pub(crate) fn is_staff(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Staff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "groupstate", rename_all = "lowercase")]
pub(crate) enum GroupState {
    Planned,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "enrollmentstatus", rename_all = "lowercase")]
pub(crate) enum EnrollmentStatus {
    Enrolled,
    Withdrawn,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attendancestatus", rename_all = "lowercase")]
pub(crate) enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "applicationstatus", rename_all = "snake_case")]
pub(crate) enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Enrolled,
    Withdrawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "invoicestatus", rename_all = "lowercase")]
pub(crate) enum InvoiceStatus {
    Draft,
    Issued,
    Paid,
    Overdue,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "invoicecadence", rename_all = "lowercase")]
pub(crate) enum Cadence {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "waitliststatus", rename_all = "lowercase")]
pub(crate) enum WaitlistStatus {
    Waiting,
    Offered,
    Accepted,
    Declined,
    Expired,
}
