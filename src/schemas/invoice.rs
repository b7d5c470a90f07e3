use serde::{Deserialize, Serialize};
use time::Date;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Invoice, RecurringInvoiceSchedule};
use crate::db::types::{Cadence, InvoiceStatus};
use crate::schemas::{deserialize_date, format_date};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ScheduleCreate {
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    #[serde(alias = "amountCents")]
    #[validate(range(min = 1, message = "amount_cents must be positive"))]
    pub(crate) amount_cents: i64,
    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub(crate) currency: String,
    pub(crate) cadence: Cadence,
    #[serde(alias = "anchorDate", deserialize_with = "deserialize_date")]
    pub(crate) anchor_date: Date,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScheduleResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) amount_cents: i64,
    pub(crate) currency: String,
    pub(crate) cadence: Cadence,
    pub(crate) anchor_date: String,
    pub(crate) next_due_date: String,
    pub(crate) active: bool,
    pub(crate) created_at: String,
}

impl ScheduleResponse {
    pub(crate) fn from_db(schedule: RecurringInvoiceSchedule) -> Self {
        Self {
            id: schedule.id,
            student_id: schedule.student_id,
            amount_cents: schedule.amount_cents,
            currency: schedule.currency,
            cadence: schedule.cadence,
            anchor_date: format_date(schedule.anchor_date),
            next_due_date: format_date(schedule.next_due_date),
            active: schedule.active,
            created_at: format_primitive(schedule.created_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateInvoicesRequest {
    #[serde(alias = "fromDate", deserialize_with = "deserialize_date")]
    pub(crate) from_date: Date,
    #[serde(alias = "toDate", deserialize_with = "deserialize_date")]
    pub(crate) to_date: Date,
    #[serde(default)]
    #[serde(alias = "scheduleId")]
    pub(crate) schedule_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateInvoicesResponse {
    pub(crate) generated: u64,
    pub(crate) skipped: u64,
    pub(crate) failed: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct InvoiceResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) schedule_id: Option<String>,
    pub(crate) amount_cents: i64,
    pub(crate) currency: String,
    pub(crate) period_start: String,
    pub(crate) period_end: String,
    pub(crate) due_date: String,
    pub(crate) status: InvoiceStatus,
    pub(crate) created_at: String,
}

impl InvoiceResponse {
    pub(crate) fn from_db(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            student_id: invoice.student_id,
            schedule_id: invoice.schedule_id,
            amount_cents: invoice.amount_cents,
            currency: invoice.currency,
            period_start: format_date(invoice.period_start),
            period_end: format_date(invoice.period_end),
            due_date: format_date(invoice.due_date),
            status: invoice.status,
            created_at: format_primitive(invoice.created_at),
        }
    }
}
