use time::Date;

use crate::db::models::RecurringInvoiceSchedule;
use crate::db::types::Cadence;

const COLUMNS: &str = "\
    id, student_id, amount_cents, currency, cadence, anchor_date, next_due_date, \
    active, created_at, updated_at, deleted_at";

/// Active schedules to generate for, row-locked so concurrent generation
/// passes serialise per schedule. With `schedule_id` set only that schedule
/// is considered.
pub(crate) async fn list_active_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    schedule_id: Option<&str>,
) -> Result<Vec<RecurringInvoiceSchedule>, sqlx::Error> {
    sqlx::query_as::<_, RecurringInvoiceSchedule>(&format!(
        "SELECT {COLUMNS} FROM recurring_invoice_schedules \
         WHERE active AND deleted_at IS NULL \
           AND ($1::text IS NULL OR id = $1) \
         ORDER BY id \
         FOR UPDATE"
    ))
    .bind(schedule_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn update_next_due_date(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    next_due_date: Date,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE recurring_invoice_schedules SET next_due_date = $1, updated_at = $2 WHERE id = $3",
    )
    .bind(next_due_date)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) struct CreateSchedule<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) amount_cents: i64,
    pub(crate) currency: &'a str,
    pub(crate) cadence: Cadence,
    pub(crate) anchor_date: Date,
    pub(crate) created_at: time::PrimitiveDateTime,
    pub(crate) updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateSchedule<'_>,
) -> Result<RecurringInvoiceSchedule, sqlx::Error> {
    sqlx::query_as::<_, RecurringInvoiceSchedule>(&format!(
        "INSERT INTO recurring_invoice_schedules (
            id, student_id, amount_cents, currency, cadence, anchor_date,
            next_due_date, active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$6,TRUE,$7,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.amount_cents)
    .bind(params.currency)
    .bind(params.cadence)
    .bind(params.anchor_date)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(executor)
    .await
}
