use time::Date;

use crate::db::models::Invoice;
use crate::db::types::InvoiceStatus;

const COLUMNS: &str = "\
    id, student_id, schedule_id, amount_cents, currency, period_start, period_end, \
    due_date, status, created_at, updated_at, deleted_at";

pub(crate) struct CreateGeneratedInvoice<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) schedule_id: &'a str,
    pub(crate) amount_cents: i64,
    pub(crate) currency: &'a str,
    pub(crate) period_start: Date,
    pub(crate) period_end: Date,
    pub(crate) due_date: Date,
    pub(crate) now: time::PrimitiveDateTime,
}

/// Idempotent insert keyed on (schedule_id, period_start); an existing
/// invoice for the period leaves the row untouched and reports false.
pub(crate) async fn create_generated(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateGeneratedInvoice<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO invoices (
            id, student_id, schedule_id, amount_cents, currency,
            period_start, period_end, due_date, status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)
        ON CONFLICT (schedule_id, period_start) WHERE schedule_id IS NOT NULL DO NOTHING",
    )
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.schedule_id)
    .bind(params.amount_cents)
    .bind(params.currency)
    .bind(params.period_start)
    .bind(params.period_end)
    .bind(params.due_date)
    .bind(InvoiceStatus::Issued)
    .bind(params.now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_by_student(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
) -> Result<Vec<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {COLUMNS} FROM invoices \
         WHERE student_id = $1 AND deleted_at IS NULL \
         ORDER BY period_start"
    ))
    .bind(student_id)
    .fetch_all(executor)
    .await
}
