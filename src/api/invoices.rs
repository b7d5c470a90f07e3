use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use time::Duration;
use uuid::Uuid;

use crate::api::context::RequestContext;
use crate::api::envelope::ApiResponse;
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::api::validation::validate_payload;
use crate::core::{state::AppState, time::primitive_now_utc};
use crate::repositories;
use crate::schemas::format_date;
use crate::schemas::invoice::{
    GenerateInvoicesRequest, GenerateInvoicesResponse, InvoiceResponse, ScheduleCreate,
    ScheduleResponse,
};
use crate::services::audit::{self, AuditEvent};
use crate::services::{cadence, retry};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/schedules", post(create_schedule))
        .route("/generate", post(generate_invoices))
}

pub(crate) fn student_router() -> Router<AppState> {
    Router::new().route("/:id/invoices", get(list_student_invoices))
}

async fn create_schedule(
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<ScheduleCreate>,
) -> Result<(StatusCode, Json<ApiResponse<ScheduleResponse>>), ApiError> {
    validate_payload(&payload)?;

    repositories::students::find_by_id(state.db(), &payload.student_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let schedule = repositories::schedules::create(
        &mut *tx,
        repositories::schedules::CreateSchedule {
            id: &Uuid::new_v4().to_string(),
            student_id: &payload.student_id,
            amount_cents: payload.amount_cents,
            currency: &payload.currency.to_ascii_uppercase(),
            cadence: payload.cadence,
            anchor_date: payload.anchor_date,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create schedule"))?;

    audit::record(
        &mut *tx,
        &ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "create",
            resource: "recurring_invoice_schedules",
            resource_id: &schedule.id,
            old_value: None,
            new_value: Some(json!({
                "student_id": schedule.student_id,
                "cadence": schedule.cadence,
                "anchor_date": format_date(schedule.anchor_date),
            })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(ScheduleResponse::from_db(schedule)))))
}

async fn generate_invoices(
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<GenerateInvoicesRequest>,
) -> Result<Json<ApiResponse<GenerateInvoicesResponse>>, ApiError> {
    if payload.to_date < payload.from_date {
        return Err(ApiError::Validation("to_date must not precede from_date".to_string()));
    }

    let response =
        retry::with_conflict_retry(|| generate_once(&state, &ctx, &current, &payload)).await?;

    Ok(Json(ApiResponse::new(response)))
}

async fn generate_once(
    state: &AppState,
    ctx: &RequestContext,
    current: &CurrentUser,
    payload: &GenerateInvoicesRequest,
) -> Result<GenerateInvoicesResponse, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let schedules =
        repositories::schedules::list_active_for_update(&mut *tx, payload.schedule_id.as_deref())
            .await
            .map_err(|e| ApiError::db(e, "Failed to lock schedules"))?;

    if payload.schedule_id.is_some() && schedules.is_empty() {
        return Err(ApiError::NotFound("Schedule not found".to_string()));
    }

    let now = primitive_now_utc();
    let mut generated = 0u64;
    let mut skipped = 0u64;

    for schedule in &schedules {
        // Due dates derive from the anchor, not the high-water mark, so a
        // repeated window re-derives the same set and skips what exists.
        let walk = cadence::due_dates(
            schedule.cadence,
            schedule.anchor_date,
            schedule.anchor_date.day(),
            payload.from_date,
            payload.to_date,
        );

        // Each invoice covers its due date up to the day before the next one.
        for (index, due) in walk.due.iter().enumerate() {
            let period_end =
                walk.due.get(index + 1).copied().unwrap_or(walk.next_due)
                    - Duration::days(1);

            let inserted = repositories::invoices::create_generated(
                &mut *tx,
                repositories::invoices::CreateGeneratedInvoice {
                    id: &Uuid::new_v4().to_string(),
                    student_id: &schedule.student_id,
                    schedule_id: &schedule.id,
                    amount_cents: schedule.amount_cents,
                    currency: &schedule.currency,
                    period_start: *due,
                    period_end,
                    due_date: *due,
                    now,
                },
            )
            .await
            .map_err(|e| ApiError::db(e, "Failed to insert invoice"))?;

            if inserted {
                generated += 1;
            } else {
                skipped += 1;
            }
        }

        // The high-water mark only moves forward; generating an old window
        // never rewinds it.
        if walk.next_due > schedule.next_due_date {
            repositories::schedules::update_next_due_date(
                &mut *tx,
                &schedule.id,
                walk.next_due,
                now,
            )
            .await
            .map_err(|e| ApiError::db(e, "Failed to advance schedule"))?;
        }
    }

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "generate",
            resource: "invoices",
            resource_id: "",
            old_value: None,
            new_value: Some(json!({
                "from_date": format_date(payload.from_date),
                "to_date": format_date(payload.to_date),
                "generated": generated,
                "skipped": skipped,
            })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok(GenerateInvoicesResponse { generated, skipped, failed: 0 })
}

async fn list_student_invoices(
    Path(student_id): Path<String>,
    State(state): State<AppState>,
    CurrentStaff(_current): CurrentStaff,
) -> Result<Json<ApiResponse<Vec<InvoiceResponse>>>, ApiError> {
    repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let invoices = repositories::invoices::list_by_student(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to list invoices"))?;

    let data = invoices.into_iter().map(InvoiceResponse::from_db).collect();
    Ok(Json(ApiResponse::new(data)))
}

#[cfg(test)]
mod tests;
