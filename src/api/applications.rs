use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::api::context::RequestContext;
use crate::api::envelope::ApiResponse;
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentStaff, CurrentUser};
use crate::api::validation::{normalize_email, validate_payload};
use crate::core::{state::AppState, time::primitive_now_utc};
use crate::db::models::Application;
use crate::db::types::ApplicationStatus;
use crate::repositories;
use crate::schemas::application::{
    ApplicationCreate, ApplicationResponse, EnrollRequest, EnrollResponse, ReviewRequest,
};
use crate::services::audit::{self, AuditEvent};
use crate::services::enrollment::{self, EnrollCandidate};
use crate::services::{retry, transitions};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_application))
        .route("/:id", get(get_application))
        .route("/:id/review", post(review_application))
        .route("/:id/withdraw", post(withdraw_application))
        .route("/:id/enroll", post(enroll_application))
}

/// Public endpoint: applicants have no account yet, so the audit row
/// carries no principal.
async fn create_application(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<ApplicationCreate>,
) -> Result<(StatusCode, Json<ApiResponse<ApplicationResponse>>), ApiError> {
    validate_payload(&payload)?;

    repositories::courses::find_by_id(state.db(), &payload.course_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let email = normalize_email(&payload.email);
    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let application = repositories::applications::create(
        &mut *tx,
        repositories::applications::CreateApplication {
            id: &Uuid::new_v4().to_string(),
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            email: &email,
            phone: payload.phone.as_deref(),
            course_id: &payload.course_id,
            status: ApplicationStatus::Submitted,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create application"))?;

    audit::record(
        &mut *tx,
        &ctx,
        AuditEvent {
            user_id: None,
            action: "create",
            resource: "applications",
            resource_id: &application.id,
            old_value: None,
            new_value: Some(json!({
                "email": application.email,
                "course_id": application.course_id,
                "status": application.status,
            })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(ApplicationResponse::from_db(application)))))
}

async fn get_application(
    Path(application_id): Path<String>,
    State(state): State<AppState>,
    CurrentStaff(_current): CurrentStaff,
) -> Result<Json<ApiResponse<ApplicationResponse>>, ApiError> {
    let application = repositories::applications::find_by_id(state.db(), &application_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load application"))?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;

    Ok(Json(ApiResponse::new(ApplicationResponse::from_db(application))))
}

async fn review_application(
    Path(application_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<ApplicationResponse>>, ApiError> {
    let application = retry::with_conflict_retry(|| {
        review_once(&state, &ctx, &current, &application_id, &payload)
    })
    .await?;

    Ok(Json(ApiResponse::new(ApplicationResponse::from_db(application))))
}

async fn review_once(
    state: &AppState,
    ctx: &RequestContext,
    current: &CurrentUser,
    application_id: &str,
    payload: &ReviewRequest,
) -> Result<Application, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let application =
        repositories::applications::find_by_id_for_update(&mut *tx, application_id)
            .await
            .map_err(|e| ApiError::db(e, "Failed to lock application"))?
            .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;

    let next = transitions::review(application.status, payload.decision)
        .map_err(|refused| ApiError::InvalidOperation(refused.to_string()))?;

    let now = primitive_now_utc();
    repositories::applications::set_reviewed(&mut *tx, application_id, next, &current.user.id, now)
        .await
        .map_err(|e| ApiError::db(e, "Failed to update application"))?;

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "review",
            resource: "applications",
            resource_id: application_id,
            old_value: Some(json!({ "status": application.status })),
            new_value: Some(json!({ "status": next })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    repositories::applications::find_by_id(state.db(), application_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load application"))?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))
}

async fn withdraw_application(
    Path(application_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    current: CurrentUser,
) -> Result<Json<ApiResponse<ApplicationResponse>>, ApiError> {
    let application =
        retry::with_conflict_retry(|| withdraw_once(&state, &ctx, &current, &application_id))
            .await?;

    Ok(Json(ApiResponse::new(ApplicationResponse::from_db(application))))
}

async fn withdraw_once(
    state: &AppState,
    ctx: &RequestContext,
    current: &CurrentUser,
    application_id: &str,
) -> Result<Application, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let application =
        repositories::applications::find_by_id_for_update(&mut *tx, application_id)
            .await
            .map_err(|e| ApiError::db(e, "Failed to lock application"))?
            .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;

    let next = transitions::withdraw(application.status)
        .map_err(|refused| ApiError::InvalidOperation(refused.to_string()))?;

    let now = primitive_now_utc();
    repositories::applications::set_status(&mut *tx, application_id, next, now)
        .await
        .map_err(|e| ApiError::db(e, "Failed to update application"))?;

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "withdraw",
            resource: "applications",
            resource_id: application_id,
            old_value: Some(json!({ "status": application.status })),
            new_value: Some(json!({ "status": next })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    repositories::applications::find_by_id(state.db(), application_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load application"))?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))
}

async fn enroll_application(
    Path(application_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<EnrollRequest>,
) -> Result<Json<ApiResponse<EnrollResponse>>, ApiError> {
    let (application, student_id) = retry::with_conflict_retry(|| {
        enroll_once(&state, &ctx, &current, &application_id, &payload)
    })
    .await?;

    let group_id = payload.group_id.clone();
    Ok(Json(ApiResponse::new(EnrollResponse {
        application: ApplicationResponse::from_db(application),
        group_id,
        student_id,
    })))
}

async fn enroll_once(
    state: &AppState,
    ctx: &RequestContext,
    current: &CurrentUser,
    application_id: &str,
    payload: &EnrollRequest,
) -> Result<(Application, String), ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    // Lock order everywhere is application row, then group row.
    let application =
        repositories::applications::find_by_id_for_update(&mut *tx, application_id)
            .await
            .map_err(|e| ApiError::db(e, "Failed to lock application"))?
            .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;

    transitions::enroll(application.status)
        .map_err(|refused| ApiError::InvalidOperation(refused.to_string()))?;

    let student_id = enrollment::enroll_into_group(
        &mut tx,
        &payload.group_id,
        EnrollCandidate {
            existing_student_id: application.student_id.as_deref(),
            first_name: &application.first_name,
            last_name: &application.last_name,
            email: &application.email,
            phone: application.phone.as_deref(),
        },
    )
    .await?;

    let now = primitive_now_utc();
    repositories::applications::set_enrolled(&mut *tx, application_id, &student_id, now)
        .await
        .map_err(|e| ApiError::db(e, "Failed to update application"))?;

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "enroll",
            resource: "applications",
            resource_id: application_id,
            old_value: Some(json!({ "status": application.status })),
            new_value: Some(json!({
                "status": ApplicationStatus::Enrolled,
                "group_id": payload.group_id,
                "student_id": student_id,
            })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    let refreshed = repositories::applications::find_by_id(state.db(), application_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load application"))?
        .ok_or_else(|| ApiError::NotFound("Application not found".to_string()))?;

    Ok((refreshed, student_id))
}
