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
use crate::api::validation::validate_payload;
use crate::core::{state::AppState, time::primitive_now_utc};
use crate::repositories;
use crate::schemas::course::{CourseCreate, CourseResponse};
use crate::services::audit::{self, AuditEvent};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(create_course)).route("/:id", get(get_course))
}

async fn create_course(
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<ApiResponse<CourseResponse>>), ApiError> {
    validate_payload(&payload)?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let course = repositories::courses::create(
        &mut *tx,
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            name: &payload.name,
            description: payload.description.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create course"))?;

    audit::record(
        &mut *tx,
        &ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "create",
            resource: "courses",
            resource_id: &course.id,
            old_value: None,
            new_value: Some(json!({ "name": course.name })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(CourseResponse::from_db(course)))))
}

async fn get_course(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    _current: CurrentUser,
) -> Result<Json<ApiResponse<CourseResponse>>, ApiError> {
    let course = repositories::courses::find_by_id(state.db(), &course_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(ApiResponse::new(CourseResponse::from_db(course))))
}
