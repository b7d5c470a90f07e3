use std::collections::HashSet;

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
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::attendance::{
    AttendanceBatchRequest, AttendanceBatchResponse, AttendanceResponse,
};
use crate::schemas::format_date;
use crate::schemas::group::{GroupCreate, GroupResponse};
use crate::services::audit::{self, AuditEvent};
use crate::services::retry;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_group))
        .route("/:id", get(get_group))
        .route("/:id/attendance/batch", post(attendance_batch))
}

async fn create_group(
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<GroupCreate>,
) -> Result<(StatusCode, Json<ApiResponse<GroupResponse>>), ApiError> {
    validate_payload(&payload)?;

    if payload.end_date < payload.start_date {
        return Err(ApiError::Validation("end_date must not precede start_date".to_string()));
    }

    repositories::courses::find_by_id(state.db(), &payload.course_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let created = repositories::groups::create(
        &mut *tx,
        repositories::groups::CreateGroup {
            id: &Uuid::new_v4().to_string(),
            name: &payload.name,
            course_id: &payload.course_id,
            teacher_id: payload.teacher_id.as_deref(),
            capacity: payload.capacity,
            start_date: payload.start_date,
            end_date: payload.end_date,
            state: payload.state,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create group"))?;

    audit::record(
        &mut *tx,
        &ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "create",
            resource: "groups",
            resource_id: &created.id,
            old_value: None,
            new_value: Some(json!({
                "name": created.name,
                "course_id": created.course_id,
                "capacity": created.capacity,
                "state": created.state,
            })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(GroupResponse::from_db(created, 0)))))
}

async fn get_group(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    _current: CurrentUser,
) -> Result<Json<ApiResponse<GroupResponse>>, ApiError> {
    let found = repositories::groups::find_by_id(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    let enrolled = repositories::enrollments::count_enrolled(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to count enrollment"))?;

    Ok(Json(ApiResponse::new(GroupResponse::from_db(found, enrolled))))
}

async fn attendance_batch(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    current: CurrentUser,
    Json(payload): Json<AttendanceBatchRequest>,
) -> Result<Json<ApiResponse<AttendanceBatchResponse>>, ApiError> {
    if !matches!(current.user.role, UserRole::Admin | UserRole::Staff | UserRole::Teacher) {
        return Err(ApiError::Forbidden("Staff or teacher access required"));
    }

    if payload.entries.is_empty() {
        return Err(ApiError::Validation("entries must not be empty".to_string()));
    }

    let mut seen = HashSet::new();
    for entry in &payload.entries {
        if !seen.insert(entry.student_id.as_str()) {
            return Err(ApiError::Validation(format!(
                "Duplicate student_id '{}' in batch",
                entry.student_id
            )));
        }
    }

    let response =
        retry::with_conflict_retry(|| {
            attendance_batch_once(&state, &ctx, &current, &group_id, &payload)
        })
        .await?;

    Ok(Json(ApiResponse::new(response)))
}

async fn attendance_batch_once(
    state: &AppState,
    ctx: &RequestContext,
    current: &CurrentUser,
    group_id: &str,
    payload: &AttendanceBatchRequest,
) -> Result<AttendanceBatchResponse, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    // Group lock serialises concurrent batches for the same group so the
    // whole batch lands (or fails) as one unit.
    repositories::groups::find_by_id_for_update(&mut *tx, group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to lock group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    let enrolled: HashSet<String> =
        repositories::enrollments::enrolled_student_ids(&mut *tx, group_id)
            .await
            .map_err(|e| ApiError::db(e, "Failed to load enrollment"))?
            .into_iter()
            .collect();

    for entry in &payload.entries {
        if !enrolled.contains(&entry.student_id) {
            return Err(ApiError::InvalidOperation(format!(
                "Student '{}' is not enrolled in this group",
                entry.student_id
            )));
        }
    }

    let now = primitive_now_utc();
    let mut records = Vec::with_capacity(payload.entries.len());

    for entry in &payload.entries {
        let row = repositories::attendance::upsert(
            &mut *tx,
            repositories::attendance::UpsertAttendance {
                id: &Uuid::new_v4().to_string(),
                student_id: &entry.student_id,
                group_id,
                date: payload.date,
                status: entry.status,
                note: entry.note.as_deref(),
                now,
            },
        )
        .await
        .map_err(|e| ApiError::db(e, "Failed to upsert attendance"))?;

        records.push(AttendanceResponse::from_db(row));
    }

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "attendance.batch",
            resource: "attendance",
            resource_id: group_id,
            old_value: None,
            new_value: Some(json!({
                "date": format_date(payload.date),
                "count": records.len(),
            })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok(AttendanceBatchResponse { date: format_date(payload.date), records })
}

#[cfg(test)]
mod tests;
