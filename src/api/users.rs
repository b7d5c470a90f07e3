use axum::{
    extract::State,
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
use crate::core::{security, state::AppState, time::primitive_now_utc};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::user::{UserCreate, UserResponse};
use crate::services::audit::{self, AuditEvent};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(create_user)).route("/me", get(me))
}

async fn me(current: CurrentUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::new(UserResponse::from_db(current.user)))
}

async fn create_user(
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<UserCreate>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    validate_payload(&payload)?;
    validate_role_links(&payload)?;

    let email = normalize_email(&payload.email);

    let existing = repositories::users::exists_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::db(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return Err(ApiError::DuplicateEntry("User with this email already exists".to_string()));
    }

    let password_hash = security::hash_password(&payload.password, state.settings())
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let user = repositories::users::create(
        &mut *tx,
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            email: &email,
            password_hash,
            role: payload.role,
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            phone: payload.phone.as_deref(),
            is_active: payload.is_active,
            teacher_id: payload.teacher_id.as_deref(),
            student_id: payload.student_id.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create user"))?;

    audit::record(
        &mut *tx,
        &ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "create",
            resource: "users",
            resource_id: &user.id,
            old_value: None,
            new_value: Some(json!({
                "email": user.email,
                "role": user.role,
                "is_active": user.is_active,
            })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(UserResponse::from_db(user)))))
}

/// Role-link invariant: teacher accounts point at a teacher row, student
/// accounts at a student row, and nobody else points at either.
fn validate_role_links(payload: &UserCreate) -> Result<(), ApiError> {
    let ok = match payload.role {
        UserRole::Teacher => payload.teacher_id.is_some() && payload.student_id.is_none(),
        UserRole::Student => payload.student_id.is_some() && payload.teacher_id.is_none(),
        UserRole::Admin | UserRole::Staff | UserRole::Parent => {
            payload.teacher_id.is_none() && payload.student_id.is_none()
        }
    };

    if ok {
        Ok(())
    } else {
        Err(ApiError::Validation(
            "teacher_id/student_id must match the user role".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests;
