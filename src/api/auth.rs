use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use time::Duration;
use uuid::Uuid;

use crate::api::context::RequestContext;
use crate::api::envelope::ApiResponse;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{normalize_email, validate_payload};
use crate::core::{security, state::AppState, time::primitive_now_utc};
use crate::repositories;
use crate::schemas::auth::{LoginRequest, LoginResponse, RevokedResponse, SessionResponse};
use crate::schemas::user::UserResponse;
use crate::services::audit::{self, AuditEvent};

/// Max login attempts per email per window.
const LOGIN_RATE_LIMIT: u64 = 10;
const LOGIN_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:id", delete(revoke_session))
        .route("/sessions/revoke-all", post(revoke_all))
}

async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    validate_payload(&payload)?;
    let email = normalize_email(&payload.email);

    let rate_key = format!("rl:login:{email}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, LOGIN_RATE_LIMIT, LOGIN_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load user"))?;

    // Every failure mode collapses into the same opaque 401; the audit
    // trail keeps the attempted email but never the password.
    let Some(user) = user else {
        record_failed_login(&state, &ctx, &email).await;
        return Err(ApiError::Unauthorized("Invalid credentials"));
    };

    let verified = security::verify_password(&payload.password, &user.password_hash)
        .unwrap_or(false);
    if !verified || !user.is_active {
        record_failed_login(&state, &ctx, &email).await;
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let minted = security::mint_session_token();
    let now = primitive_now_utc();
    let expires_at = now + Duration::hours(state.settings().security().session_ttl_hours as i64);
    let session_id = Uuid::new_v4().to_string();

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let session = repositories::sessions::create(
        &mut *tx,
        repositories::sessions::CreateSession {
            id: &session_id,
            user_id: &user.id,
            token_hash: &minted.hash,
            issued_at: now,
            expires_at,
            ip_address: ctx.ip_address.as_deref(),
            user_agent: ctx.user_agent.as_deref(),
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create session"))?;

    repositories::users::update_last_login(&mut *tx, &user.id, now)
        .await
        .map_err(|e| ApiError::db(e, "Failed to update last login"))?;

    audit::record(
        &mut *tx,
        &ctx,
        AuditEvent {
            user_id: Some(&user.id),
            action: "login",
            resource: "sessions",
            resource_id: &session.id,
            old_value: None,
            new_value: Some(json!({ "email": email })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    let response = LoginResponse {
        token: minted.plaintext,
        session_id: session.id,
        expires_at: crate::core::time::format_primitive(session.expires_at),
        user: UserResponse::from_db(user),
    };

    Ok(Json(ApiResponse::new(response)))
}

/// Failed attempts are recorded outside any transaction; losing one to a
/// database hiccup must not mask the 401.
async fn record_failed_login(state: &AppState, ctx: &RequestContext, email: &str) {
    let result = audit::record(
        state.db(),
        ctx,
        AuditEvent {
            user_id: None,
            action: "login",
            resource: "sessions",
            resource_id: "",
            old_value: None,
            new_value: Some(json!({ "email": email })),
            success: false,
            error_msg: Some("invalid credentials"),
        },
    )
    .await;

    if let Err(err) = result {
        tracing::warn!(error = %err, "Failed to record failed-login audit event");
    }
}

async fn logout(
    State(state): State<AppState>,
    ctx: RequestContext,
    current: CurrentUser,
) -> Result<Json<ApiResponse<RevokedResponse>>, ApiError> {
    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let revoked = repositories::sessions::revoke_for_user(
        &mut *tx,
        &current.session_id,
        &current.user.id,
        now,
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to revoke session"))?;

    if !revoked {
        return Err(ApiError::InvalidToken("Invalid authentication credentials"));
    }

    audit::record(
        &mut *tx,
        &ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "logout",
            resource: "sessions",
            resource_id: &current.session_id,
            old_value: None,
            new_value: None,
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok(Json(ApiResponse::with_message(RevokedResponse { revoked: 1 }, "Logged out")))
}

async fn list_sessions(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<Vec<SessionResponse>>>, ApiError> {
    let sessions = repositories::sessions::list_active_for_user(
        state.db(),
        &current.user.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to list sessions"))?;

    let data = sessions.into_iter().map(SessionResponse::from_db).collect();
    Ok(Json(ApiResponse::new(data)))
}

async fn revoke_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    current: CurrentUser,
) -> Result<Json<ApiResponse<RevokedResponse>>, ApiError> {
    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    // Owner-scoped update; a session that is not yours looks identical to
    // one that does not exist.
    let revoked =
        repositories::sessions::revoke_for_user(&mut *tx, &session_id, &current.user.id, now)
            .await
            .map_err(|e| ApiError::db(e, "Failed to revoke session"))?;

    if !revoked {
        return Err(ApiError::NotFound("Session not found".to_string()));
    }

    audit::record(
        &mut *tx,
        &ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "revoke",
            resource: "sessions",
            resource_id: &session_id,
            old_value: None,
            new_value: None,
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok(Json(ApiResponse::new(RevokedResponse { revoked: 1 })))
}

async fn revoke_all(
    State(state): State<AppState>,
    ctx: RequestContext,
    current: CurrentUser,
) -> Result<Json<ApiResponse<RevokedResponse>>, ApiError> {
    let now = primitive_now_utc();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let revoked =
        repositories::sessions::revoke_all_for_user(&mut *tx, &current.user.id, now)
            .await
            .map_err(|e| ApiError::db(e, "Failed to revoke sessions"))?;

    audit::record(
        &mut *tx,
        &ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "revoke_all",
            resource: "sessions",
            resource_id: "",
            old_value: None,
            new_value: Some(json!({ "revoked": revoked })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok(Json(ApiResponse::new(RevokedResponse { revoked })))
}
