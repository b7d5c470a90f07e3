use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};
use time::Duration;

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState, time::primitive_now_utc};
use crate::db::models::User;
use crate::repositories;

/// At most one last_seen_at write per session per this interval.
const LAST_SEEN_COALESCE_SECONDS: i64 = 60;

/// The authenticated principal: the resolved user plus the session that
/// carried the token.
pub(crate) struct CurrentUser {
    pub(crate) user: User,
    pub(crate) session_id: String,
}

/// Admin or staff principal; everyone else gets a 403.
pub(crate) struct CurrentStaff(pub(crate) CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Not authenticated"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Not authenticated"))?;

        let token_hash = security::hash_session_token(token);

        let session = repositories::sessions::find_by_token_hash(app_state.db(), &token_hash)
            .await
            .map_err(|e| ApiError::db(e, "Failed to resolve session"))?
            .ok_or(ApiError::InvalidToken("Invalid authentication credentials"))?;

        if session.revoked_at.is_some() {
            return Err(ApiError::InvalidToken("Invalid authentication credentials"));
        }

        let now = primitive_now_utc();
        if session.expires_at <= now {
            return Err(ApiError::TokenExpired);
        }

        let user = repositories::users::find_by_id(app_state.db(), &session.user_id)
            .await
            .map_err(|e| ApiError::db(e, "Failed to load user"))?
            .ok_or(ApiError::InvalidToken("Invalid authentication credentials"))?;

        if !user.is_active {
            return Err(ApiError::InvalidToken("Invalid authentication credentials"));
        }

        // Best-effort activity tracking; a failed write never fails the request.
        let stale_before = now - Duration::seconds(LAST_SEEN_COALESCE_SECONDS);
        if let Err(err) = repositories::sessions::touch_last_seen(
            app_state.db(),
            &session.id,
            now,
            stale_before,
        )
        .await
        {
            tracing::warn!(error = %err, session_id = %session.id, "Failed to update last_seen_at");
        }

        Ok(CurrentUser { user, session_id: session.id })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;

        if current.user.role.is_staff() {
            Ok(CurrentStaff(current))
        } else {
            Err(ApiError::Forbidden("Staff access required"))
        }
    }
}
