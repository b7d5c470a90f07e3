use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::api::context::RequestContext;
use crate::api::envelope::ApiResponse;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentStaff;
use crate::api::validation::{normalize_email, validate_payload};
use crate::core::{state::AppState, time::primitive_now_utc};
use crate::db::models::WaitlistEntry;
use crate::db::types::{GroupState, WaitlistStatus};
use crate::repositories;
use crate::schemas::waitlist::{WaitlistEntryResponse, WaitlistJoinRequest};
use crate::services::audit::{self, AuditEvent};
use crate::services::enrollment::{self, EnrollCandidate};
use crate::services::retry;

pub(crate) fn group_router() -> Router<AppState> {
    Router::new()
        .route("/:id/waitlist", post(join_waitlist).get(list_waitlist))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/offer", post(offer_entry))
        .route("/:id/accept", post(accept_entry))
        .route("/:id/decline", post(decline_entry))
        .route("/:id/expire", post(expire_entry))
}

/// Public endpoint, like application submission: candidates are not users.
async fn join_waitlist(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<WaitlistJoinRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WaitlistEntryResponse>>), ApiError> {
    validate_payload(&payload)?;

    let entry =
        retry::with_conflict_retry(|| join_once(&state, &ctx, &group_id, &payload)).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(WaitlistEntryResponse::from_db(entry)))))
}

async fn join_once(
    state: &AppState,
    ctx: &RequestContext,
    group_id: &str,
    payload: &WaitlistJoinRequest,
) -> Result<WaitlistEntry, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    // The group row lock makes position assignment atomic.
    let group = repositories::groups::find_by_id_for_update(&mut *tx, group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to lock group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    if matches!(group.state, GroupState::Completed | GroupState::Cancelled) {
        return Err(ApiError::InvalidOperation(
            "Group is no longer accepting waitlist entries".to_string(),
        ));
    }

    let position = repositories::waitlist::max_waiting_position(&mut *tx, group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to read waitlist"))?
        + 1;

    let now = primitive_now_utc();
    let entry = repositories::waitlist::create(
        &mut *tx,
        repositories::waitlist::CreateWaitlistEntry {
            id: &Uuid::new_v4().to_string(),
            group_id,
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            email: &normalize_email(&payload.email),
            position,
            now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create waitlist entry"))?;

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: None,
            action: "create",
            resource: "waitlist_entries",
            resource_id: &entry.id,
            old_value: None,
            new_value: Some(json!({
                "group_id": entry.group_id,
                "email": entry.email,
                "position": entry.position,
            })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok(entry)
}

async fn list_waitlist(
    Path(group_id): Path<String>,
    State(state): State<AppState>,
    CurrentStaff(_current): CurrentStaff,
) -> Result<Json<ApiResponse<Vec<WaitlistEntryResponse>>>, ApiError> {
    repositories::groups::find_by_id(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    let entries = repositories::waitlist::list_waiting(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to list waitlist"))?;

    let data = entries.into_iter().map(WaitlistEntryResponse::from_db).collect();
    Ok(Json(ApiResponse::new(data)))
}

async fn offer_entry(
    Path(entry_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
) -> Result<Json<ApiResponse<WaitlistEntryResponse>>, ApiError> {
    let entry = retry::with_conflict_retry(|| {
        process_once(&state, &ctx, &current.user.id, &entry_id, WaitlistAction::Offer)
    })
    .await?;
    Ok(Json(ApiResponse::new(WaitlistEntryResponse::from_db(entry))))
}

async fn accept_entry(
    Path(entry_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
) -> Result<Json<ApiResponse<WaitlistEntryResponse>>, ApiError> {
    let entry = retry::with_conflict_retry(|| {
        process_once(&state, &ctx, &current.user.id, &entry_id, WaitlistAction::Accept)
    })
    .await?;
    Ok(Json(ApiResponse::new(WaitlistEntryResponse::from_db(entry))))
}

async fn decline_entry(
    Path(entry_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
) -> Result<Json<ApiResponse<WaitlistEntryResponse>>, ApiError> {
    let entry = retry::with_conflict_retry(|| {
        process_once(&state, &ctx, &current.user.id, &entry_id, WaitlistAction::Decline)
    })
    .await?;
    Ok(Json(ApiResponse::new(WaitlistEntryResponse::from_db(entry))))
}

async fn expire_entry(
    Path(entry_id): Path<String>,
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
) -> Result<Json<ApiResponse<WaitlistEntryResponse>>, ApiError> {
    let entry = retry::with_conflict_retry(|| {
        process_once(&state, &ctx, &current.user.id, &entry_id, WaitlistAction::Expire)
    })
    .await?;
    Ok(Json(ApiResponse::new(WaitlistEntryResponse::from_db(entry))))
}

#[derive(Clone, Copy)]
enum WaitlistAction {
    Offer,
    Accept,
    Decline,
    Expire,
}

impl WaitlistAction {
    fn audit_action(self) -> &'static str {
        match self {
            WaitlistAction::Offer => "offer",
            WaitlistAction::Accept => "accept",
            WaitlistAction::Decline => "decline",
            WaitlistAction::Expire => "expire",
        }
    }
}

/// All processing holds the group row lock; an entry leaving `waiting`
/// compacts the positions behind it in the same transaction, keeping
/// waiting positions dense at every commit point.
async fn process_once(
    state: &AppState,
    ctx: &RequestContext,
    actor_id: &str,
    entry_id: &str,
    action: WaitlistAction,
) -> Result<WaitlistEntry, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let preview = repositories::waitlist::find_by_id(&mut *tx, entry_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load waitlist entry"))?
        .ok_or_else(|| ApiError::NotFound("Waitlist entry not found".to_string()))?;

    repositories::groups::find_by_id_for_update(&mut *tx, &preview.group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to lock group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    let entry = repositories::waitlist::find_by_id_for_update(&mut *tx, entry_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to lock waitlist entry"))?
        .ok_or_else(|| ApiError::NotFound("Waitlist entry not found".to_string()))?;

    let now = primitive_now_utc();
    let mut new_student_id = None;

    match (action, entry.status) {
        (WaitlistAction::Offer, WaitlistStatus::Waiting) => {
            repositories::waitlist::set_offered(&mut *tx, entry_id, now)
                .await
                .map_err(|e| ApiError::db(e, "Failed to update waitlist entry"))?;
            repositories::waitlist::compact_after(&mut *tx, &entry.group_id, entry.position, now)
                .await
                .map_err(|e| ApiError::db(e, "Failed to compact waitlist"))?;
        }
        (WaitlistAction::Accept, WaitlistStatus::Offered) => {
            let student_id = enrollment::enroll_into_group(
                &mut tx,
                &entry.group_id,
                EnrollCandidate {
                    existing_student_id: entry.student_id.as_deref(),
                    first_name: &entry.first_name,
                    last_name: &entry.last_name,
                    email: &entry.email,
                    phone: None,
                },
            )
            .await?;

            repositories::waitlist::set_accepted(&mut *tx, entry_id, &student_id, now)
                .await
                .map_err(|e| ApiError::db(e, "Failed to update waitlist entry"))?;
            new_student_id = Some(student_id);
        }
        (WaitlistAction::Decline, WaitlistStatus::Waiting | WaitlistStatus::Offered) => {
            repositories::waitlist::set_status(&mut *tx, entry_id, WaitlistStatus::Declined, now)
                .await
                .map_err(|e| ApiError::db(e, "Failed to update waitlist entry"))?;
            if entry.status == WaitlistStatus::Waiting {
                repositories::waitlist::compact_after(
                    &mut *tx,
                    &entry.group_id,
                    entry.position,
                    now,
                )
                .await
                .map_err(|e| ApiError::db(e, "Failed to compact waitlist"))?;
            }
        }
        (WaitlistAction::Expire, WaitlistStatus::Waiting | WaitlistStatus::Offered) => {
            repositories::waitlist::set_status(&mut *tx, entry_id, WaitlistStatus::Expired, now)
                .await
                .map_err(|e| ApiError::db(e, "Failed to update waitlist entry"))?;
            if entry.status == WaitlistStatus::Waiting {
                repositories::waitlist::compact_after(
                    &mut *tx,
                    &entry.group_id,
                    entry.position,
                    now,
                )
                .await
                .map_err(|e| ApiError::db(e, "Failed to compact waitlist"))?;
            }
        }
        (action, status) => {
            return Err(ApiError::InvalidOperation(format!(
                "Cannot {} a waitlist entry in state '{status:?}'",
                action.audit_action()
            )));
        }
    }

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: Some(actor_id),
            action: action.audit_action(),
            resource: "waitlist_entries",
            resource_id: entry_id,
            old_value: Some(json!({ "status": entry.status, "position": entry.position })),
            new_value: Some(json!({ "student_id": new_student_id })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    repositories::waitlist::find_by_id(state.db(), entry_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load waitlist entry"))?
        .ok_or_else(|| ApiError::NotFound("Waitlist entry not found".to_string()))
}

#[cfg(test)]
mod tests;
