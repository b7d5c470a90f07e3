use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
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
use crate::db::models::{CalendarEvent, Exam, TimetableEntry};
use crate::repositories;
use crate::schemas::schedule::{
    CalendarEventCreate, CalendarEventResponse, ExamCreate, ExamResponse, TimetableEntryCreate,
    TimetableEntryResponse,
};
use crate::services::audit::{self, AuditEvent};
use crate::services::{retry, scheduling};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/timetable", post(create_timetable_entry))
        .route("/exams", post(create_exam))
        .route("/events", post(create_event))
}

async fn create_timetable_entry(
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<TimetableEntryCreate>,
) -> Result<(StatusCode, Json<ApiResponse<TimetableEntryResponse>>), ApiError> {
    validate_payload(&payload)?;

    if payload.start_time >= payload.end_time {
        return Err(ApiError::Validation("start_time must precede end_time".to_string()));
    }

    let entry =
        retry::with_conflict_retry(|| timetable_entry_once(&state, &ctx, &current, &payload))
            .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(TimetableEntryResponse::from_db(entry)))))
}

async fn timetable_entry_once(
    state: &AppState,
    ctx: &RequestContext,
    current: &CurrentUser,
    payload: &TimetableEntryCreate,
) -> Result<TimetableEntry, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    repositories::groups::find_by_id(&mut *tx, &payload.group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    // Serialise writers per scope key; keys are sorted so two requests
    // touching the same pair cannot deadlock.
    let mut lock_keys =
        vec![format!("timetable:group:{}:{}", payload.group_id, payload.weekday)];
    if let Some(room) = payload.room.as_deref() {
        lock_keys.push(format!("timetable:room:{}:{}", room, payload.weekday));
    }
    lock_keys.sort();
    for key in &lock_keys {
        repositories::locks::advisory_xact_lock(&mut *tx, key)
            .await
            .map_err(|e| ApiError::db(e, "Failed to acquire schedule lock"))?;
    }

    let in_scope = repositories::timetable::list_in_scope(
        &mut *tx,
        &payload.group_id,
        payload.weekday,
        payload.room.as_deref(),
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to check timetable conflicts"))?;

    let conflicting = in_scope.iter().any(|entry| {
        scheduling::overlaps(entry.start_time, entry.end_time, payload.start_time, payload.end_time)
    });
    if conflicting {
        return Err(ApiError::ScheduleConflict(
            "Entry overlaps an existing timetable slot".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let entry = repositories::timetable::create(
        &mut *tx,
        repositories::timetable::CreateTimetableEntry {
            id: &Uuid::new_v4().to_string(),
            group_id: &payload.group_id,
            weekday: payload.weekday,
            start_time: payload.start_time,
            end_time: payload.end_time,
            room: payload.room.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create timetable entry"))?;

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "create",
            resource: "timetable_entries",
            resource_id: &entry.id,
            old_value: None,
            new_value: Some(json!({
                "group_id": entry.group_id,
                "weekday": entry.weekday,
                "room": entry.room,
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

async fn create_exam(
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ApiResponse<ExamResponse>>), ApiError> {
    validate_payload(&payload)?;

    if payload.starts_at >= payload.ends_at {
        return Err(ApiError::Validation("starts_at must precede ends_at".to_string()));
    }

    let exam =
        retry::with_conflict_retry(|| exam_once(&state, &ctx, &current, &payload)).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(ExamResponse::from_db(exam)))))
}

async fn exam_once(
    state: &AppState,
    ctx: &RequestContext,
    current: &CurrentUser,
    payload: &ExamCreate,
) -> Result<Exam, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let group = repositories::groups::find_by_id(&mut *tx, &payload.group_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to load group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    // Exam scope is course-transitive, so the course is the lock unit.
    repositories::locks::advisory_xact_lock(
        &mut *tx,
        &format!("exam:course:{}", group.course_id),
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to acquire schedule lock"))?;

    let in_scope = repositories::exams::list_for_course(&mut *tx, &group.course_id)
        .await
        .map_err(|e| ApiError::db(e, "Failed to check exam conflicts"))?;

    let conflicting = in_scope.iter().any(|exam| {
        scheduling::overlaps(exam.starts_at, exam.ends_at, payload.starts_at, payload.ends_at)
    });
    if conflicting {
        return Err(ApiError::ScheduleConflict(
            "Exam overlaps an existing exam for this group or course".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let exam = repositories::exams::create(
        &mut *tx,
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            group_id: &payload.group_id,
            title: &payload.title,
            starts_at: payload.starts_at,
            ends_at: payload.ends_at,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create exam"))?;

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "create",
            resource: "exams",
            resource_id: &exam.id,
            old_value: None,
            new_value: Some(json!({ "group_id": exam.group_id, "title": exam.title })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok(exam)
}

async fn create_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    CurrentStaff(current): CurrentStaff,
    Json(payload): Json<CalendarEventCreate>,
) -> Result<(StatusCode, Json<ApiResponse<CalendarEventResponse>>), ApiError> {
    validate_payload(&payload)?;

    if payload.starts_at >= payload.ends_at {
        return Err(ApiError::Validation("starts_at must precede ends_at".to_string()));
    }

    let event =
        retry::with_conflict_retry(|| event_once(&state, &ctx, &current, &payload)).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(CalendarEventResponse::from_db(event)))))
}

async fn event_once(
    state: &AppState,
    ctx: &RequestContext,
    current: &CurrentUser,
    payload: &CalendarEventCreate,
) -> Result<CalendarEvent, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::db(e, "Failed to start transaction"))?;

    let mut lock_keys = Vec::new();
    if let Some(group_id) = payload.group_id.as_deref() {
        lock_keys.push(format!("event:group:{group_id}"));
    }
    if let Some(course_id) = payload.course_id.as_deref() {
        lock_keys.push(format!("event:course:{course_id}"));
    }
    if let Some(teacher_id) = payload.teacher_id.as_deref() {
        lock_keys.push(format!("event:teacher:{teacher_id}"));
    }
    lock_keys.sort();
    for key in &lock_keys {
        repositories::locks::advisory_xact_lock(&mut *tx, key)
            .await
            .map_err(|e| ApiError::db(e, "Failed to acquire schedule lock"))?;
    }

    let in_scope = repositories::events::list_in_scope(
        &mut *tx,
        payload.group_id.as_deref(),
        payload.course_id.as_deref(),
        payload.teacher_id.as_deref(),
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to check event conflicts"))?;

    let conflicting = in_scope.iter().any(|event| {
        scheduling::overlaps(event.starts_at, event.ends_at, payload.starts_at, payload.ends_at)
    });
    if conflicting {
        return Err(ApiError::ScheduleConflict(
            "Event overlaps an existing event in the same scope".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let event = repositories::events::create(
        &mut *tx,
        repositories::events::CreateCalendarEvent {
            id: &Uuid::new_v4().to_string(),
            title: &payload.title,
            starts_at: payload.starts_at,
            ends_at: payload.ends_at,
            group_id: payload.group_id.as_deref(),
            course_id: payload.course_id.as_deref(),
            teacher_id: payload.teacher_id.as_deref(),
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to create event"))?;

    audit::record(
        &mut *tx,
        ctx,
        AuditEvent {
            user_id: Some(&current.user.id),
            action: "create",
            resource: "calendar_events",
            resource_id: &event.id,
            old_value: None,
            new_value: Some(json!({
                "title": event.title,
                "group_id": event.group_id,
                "course_id": event.course_id,
                "teacher_id": event.teacher_id,
            })),
            success: true,
            error_msg: None,
        },
    )
    .await
    .map_err(|e| ApiError::db(e, "Failed to record audit event"))?;

    tx.commit().await.map_err(|e| ApiError::db(e, "Failed to commit transaction"))?;

    Ok(event)
}

#[cfg(test)]
mod tests;
