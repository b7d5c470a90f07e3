use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::{GroupState, UserRole};
use crate::test_support;

#[tokio::test]
async fn timetable_rejects_overlap_but_allows_touching_slots() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group = test_support::insert_group(ctx.state.db(), &course.id, 10, GroupState::Active).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/timetable",
            Some(&token),
            Some(json!({
                "group_id": group.id,
                "weekday": 0,
                "start_time": "09:00",
                "end_time": "10:30",
                "room": "R1"
            })),
        ))
        .await
        .expect("first entry");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");

    // Overlapping slot, same group and room.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/timetable",
            Some(&token),
            Some(json!({
                "group_id": group.id,
                "weekday": 0,
                "start_time": "10:00",
                "end_time": "11:00",
                "room": "R1"
            })),
        ))
        .await
        .expect("overlapping entry");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "SCHEDULE_CONFLICT");

    // Touching endpoint (10:30 start) is not a conflict.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/timetable",
            Some(&token),
            Some(json!({
                "group_id": group.id,
                "weekday": 0,
                "start_time": "10:30",
                "end_time": "11:30",
                "room": "R1"
            })),
        ))
        .await
        .expect("touching entry");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
}

#[tokio::test]
async fn timetable_room_scope_conflicts_across_groups() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group_a = test_support::insert_group(ctx.state.db(), &course.id, 10, GroupState::Active).await;
    let group_b = test_support::insert_group(ctx.state.db(), &course.id, 10, GroupState::Active).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/timetable",
            Some(&token),
            Some(json!({
                "group_id": group_a.id,
                "weekday": 2,
                "start_time": "09:00",
                "end_time": "10:00",
                "room": "R7"
            })),
        ))
        .await
        .expect("group A entry");
    assert_eq!(response.status(), StatusCode::CREATED);

    // Different group, same room and window.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/timetable",
            Some(&token),
            Some(json!({
                "group_id": group_b.id,
                "weekday": 2,
                "start_time": "09:30",
                "end_time": "10:30",
                "room": "R7"
            })),
        ))
        .await
        .expect("group B entry");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "SCHEDULE_CONFLICT");

    // Same window, no room on either side of the clash: different groups
    // do not conflict.
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/timetable",
            Some(&token),
            Some(json!({
                "group_id": group_b.id,
                "weekday": 2,
                "start_time": "09:30",
                "end_time": "10:30"
            })),
        ))
        .await
        .expect("roomless entry");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn exam_conflicts_are_course_transitive() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group_a = test_support::insert_group(ctx.state.db(), &course.id, 10, GroupState::Active).await;
    let group_b = test_support::insert_group(ctx.state.db(), &course.id, 10, GroupState::Active).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/exams",
            Some(&token),
            Some(json!({
                "group_id": group_a.id,
                "title": "Midterm",
                "starts_at": "2025-06-01T09:00:00Z",
                "ends_at": "2025-06-01T11:00:00Z"
            })),
        ))
        .await
        .expect("first exam");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");

    // Sibling group of the same course overlapping the window.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/exams",
            Some(&token),
            Some(json!({
                "group_id": group_b.id,
                "title": "Midterm B",
                "starts_at": "2025-06-01T10:00:00Z",
                "ends_at": "2025-06-01T12:00:00Z"
            })),
        ))
        .await
        .expect("sibling exam");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "SCHEDULE_CONFLICT");

    // Back-to-back is fine.
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/exams",
            Some(&token),
            Some(json!({
                "group_id": group_b.id,
                "title": "Midterm B",
                "starts_at": "2025-06-01T11:00:00Z",
                "ends_at": "2025-06-01T13:00:00Z"
            })),
        ))
        .await
        .expect("touching exam");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn event_conflicts_follow_each_scope_key() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let teacher_id = test_support::insert_teacher_row(ctx.state.db(), "teach@x.io").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/events",
            Some(&token),
            Some(json!({
                "title": "Office hours",
                "starts_at": "2025-06-02T14:00:00Z",
                "ends_at": "2025-06-02T16:00:00Z",
                "teacher_id": teacher_id
            })),
        ))
        .await
        .expect("first event");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/events",
            Some(&token),
            Some(json!({
                "title": "Staff meeting",
                "starts_at": "2025-06-02T15:00:00Z",
                "ends_at": "2025-06-02T17:00:00Z",
                "teacher_id": teacher_id
            })),
        ))
        .await
        .expect("conflicting event");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "SCHEDULE_CONFLICT");

    // Same window with no shared scope key does not conflict.
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/schedule/events",
            Some(&token),
            Some(json!({
                "title": "Open day",
                "starts_at": "2025-06-02T15:00:00Z",
                "ends_at": "2025-06-02T17:00:00Z"
            })),
        ))
        .await
        .expect("scopeless event");
    assert_eq!(response.status(), StatusCode::CREATED);
}
