use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::{GroupState, UserRole};
use crate::test_support;

#[tokio::test]
async fn attendance_batch_upserts_idempotently() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group = test_support::insert_group(ctx.state.db(), &course.id, 10, GroupState::Active).await;
    let student1 = test_support::insert_student(ctx.state.db(), "s1@x.io").await;
    let student2 = test_support::insert_student(ctx.state.db(), "s2@x.io").await;
    test_support::enroll_student(ctx.state.db(), &student1.id, &group.id).await;
    test_support::enroll_student(ctx.state.db(), &student2.id, &group.id).await;

    let batch = json!({
        "date": "2025-03-10",
        "entries": [
            { "student_id": student1.id, "status": "present" },
            { "student_id": student2.id, "status": "present" }
        ]
    });

    let uri = format!("/api/v1/groups/{}/attendance/batch", group.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &uri, Some(&token), Some(batch.clone())))
        .await
        .expect("first batch");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let first_updated_at = body["data"]["records"][0]["updated_at"].as_str().unwrap().to_string();

    // Same payload again: same two rows, refreshed updated_at, no new rows.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &uri, Some(&token), Some(batch)))
        .await
        .expect("second batch");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE group_id = $1")
            .bind(&group.id)
            .fetch_one(ctx.state.db())
            .await
            .expect("count attendance");
    assert_eq!(count, 2);
    assert_ne!(body["data"]["records"][0]["updated_at"].as_str().unwrap(), first_updated_at);

    // Flipping one student touches only that row's status.
    let flipped = json!({
        "date": "2025-03-10",
        "entries": [{ "student_id": student1.id, "status": "absent" }]
    });
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &uri, Some(&token), Some(flipped)))
        .await
        .expect("third batch");
    assert_eq!(response.status(), StatusCode::OK);

    let status1: String = sqlx::query_scalar(
        "SELECT status::text FROM attendance WHERE group_id = $1 AND student_id = $2",
    )
    .bind(&group.id)
    .bind(&student1.id)
    .fetch_one(ctx.state.db())
    .await
    .expect("student1 status");
    let status2: String = sqlx::query_scalar(
        "SELECT status::text FROM attendance WHERE group_id = $1 AND student_id = $2",
    )
    .bind(&group.id)
    .bind(&student2.id)
    .fetch_one(ctx.state.db())
    .await
    .expect("student2 status");
    assert_eq!(status1, "absent");
    assert_eq!(status2, "present");
}

#[tokio::test]
async fn attendance_batch_rejects_duplicate_students() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group = test_support::insert_group(ctx.state.db(), &course.id, 10, GroupState::Active).await;
    let student = test_support::insert_student(ctx.state.db(), "s1@x.io").await;
    test_support::enroll_student(ctx.state.db(), &student.id, &group.id).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/groups/{}/attendance/batch", group.id),
            Some(&token),
            Some(json!({
                "date": "2025-03-10",
                "entries": [
                    { "student_id": student.id, "status": "present" },
                    { "student_id": student.id, "status": "late" }
                ]
            })),
        ))
        .await
        .expect("batch");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn attendance_batch_rejects_unenrolled_students_atomically() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group = test_support::insert_group(ctx.state.db(), &course.id, 10, GroupState::Active).await;
    let enrolled = test_support::insert_student(ctx.state.db(), "in@x.io").await;
    let outsider = test_support::insert_student(ctx.state.db(), "out@x.io").await;
    test_support::enroll_student(ctx.state.db(), &enrolled.id, &group.id).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/groups/{}/attendance/batch", group.id),
            Some(&token),
            Some(json!({
                "date": "2025-03-10",
                "entries": [
                    { "student_id": enrolled.id, "status": "present" },
                    { "student_id": outsider.id, "status": "present" }
                ]
            })),
        ))
        .await
        .expect("batch");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "INVALID_OPERATION");

    // All-or-nothing: the valid entry must not have been written either.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attendance WHERE group_id = $1")
        .bind(&group.id)
        .fetch_one(ctx.state.db())
        .await
        .expect("count attendance");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn get_group_reports_current_enrollment() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group = test_support::insert_group(ctx.state.db(), &course.id, 5, GroupState::Active).await;
    let student = test_support::insert_student(ctx.state.db(), "s1@x.io").await;
    test_support::enroll_student(ctx.state.db(), &student.id, &group.id).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/groups/{}", group.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get group");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["data"]["capacity"], 5);
    assert_eq!(body["data"]["current_enrollment"], 1);
}
