use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::{GroupState, UserRole};
use crate::repositories;
use crate::test_support;

async fn join(
    ctx: &test_support::TestContext,
    group_id: &str,
    email: &str,
) -> (String, i32) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/groups/{group_id}/waitlist"),
            None,
            Some(json!({ "first_name": "Wait", "last_name": "Listed", "email": email })),
        ))
        .await
        .expect("join waitlist");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    (
        body["data"]["id"].as_str().unwrap().to_string(),
        body["data"]["position"].as_i64().unwrap() as i32,
    )
}

async fn waiting_positions(ctx: &test_support::TestContext, group_id: &str) -> Vec<i32> {
    repositories::waitlist::list_waiting(ctx.state.db(), group_id)
        .await
        .expect("list waiting")
        .iter()
        .map(|entry| entry.position)
        .collect()
}

#[tokio::test]
async fn positions_stay_dense_through_processing() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group = test_support::insert_group(ctx.state.db(), &course.id, 5, GroupState::Active).await;

    let (first, p1) = join(&ctx, &group.id, "w1@x.io").await;
    let (second, p2) = join(&ctx, &group.id, "w2@x.io").await;
    let (_third, p3) = join(&ctx, &group.id, "w3@x.io").await;
    assert_eq!((p1, p2, p3), (1, 2, 3));

    // Offering the head compacts the remaining queue to 1..2.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/waitlist/{first}/offer"),
            Some(&token),
            None,
        ))
        .await
        .expect("offer");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["data"]["status"], "offered");
    assert_eq!(waiting_positions(&ctx, &group.id).await, vec![1, 2]);

    // Declining a waiting entry compacts the tail behind it.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/waitlist/{second}/decline"),
            Some(&token),
            None,
        ))
        .await
        .expect("decline");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(waiting_positions(&ctx, &group.id).await, vec![1]);

    // Accepting the offered entry enrolls the candidate.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/waitlist/{first}/accept"),
            Some(&token),
            None,
        ))
        .await
        .expect("accept");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["data"]["status"], "accepted");
    let student_id = body["data"]["student_id"].as_str().expect("student id");

    let enrolled = repositories::enrollments::is_enrolled(ctx.state.db(), student_id, &group.id)
        .await
        .expect("enrollment check");
    assert!(enrolled);
    assert_eq!(waiting_positions(&ctx, &group.id).await, vec![1]);
}

#[tokio::test]
async fn accept_requires_a_prior_offer() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group = test_support::insert_group(ctx.state.db(), &course.id, 5, GroupState::Active).await;
    let (entry, _) = join(&ctx, &group.id, "w1@x.io").await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/waitlist/{entry}/accept"),
            Some(&token),
            None,
        ))
        .await
        .expect("accept waiting entry");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "INVALID_OPERATION");
}

#[tokio::test]
async fn accept_on_a_full_group_reports_capacity_and_keeps_the_offer() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group = test_support::insert_group(ctx.state.db(), &course.id, 1, GroupState::Active).await;
    let seated = test_support::insert_student(ctx.state.db(), "seated@x.io").await;
    test_support::enroll_student(ctx.state.db(), &seated.id, &group.id).await;

    let (entry, _) = join(&ctx, &group.id, "w1@x.io").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/waitlist/{entry}/offer"),
            Some(&token),
            None,
        ))
        .await
        .expect("offer");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/waitlist/{entry}/accept"),
            Some(&token),
            None,
        ))
        .await
        .expect("accept");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "CAPACITY_EXCEEDED");

    // The failed accept rolls back; the entry can be re-offered or expired.
    let stored = repositories::waitlist::find_by_id(ctx.state.db(), &entry)
        .await
        .expect("load entry")
        .expect("entry exists");
    assert_eq!(stored.status, crate::db::types::WaitlistStatus::Offered);
}

#[tokio::test]
async fn expire_from_waiting_compacts_the_queue() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let course = test_support::insert_course(ctx.state.db(), "Mathematics").await;
    let group = test_support::insert_group(ctx.state.db(), &course.id, 5, GroupState::Active).await;

    let (_first, _) = join(&ctx, &group.id, "w1@x.io").await;
    let (second, _) = join(&ctx, &group.id, "w2@x.io").await;
    let (_third, _) = join(&ctx, &group.id, "w3@x.io").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/waitlist/{second}/expire"),
            Some(&token),
            None,
        ))
        .await
        .expect("expire");
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(waiting_positions(&ctx, &group.id).await, vec![1, 2]);
}
