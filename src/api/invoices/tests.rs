use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support;

#[tokio::test]
async fn recurring_generation_is_idempotent_per_period() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let student = test_support::insert_student(ctx.state.db(), "payer@x.io").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/invoices/schedules",
            Some(&token),
            Some(json!({
                "student_id": student.id,
                "amount_cents": 15000,
                "currency": "eur",
                "cadence": "monthly",
                "anchor_date": "2025-01-15"
            })),
        ))
        .await
        .expect("create schedule");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["data"]["currency"], "EUR");
    assert_eq!(body["data"]["next_due_date"], "2025-01-15");

    let generate = json!({ "from_date": "2025-01-01", "to_date": "2025-04-30" });

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/invoices/generate",
            Some(&token),
            Some(generate.clone()),
        ))
        .await
        .expect("first generate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["data"]["generated"], 4);
    assert_eq!(body["data"]["skipped"], 0);

    // Second pass over the same window creates nothing new.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/invoices/generate",
            Some(&token),
            Some(generate),
        ))
        .await
        .expect("second generate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["data"]["generated"], 0);
    assert_eq!(body["data"]["skipped"], 4);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/students/{}/invoices", student.id),
            Some(&token),
            None,
        ))
        .await
        .expect("list invoices");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let periods: Vec<&str> = body["data"]
        .as_array()
        .expect("invoice array")
        .iter()
        .map(|invoice| invoice["period_start"].as_str().unwrap())
        .collect();
    assert_eq!(periods, vec!["2025-01-15", "2025-02-15", "2025-03-15", "2025-04-15"]);
}

#[tokio::test]
async fn generation_resumes_where_the_schedule_left_off() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let student = test_support::insert_student(ctx.state.db(), "payer@x.io").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/invoices/schedules",
            Some(&token),
            Some(json!({
                "student_id": student.id,
                "amount_cents": 9900,
                "currency": "EUR",
                "cadence": "monthly",
                "anchor_date": "2025-01-31"
            })),
        ))
        .await
        .expect("create schedule");
    let body = test_support::read_json(response).await;
    let schedule_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/invoices/generate",
            Some(&token),
            Some(json!({
                "from_date": "2025-01-01",
                "to_date": "2025-02-28",
                "schedule_id": schedule_id
            })),
        ))
        .await
        .expect("first window");
    let body = test_support::read_json(response).await;
    // Jan 31 and the clamped Feb 28.
    assert_eq!(body["data"]["generated"], 2);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/invoices/generate",
            Some(&token),
            Some(json!({
                "from_date": "2025-03-01",
                "to_date": "2025-04-30",
                "schedule_id": schedule_id
            })),
        ))
        .await
        .expect("second window");
    let body = test_support::read_json(response).await;
    // Mar 31 (no drift back to the 28th) and Apr 30.
    assert_eq!(body["data"]["generated"], 2);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/students/{}/invoices", student.id),
            Some(&token),
            None,
        ))
        .await
        .expect("list invoices");
    let body = test_support::read_json(response).await;
    let periods: Vec<&str> = body["data"]
        .as_array()
        .expect("invoice array")
        .iter()
        .map(|invoice| invoice["period_start"].as_str().unwrap())
        .collect();
    assert_eq!(periods, vec!["2025-01-31", "2025-02-28", "2025-03-31", "2025-04-30"]);
}

#[tokio::test]
async fn generation_for_unknown_schedule_is_not_found() {
    let ctx = test_support::setup_test_context().await;
    let staff =
        test_support::insert_user(&ctx.state, "staff@x.io", UserRole::Staff, "staff-pass").await;
    let token = test_support::bearer_for(ctx.state.db(), &staff).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/invoices/generate",
            Some(&token),
            Some(json!({
                "from_date": "2025-01-01",
                "to_date": "2025-04-30",
                "schedule_id": "00000000-0000-0000-0000-000000000000"
            })),
        ))
        .await
        .expect("generate");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "response: {body}");
    assert_eq!(body["code"], "NOT_FOUND");
}
