use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support;

#[tokio::test]
async fn audit_listing_filters_and_paginates() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_user(&ctx.state, "admin@x.io", UserRole::Admin, "admin-pass")
        .await;
    let token = test_support::bearer_for(ctx.state.db(), &admin).await;

    // Three audited course creations plus their bearer's implicit rows.
    for index in 0..3 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/courses",
                Some(&token),
                Some(json!({ "name": format!("Course {index}") })),
            ))
            .await
            .expect("create course");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/audit?resource=courses&page=1&page_size=2",
            Some(&token),
            None,
        ))
        .await
        .expect("list audit");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["page_size"], 2);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["data"].as_array().expect("rows").len(), 2);
    for row in body["data"].as_array().expect("rows") {
        assert_eq!(row["resource"], "courses");
        assert_eq!(row["action"], "create");
        assert_eq!(row["user_id"], admin.id.as_str());
    }

    // Unknown sort fields are rejected, not interpolated.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/audit?sort=new_value",
            Some(&token),
            None,
        ))
        .await
        .expect("list audit with bad sort");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn audit_listing_requires_staff() {
    let ctx = test_support::setup_test_context().await;
    let parent =
        test_support::insert_user(&ctx.state, "parent@x.io", UserRole::Parent, "parent-pass")
            .await;
    let token = test_support::bearer_for(ctx.state.db(), &parent).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/audit", Some(&token), None))
        .await
        .expect("list audit");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn sensitive_values_are_redacted_in_audit_rows() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_user(&ctx.state, "admin@x.io", UserRole::Admin, "admin-pass")
        .await;
    let token = test_support::bearer_for(ctx.state.db(), &admin).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "email": "fresh@x.io",
                "password": "super-secret-pass",
                "role": "staff",
                "first_name": "Fresh",
                "last_name": "Hire"
            })),
        ))
        .await
        .expect("create user");
    assert_eq!(response.status(), StatusCode::CREATED);

    let leaked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM audit_logs \
         WHERE old_value::text LIKE '%super-secret-pass%' \
            OR new_value::text LIKE '%super-secret-pass%'",
    )
    .fetch_one(ctx.state.db())
    .await
    .expect("scan audit");
    assert_eq!(leaked, 0);
}
