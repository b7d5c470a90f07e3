use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn staff_can_create_user() {
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
                "email": "New.Staff@X.IO",
                "password": "staff-pass",
                "role": "staff",
                "first_name": "New",
                "last_name": "Staff"
            })),
        ))
        .await
        .expect("create user");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    // Emails are normalised to lowercase before storage.
    assert_eq!(body["data"]["email"], "new.staff@x.io");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "email": "new.staff@x.io",
                "password": "staff-pass",
                "role": "staff",
                "first_name": "New",
                "last_name": "Staff"
            })),
        ))
        .await
        .expect("create duplicate user");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
    assert_eq!(body["code"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn non_staff_cannot_create_users() {
    let ctx = test_support::setup_test_context().await;
    let parent =
        test_support::insert_user(&ctx.state, "parent@x.io", UserRole::Parent, "parent-pass")
            .await;
    let token = test_support::bearer_for(ctx.state.db(), &parent).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "email": "x@x.io",
                "password": "password8",
                "role": "staff",
                "first_name": "X",
                "last_name": "Y"
            })),
        ))
        .await
        .expect("create user");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "response: {body}");
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn teacher_role_requires_teacher_link() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_user(&ctx.state, "admin@x.io", UserRole::Admin, "admin-pass")
        .await;
    let token = test_support::bearer_for(ctx.state.db(), &admin).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "email": "teach@x.io",
                "password": "password8",
                "role": "teacher",
                "first_name": "No",
                "last_name": "Link"
            })),
        ))
        .await
        .expect("create teacher user");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn deactivated_user_token_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(&ctx.state, "gone@x.io", UserRole::Staff, "password8")
        .await;
    let token = test_support::bearer_for(ctx.state.db(), &user).await;

    repositories::users::set_is_active(ctx.state.db(), &user.id, false, primitive_now_utc())
        .await
        .expect("deactivate user");

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/users/me", Some(&token), None))
        .await
        .expect("me");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "response: {body}");
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let ctx = test_support::setup_test_context().await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/users/me", None, None))
        .await
        .expect("me without token");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "response: {body}");
    assert_eq!(body["code"], "UNAUTHORIZED");
}
