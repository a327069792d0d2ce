//! End-to-end tests of the HTTP surface over in-memory state

mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::{TestContext, BASE_URL};
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();
    let (status, body) = ctx.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_security_headers_on_responses() {
    let ctx = TestContext::new();
    let response = {
        use tower::Service as _;
        let req = axum::http::Request::builder()
            .uri("/health")
            .body(axum::body::Body::empty())
            .unwrap();
        ctx.app.clone().call(req).await.unwrap()
    };

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_register_and_login() {
    let ctx = TestContext::new();
    let body = ctx.register("Bob", "bob@example.com", "hunter2").await;

    assert_eq!(body["user"]["email"], "bob@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body.get("claimed_task").is_none());

    let (status, token) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "bob@example.com", "password": "hunter2" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["token_type"], "Bearer");
    assert_eq!(token["expires_in"], 3600);
}

#[tokio::test]
async fn test_register_conflict_and_validation() {
    let ctx = TestContext::new();
    ctx.register("Bob", "bob@example.com", "hunter2").await;

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Bob", "email": "bob@example.com", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Eve", "email": "not-an-email", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert_eq!(body["message"], "invalid email address provided");

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Eve", "email": "eve@example.com", "password": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_login_failures_are_uniform() {
    let ctx = TestContext::new();
    ctx.register("Bob", "bob@example.com", "hunter2").await;

    let (wrong_status, wrong_body) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "bob@example.com", "password": "nope" })),
        )
        .await;
    let (unknown_status, unknown_body) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "carol@example.com", "password": "hunter2" })),
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);

    for body in [
        json!({ "email": "", "password": "hunter2" }),
        json!({ "email": "bob@example.com", "password": "" }),
        json!({ "email": "not-an-email", "password": "hunter2" }),
    ] {
        let (status, body) = ctx
            .request(Method::POST, "/api/auth/login", None, Some(body))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, wrong_body);
    }
}

#[tokio::test]
async fn test_task_routes_require_bearer_token() {
    let ctx = TestContext::new();

    for (method, uri) in [
        (Method::GET, "/api/tasks"),
        (Method::POST, "/api/tasks/assign"),
        (Method::GET, "/api/tasks/1"),
        (Method::DELETE, "/api/tasks/1"),
    ] {
        let (status, body) = ctx.request(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "unauthorized");
    }

    let (status, _) = ctx
        .request(Method::GET, "/api/tasks", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("Bob", "bob@example.com").await;

    let (status, _) = ctx.request(Method::GET, "/api/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    ctx.clock.advance(Duration::minutes(61));
    let (status, _) = ctx.request(Method::GET, "/api/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_crud() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("Ann", "ann@example.com").await;

    let (status, task) = ctx
        .request(
            Method::POST,
            "/api/tasks",
            Some(&token),
            Some(json!({ "detail": "Buy milk", "complete_by": "2025-02-01T10:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["state"], "claimed");
    assert_eq!(task["detail"], "Buy milk");
    let id = task["id"].as_i64().unwrap();

    let (status, list) = ctx.request(Method::GET, "/api/tasks", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, edited) = ctx
        .request(
            Method::PUT,
            &format!("/api/tasks/{id}"),
            Some(&token),
            Some(json!({ "detail": "Buy oat milk" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["detail"], "Buy oat milk");
    assert_eq!(edited["complete_by"], task["complete_by"]);

    let (status, _) = ctx
        .request(Method::DELETE, &format!("/api/tasks/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = ctx
        .request(Method::DELETE, &format!("/api/tasks/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = ctx
        .request(Method::GET, &format!("/api/tasks/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_with_unknown_owner_is_bad_request() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("Ann", "ann@example.com").await;

    let (_, task) = ctx
        .request(Method::POST, "/api/tasks", Some(&token), Some(json!({ "detail": "x" })))
        .await;
    let id = task["id"].as_i64().unwrap();

    let (status, body) = ctx
        .request(
            Method::PUT,
            &format!("/api/tasks/{id}"),
            Some(&token),
            Some(json!({ "owner_id": 9999 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "owner does not exist");
}

#[tokio::test]
async fn test_invitation_flow() {
    let ctx = TestContext::new();
    let ann = ctx.signed_in("Ann", "ann@example.com").await;

    let (status, task) = ctx
        .request(
            Method::POST,
            "/api/tasks/assign",
            Some(&ann),
            Some(json!({ "detail": "Review PR", "assigned_to": "bob@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["state"], "pending");
    assert!(task.get("owner_id").is_none());
    let id = task["id"].as_i64().unwrap();

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    let link = format!("{BASE_URL}/api/auth/register?tid={id}");
    assert!(sent[0].html_body.contains(&link));

    let (status, registered) = ctx
        .request(
            Method::POST,
            &format!("/api/auth/register?tid={id}"),
            None,
            Some(json!({ "name": "Bob", "email": "bob@example.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let bob_id = registered["user"]["id"].as_i64().unwrap();
    assert_eq!(registered["claimed_task"]["id"], id);
    assert_eq!(registered["claimed_task"]["owner_id"], bob_id);

    let bob = ctx.login("bob@example.com", "pw").await;
    let (_, tasks) = ctx.request(Method::GET, "/api/tasks", Some(&bob), None).await;
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["state"], "claimed");
}

#[tokio::test]
async fn test_register_with_mismatched_invitation_still_succeeds() {
    let ctx = TestContext::new();
    let ann = ctx.signed_in("Ann", "ann@example.com").await;

    let (_, task) = ctx
        .request(
            Method::POST,
            "/api/tasks/assign",
            Some(&ann),
            Some(json!({ "assigned_to": "bob@example.com" })),
        )
        .await;
    let id = task["id"].as_i64().unwrap();

    let (status, registered) = ctx
        .request(
            Method::POST,
            &format!("/api/auth/register?tid={id}"),
            None,
            Some(json!({ "name": "Carol", "email": "carol@example.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(registered.get("claimed_task").is_none());

    // Unknown task ids are ignored as well
    let (status, _) = ctx
        .request(
            Method::POST,
            "/api/auth/register?tid=424242",
            None,
            Some(json!({ "name": "Dan", "email": "dan@example.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, task) = ctx
        .request(Method::GET, &format!("/api/tasks/{id}"), Some(&ann), None)
        .await;
    assert_eq!(task["state"], "pending");
}

#[tokio::test]
async fn test_assign_to_registered_user_sends_no_invite() {
    let ctx = TestContext::new();
    let ann = ctx.signed_in("Ann", "ann@example.com").await;
    ctx.register("Bob", "bob@example.com", "pw").await;

    let (status, task) = ctx
        .request(
            Method::POST,
            "/api/tasks/assign",
            Some(&ann),
            Some(json!({ "detail": "Deploy", "assigned_to": "bob@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["state"], "claimed");
    assert!(ctx.notifier.sent().is_empty());

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/tasks/assign",
            Some(&ann),
            Some(json!({ "detail": "No one" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}
