//! Registration, login and token integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn health_is_public() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn register_then_login() {
    let harness = TestHarness::new();
    harness.register("alice").await;

    let response = harness
        .server
        .post("/api/auth/login")
        .json(&json!({ "login": "alice", "password": "password123" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn new_account_starts_with_one_hundred_dollars() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;

    let response = harness
        .server
        .get("/api/user/balance")
        .add_header("authorization", auth)
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["balance_cents"], 10_000);
    assert_eq!(body["balance_formatted"], "$100.00");
}

#[tokio::test]
async fn duplicate_login_conflicts() {
    let harness = TestHarness::new();
    harness.register("alice").await;

    let response = harness
        .server
        .post("/api/auth/register")
        .json(&json!({ "login": "  alice ", "password": "password123" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn invalid_registration_is_bad_request() {
    let harness = TestHarness::new();

    for (login, password) in [("ab", "password123"), ("alice", "12345")] {
        let response = harness
            .server
            .post("/api/auth/register")
            .json(&json!({ "login": login, "password": password }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn wrong_password_and_unknown_login_look_the_same() {
    let harness = TestHarness::new();
    harness.register("alice").await;

    for login in ["alice", "nobody"] {
        let response = harness
            .server
            .post("/api/auth/login")
            .json(&json!({ "login": login, "password": "wrong-password" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "unauthorized");
    }
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/api/user/reports")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    harness
        .server
        .get("/api/user/reports")
        .add_header("authorization", "Bearer not-a-token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    harness
        .server
        .get("/api/user/reports")
        .add_header("authorization", "Basic abc")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let harness = TestHarness::new();
    let other = TestHarness::with_config(reportpay_service::ServiceConfig {
        jwt_secret: "another-secret".into(),
        ..common::test_config()
    });
    let foreign = other.register("alice").await;

    harness
        .server
        .get("/api/user/balance")
        .add_header("authorization", foreign)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
