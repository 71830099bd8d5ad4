//! Linking and listing integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

#[tokio::test]
async fn linking_claims_anonymous_reports_once() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;
    harness.create_report("device-1").await;
    harness.create_report("device-1").await;
    harness.create_report("device-2").await;

    let first = harness
        .server
        .post("/api/user/link-anonymous")
        .add_header("authorization", auth.clone())
        .json(&json!({ "client_generated_id": "device-1" }))
        .await;
    first.assert_status_ok();
    let body: serde_json::Value = first.json();
    assert_eq!(body["reports_linked"], 2);
    assert_eq!(body["message"], "Anonymous reports linked successfully");

    let second = harness
        .server
        .post("/api/user/link-anonymous")
        .add_header("authorization", auth)
        .json(&json!({ "client_generated_id": "device-1" }))
        .await;
    second.assert_status_ok();
    let body: serde_json::Value = second.json();
    assert_eq!(body["reports_linked"], 0);
}

#[tokio::test]
async fn linked_reports_cannot_be_claimed_by_another_user() {
    let harness = TestHarness::new();
    let alice = harness.register("alice").await;
    let bob = harness.register("bob").await;
    harness.create_owned_report(&alice, "device-1").await;

    let response = harness
        .server
        .post("/api/user/link-anonymous")
        .add_header("authorization", bob)
        .json(&json!({ "client_generated_id": "device-1" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["reports_linked"], 0);
}

#[tokio::test]
async fn blank_client_token_is_bad_request() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;

    harness
        .server
        .post("/api/user/link-anonymous")
        .add_header("authorization", auth)
        .json(&json!({ "client_generated_id": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_is_paginated_newest_first() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;
    let mut created = Vec::new();
    for _ in 0..3 {
        created.push(harness.create_report("device-1").await);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    harness
        .server
        .post("/api/user/link-anonymous")
        .add_header("authorization", auth.clone())
        .json(&json!({ "client_generated_id": "device-1" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/api/user/reports")
        .add_query_param("limit", 2)
        .add_query_param("offset", 0)
        .add_header("authorization", auth.clone())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total"], 3);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["offset"], 0);
    let reports = body["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["report_id"], created[2].as_str());
    assert_eq!(reports[1]["report_id"], created[1].as_str());

    let response = harness
        .server
        .get("/api/user/reports")
        .add_query_param("limit", 2)
        .add_query_param("offset", 2)
        .add_header("authorization", auth)
        .await;
    let body: serde_json::Value = response.json();
    let reports = body["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["report_id"], created[0].as_str());
}

#[tokio::test]
async fn out_of_range_paging_falls_back_to_defaults() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;

    for (limit, offset) in [("0", "-5"), ("101", "abc"), ("x", "")] {
        let response = harness
            .server
            .get("/api/user/reports")
            .add_query_param("limit", limit)
            .add_query_param("offset", offset)
            .add_header("authorization", auth.clone())
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["limit"], 20);
        assert_eq!(body["offset"], 0);
        assert_eq!(body["total"], 0);
    }
}

#[tokio::test]
async fn mock_routes_can_be_disabled() {
    let harness = TestHarness::with_config(reportpay_service::ServiceConfig {
        enable_mock_routes: false,
        ..common::test_config()
    });

    harness
        .server
        .post("/api/mock/create-report")
        .json(&json!({ "client_generated_id": "device-1" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
