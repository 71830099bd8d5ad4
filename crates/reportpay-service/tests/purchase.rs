//! Report purchase integration tests.

mod common;

use std::future::IntoFuture;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

use reportpay_store::{Ledger, ReportStore};

fn purchase_path(report_id: &str) -> String {
    format!("/api/reports/{report_id}/purchase")
}

#[tokio::test]
async fn create_report_returns_anonymous_report() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/api/mock/create-report")
        .json(&json!({ "client_generated_id": "device-1" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Report created successfully");
    assert_eq!(body["report"]["report_id"], body["report_id"]);
    assert_eq!(body["report"]["id"], "1");
    assert_eq!(body["report"]["client_generated_id"], "device-1");
    assert_eq!(body["report"]["is_purchased"], false);
    assert!(body["report"].get("user_id").is_none());
}

#[tokio::test]
async fn purchase_debits_price_and_flags_report() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;
    let report_id = harness.create_owned_report(&auth, "device-1").await;

    let response = harness
        .server
        .post(&purchase_path(&report_id))
        .add_header("authorization", auth.clone())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Report purchased successfully");
    assert_eq!(body["balance_cents"], 9_500);
    assert_eq!(body["balance_formatted"], "$95.00");

    let reports = harness
        .server
        .get("/api/user/reports")
        .add_header("authorization", auth)
        .await;
    let body: serde_json::Value = reports.json();
    assert_eq!(body["reports"][0]["is_purchased"], true);
}

#[tokio::test]
async fn second_purchase_conflicts_without_debit() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;
    let report_id = harness.create_owned_report(&auth, "device-1").await;

    harness
        .server
        .post(&purchase_path(&report_id))
        .add_header("authorization", auth.clone())
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&purchase_path(&report_id))
        .add_header("authorization", auth)
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "already_purchased");

    let user_id = harness.user_id("alice").await;
    assert_eq!(harness.ledger.get_balance(&user_id).await.unwrap(), 9_500);
}

#[tokio::test]
async fn short_balance_is_payment_required() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;
    let user_id = harness.user_id("alice").await;
    harness.ledger.set_balance(&user_id, 400).await.unwrap();
    let report_id = harness.create_owned_report(&auth, "device-1").await;

    let response = harness
        .server
        .post(&purchase_path(&report_id))
        .add_header("authorization", auth)
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_balance");
    assert_eq!(body["error"]["details"]["balance"], 400);
    assert_eq!(body["error"]["details"]["required"], 500);

    assert_eq!(harness.ledger.get_balance(&user_id).await.unwrap(), 400);
    let report = harness
        .reports
        .get_by_public_id(&report_id.parse().unwrap())
        .await
        .unwrap();
    assert!(!report.is_purchased);
}

#[tokio::test]
async fn foreign_and_unknown_reports_are_not_found() {
    let harness = TestHarness::new();
    let alice = harness.register("alice").await;
    let bob = harness.register("bob").await;
    let bobs_report = harness.create_owned_report(&bob, "device-b").await;
    let anonymous = harness.create_report("device-x").await;

    for report_id in [bobs_report.as_str(), anonymous.as_str(), "01J0000000000000000000000"] {
        let response = harness
            .server
            .post(&purchase_path(report_id))
            .add_header("authorization", alice.clone())
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["code"], "report_not_found");
    }

    let user_id = harness.user_id("alice").await;
    assert_eq!(harness.ledger.get_balance(&user_id).await.unwrap(), 10_000);
}

#[tokio::test]
async fn blank_report_id_is_bad_request() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;

    let response = harness
        .server
        .post(&purchase_path("%20"))
        .add_header("authorization", auth)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(body["error"]["message"], "identifier must not be empty");
}

#[tokio::test]
async fn purchase_requires_authentication() {
    let harness = TestHarness::new();
    let report_id = harness.create_report("device-1").await;

    harness
        .server
        .post(&purchase_path(&report_id))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_charge_once() {
    let harness = TestHarness::new();
    let auth = harness.register("alice").await;
    let report_id = harness.create_owned_report(&auth, "device-1").await;
    let path = purchase_path(&report_id);

    let responses = futures::future::join_all((0..8).map(|_| {
        harness
            .server
            .post(&path)
            .add_header("authorization", auth.clone())
            .into_future()
    }))
    .await;

    let ok = responses
        .iter()
        .filter(|r| r.status_code() == StatusCode::OK)
        .count();
    let conflicts = responses
        .iter()
        .filter(|r| r.status_code() == StatusCode::CONFLICT)
        .count();

    assert_eq!(ok, 1);
    assert_eq!(conflicts, 7);

    let user_id = harness.user_id("alice").await;
    assert_eq!(harness.ledger.get_balance(&user_id).await.unwrap(), 9_500);
    assert!(harness.ledger.unflagged_debits(&user_id).await.unwrap().is_empty());
}
