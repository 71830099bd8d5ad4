//! Common test utilities for reportpay integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::json;

use reportpay_core::UserId;
use reportpay_service::{create_router, AppState, ServiceConfig, StorageBackend};
use reportpay_store::{MemoryLedger, MemoryReportStore};

/// Test harness over in-memory stores.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct handle on the ledger, for seeding and assertions.
    pub ledger: MemoryLedger,
    /// Direct handle on the report store.
    pub reports: MemoryReportStore,
}

impl TestHarness {
    /// Create a harness with the default test configuration.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a harness with a custom configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        let ledger = MemoryLedger::new();
        let reports = MemoryReportStore::new();

        let state = AppState::new(
            Arc::new(ledger.clone()),
            Arc::new(reports.clone()),
            config,
        );
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            ledger,
            reports,
        }
    }

    /// Register a user and return its bearer header value.
    pub async fn register(&self, login: &str) -> String {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({ "login": login, "password": "password123" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: serde_json::Value = response.json();
        let token = body["access_token"]
            .as_str()
            .expect("access_token missing")
            .to_string();
        format!("Bearer {token}")
    }

    /// Look up a registered user's ID.
    pub async fn user_id(&self, login: &str) -> UserId {
        use reportpay_store::Ledger;
        self.ledger
            .get_user_by_login(login)
            .await
            .expect("user not registered")
            .id
    }

    /// Create an anonymous report through the mock endpoint and return its ID.
    pub async fn create_report(&self, client_generated_id: &str) -> String {
        let response = self
            .server
            .post("/api/mock/create-report")
            .json(&json!({ "client_generated_id": client_generated_id }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: serde_json::Value = response.json();
        body["report_id"]
            .as_str()
            .expect("report_id missing")
            .to_string()
    }

    /// Create a report and link it to the user behind `auth`.
    pub async fn create_owned_report(&self, auth: &str, client_generated_id: &str) -> String {
        let report_id = self.create_report(client_generated_id).await;
        self.server
            .post("/api/user/link-anonymous")
            .add_header("authorization", auth.to_string())
            .json(&json!({ "client_generated_id": client_generated_id }))
            .await
            .assert_status_ok();
        report_id
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration used by the integration suites.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        listen_addr: "127.0.0.1:0".into(),
        storage_backend: StorageBackend::Memory,
        jwt_secret: "test-secret".into(),
        ..ServiceConfig::default()
    }
}
