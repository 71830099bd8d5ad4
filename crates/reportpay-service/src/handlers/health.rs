//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::config::StorageBackend;
use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Active storage mode: "external" or "memory".
    pub storage: &'static str,
}

/// `GET /health`. Does not probe the stores.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage = match state.config.storage_backend {
        StorageBackend::External => "external",
        StorageBackend::Memory => "memory",
    };

    Json(HealthResponse {
        status: "ok",
        service: "reportpay",
        version: env!("CARGO_PKG_VERSION"),
        storage,
    })
}
