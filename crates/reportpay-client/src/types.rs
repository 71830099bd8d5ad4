//! Request and response types for the reportpay API.

use serde::{Deserialize, Serialize};

pub use reportpay_core::Report;

/// Login and password, used for both register and login.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// Login name (3-50 characters after trimming).
    pub login: String,
    /// Password (at least 6 characters).
    pub password: String,
}

/// Issued access token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for protected routes.
    pub access_token: String,
}

/// Body carrying a client-generated token.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ClientTokenRequest<'a> {
    pub client_generated_id: &'a str,
}

/// Created report.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReportResponse {
    /// Status message.
    pub message: String,
    /// Public report ID.
    pub report_id: String,
    /// The stored report.
    pub report: Report,
}

/// Result of linking anonymous reports.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkAnonymousResponse {
    /// Status message.
    pub message: String,
    /// Number of reports newly linked.
    pub reports_linked: u64,
}

/// One page of the user's reports.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportListResponse {
    /// Reports, newest first.
    pub reports: Vec<Report>,
    /// Total reports owned by the user.
    pub total: u64,
    /// Effective page size.
    pub limit: i64,
    /// Effective offset.
    pub offset: i64,
}

/// Balance response.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// Balance in cents.
    pub balance_cents: i64,
    /// Balance formatted as dollars.
    pub balance_formatted: String,
}

/// Purchase result.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseResponse {
    /// Status message.
    pub message: String,
    /// Balance after the purchase in cents.
    pub balance_cents: i64,
    /// Balance formatted as dollars.
    pub balance_formatted: String,
}

/// Health response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// API error response format.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
