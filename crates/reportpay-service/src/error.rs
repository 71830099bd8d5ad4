//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use reportpay_core::BillingError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The report is missing or belongs to someone else.
    #[error("report not found")]
    ReportNotFound,

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The report has already been purchased.
    #[error("report already purchased")]
    AlreadyPurchased,

    /// Balance lower than the price.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// A store is unreachable or timed out.
    #[error("store unavailable")]
    StoreUnavailable {
        /// Whether the request can be retried as-is.
        retryable: bool,
    },

    /// The balance was debited but the report stayed unflagged.
    ///
    /// Logged and recorded where it happens; rendered as a plain internal error.
    #[error("purchase requires reconciliation")]
    ReconciliationRequired,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::ReportNotFound => (
                StatusCode::NOT_FOUND,
                "report_not_found",
                self.to_string(),
                None,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::AlreadyPurchased => (
                StatusCode::CONFLICT,
                "already_purchased",
                self.to_string(),
                None,
            ),
            Self::InsufficientBalance { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_balance",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::StoreUnavailable { retryable } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "store_unavailable",
                "A storage backend is temporarily unavailable".to_string(),
                Some(serde_json::json!({ "retryable": retryable })),
            ),
            Self::ReconciliationRequired => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::ReportNotFound { .. } => Self::ReportNotFound,
            BillingError::UserNotFound { .. } => Self::NotFound("User not found".into()),
            BillingError::AlreadyPurchased { .. } => Self::AlreadyPurchased,
            BillingError::InsufficientBalance { balance, required } => {
                Self::InsufficientBalance { balance, required }
            }
            BillingError::PostDebitMarkFailed { .. } => Self::ReconciliationRequired,
            BillingError::Transient {
                operation,
                retryable,
            } => {
                tracing::warn!(operation, retryable, "Store unavailable");
                Self::StoreUnavailable { retryable }
            }
            BillingError::Cancelled => Self::StoreUnavailable { retryable: true },
            BillingError::LoginTaken => Self::Conflict("Login already taken".into()),
            BillingError::InvalidCredentials => Self::Unauthorized,
            BillingError::InvalidInput(msg) => Self::BadRequest(msg),
            BillingError::InvalidId(e) => Self::BadRequest(e.to_string()),
            BillingError::Storage(msg) => Self::Internal(msg),
        }
    }
}
