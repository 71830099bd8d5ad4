//! Error types for reportpay.
//!
//! [`BillingError`] is the caller-facing taxonomy. Storage-level failures are
//! mapped onto it by the service layer; raw storage messages only travel in the
//! `Storage` variant, which is never rendered to untrusted callers.

use crate::ids::IdError;
use crate::{ReportId, UserId};

/// Result type for reportpay operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in reportpay operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// The report does not exist or is not owned by the caller.
    #[error("report not found: {report_id}")]
    ReportNotFound {
        /// The requested report.
        report_id: ReportId,
    },

    /// The user does not exist.
    #[error("user not found: {user_id}")]
    UserNotFound {
        /// The requested user.
        user_id: UserId,
    },

    /// The report has already been purchased.
    #[error("report already purchased: {report_id}")]
    AlreadyPurchased {
        /// The requested report.
        report_id: ReportId,
    },

    /// Balance is lower than the report price.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Balance observed in cents.
        balance: i64,
        /// Required amount in cents.
        required: i64,
    },

    /// The balance was debited but the report could not be flagged as purchased.
    ///
    /// The two stores disagree until an operator reconciles them.
    #[error(
        "report {report_id} not flagged after debiting {amount_cents} cents from {user_id}"
    )]
    PostDebitMarkFailed {
        /// The debited user.
        user_id: UserId,
        /// The report that stayed unflagged.
        report_id: ReportId,
        /// The debited amount in cents.
        amount_cents: i64,
    },

    /// A store call timed out or the store was unreachable.
    #[error("store unavailable during {operation}")]
    Transient {
        /// The store operation that failed.
        operation: &'static str,
        /// False once a mutating call has been issued for this request.
        retryable: bool,
    },

    /// The request was cancelled before the balance was touched.
    #[error("request cancelled")]
    Cancelled,

    /// The login is already registered.
    #[error("login already taken")]
    LoginTaken,

    /// Unknown login or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Caller input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Non-transient storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl BillingError {
    /// Whether the caller may safely retry the whole operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { retryable: true, .. } | Self::Cancelled)
    }
}
