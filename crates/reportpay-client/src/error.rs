//! Client error types.

/// Errors that can occur when using the reportpay client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response without a more specific mapping.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// The report does not exist or belongs to another user.
    #[error("report not found")]
    ReportNotFound,

    /// The report has already been purchased.
    #[error("report already purchased")]
    AlreadyPurchased,

    /// Balance lower than the report price.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance in cents.
        balance: i64,
        /// Required amount in cents.
        required: i64,
    },

    /// Missing, invalid or expired token, or wrong credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// A storage backend was unavailable.
    #[error("service unavailable (retryable: {retryable})")]
    Unavailable {
        /// Whether the request can be retried as-is.
        retryable: bool,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Whether retrying the same request is safe.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { retryable: true })
    }
}
