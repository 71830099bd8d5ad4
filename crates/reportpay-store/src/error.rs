//! Error types for reportpay storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored record could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The key that was looked up.
        id: String,
    },

    /// A uniqueness constraint rejected the write.
    #[error("{entity} already exists: {key}")]
    Duplicate {
        /// Kind of record.
        entity: &'static str,
        /// The conflicting key.
        key: String,
    },

    /// The conditional debit matched no row.
    ///
    /// Either the balance is below the amount or the user does not exist.
    #[error("insufficient funds or user not found")]
    InsufficientFundsOrNotFound,

    /// The conditional purchase flag matched no document.
    ///
    /// Either the report is already purchased or it does not exist.
    #[error("report already purchased or not found")]
    AlreadyPurchasedOrNotFound,

    /// Amount must be strictly positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// The store did not answer within the per-call deadline.
    #[error("store call timed out: {operation}")]
    Timeout {
        /// The store operation that timed out.
        operation: &'static str,
    },
}

impl StoreError {
    /// Whether the failure is an infrastructure problem rather than a
    /// statement about stored state.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Database(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Serialization(err.to_string())
            }
            other => Self::Database(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(format!("migration failed: {err}"))
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match *err.kind {
            mongodb::error::ErrorKind::BsonDeserialization(_)
            | mongodb::error::ErrorKind::BsonSerialization(_) => {
                Self::Serialization(err.to_string())
            }
            _ => Self::Database(err.to_string()),
        }
    }
}
