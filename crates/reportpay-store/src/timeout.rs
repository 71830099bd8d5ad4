//! Per-call deadlines for store operations.

use std::future::IntoFuture;
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Default deadline for a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a store call under a deadline.
///
/// A call that does not finish in time fails with [`StoreError::Timeout`]. The
/// underlying request may still complete on the server; callers must treat a
/// timed-out write as having an unknown outcome.
pub(crate) async fn bounded<T, E, F>(operation: &'static str, limit: Duration, call: F) -> Result<T>
where
    F: IntoFuture<Output = std::result::Result<T, E>>,
    E: Into<StoreError>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                "Store call timed out"
            );
            Err(StoreError::Timeout { operation })
        }
    }
}
