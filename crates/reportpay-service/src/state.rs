//! Application state.

use std::sync::Arc;

use reportpay_store::{Ledger, ReportStore};

use crate::accounts::Accounts;
use crate::auth::TokenKeys;
use crate::billing::Billing;
use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Purchase, linking and listing.
    pub billing: Billing,

    /// Registration and login.
    pub accounts: Accounts,

    /// Access token keys.
    pub tokens: TokenKeys,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state over the given stores.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn Ledger>,
        reports: Arc<dyn ReportStore>,
        config: ServiceConfig,
    ) -> Self {
        let billing = Billing::new(ledger.clone(), reports, config.report_price_cents);
        let accounts = Accounts::new(ledger);
        let tokens = TokenKeys::new(&config.jwt_secret, config.jwt_ttl_seconds);

        if !config.enable_mock_routes {
            tracing::info!("Mock routes disabled");
        }

        Self {
            billing,
            accounts,
            tokens,
            config,
        }
    }
}
