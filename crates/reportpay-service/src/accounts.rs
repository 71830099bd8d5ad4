//! Registration and login.

use std::sync::Arc;

use reportpay_core::{normalize_login, BillingError, Result, User, MIN_PASSWORD_LEN};
use reportpay_store::{Ledger, StoreError};

use crate::billing::classify;
use crate::password::{hash_password_blocking, verify_password_blocking};

/// Account operations backed by the ledger.
#[derive(Clone)]
pub struct Accounts {
    ledger: Arc<dyn Ledger>,
}

impl Accounts {
    /// Create the account service.
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    /// Register a new user with the starting balance.
    ///
    /// The login is trimmed before validation and storage.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the login or password fails validation.
    /// - `LoginTaken` if the login is registered.
    pub async fn register(&self, login: &str, password: &str) -> Result<User> {
        let login = normalize_login(login).ok_or_else(|| {
            BillingError::InvalidInput("login must be between 3 and 50 characters".into())
        })?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BillingError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let password_hash = hash_password_blocking(password.to_string()).await?;

        let user = match self.ledger.create_user(login, &password_hash).await {
            Ok(user) => user,
            Err(StoreError::Duplicate { .. }) => return Err(BillingError::LoginTaken),
            Err(e) => return Err(classify(e, "create_user", false)),
        };

        tracing::info!(user_id = %user.id, login = %user.login, "User registered");
        Ok(user)
    }

    /// Verify credentials and return the user.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown login or a wrong password;
    /// the two cases are indistinguishable.
    pub async fn login(&self, login: &str, password: &str) -> Result<User> {
        let Some(login) = normalize_login(login) else {
            return Err(BillingError::InvalidCredentials);
        };

        let user = match self.ledger.get_user_by_login(login).await {
            Ok(user) => user,
            Err(StoreError::NotFound { .. }) => return Err(BillingError::InvalidCredentials),
            Err(e) => return Err(classify(e, "get_user_by_login", true)),
        };

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await {
            tracing::debug!(user_id = %user.id, "Password verification failed");
            return Err(BillingError::InvalidCredentials);
        }

        tracing::debug!(user_id = %user.id, "User logged in");
        Ok(user)
    }
}
