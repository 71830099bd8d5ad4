//! User account types for reportpay.
//!
//! A user owns a prepaid balance in cents that is spent on report purchases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

// ============================================================================
// Constants
// ============================================================================

/// Balance granted to every new account, in cents ($100).
pub const STARTING_BALANCE_CENTS: i64 = 10_000;

/// Minimum login length after trimming.
pub const MIN_LOGIN_LEN: usize = 3;

/// Maximum login length after trimming.
pub const MAX_LOGIN_LEN: usize = 50;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The user ID.
    pub id: UserId,

    /// Unique login name.
    pub login: String,

    /// Argon2 password hash (PHC string). Never sent to clients.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Current balance in cents. Never negative.
    pub balance_cents: i64,

    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with the starting balance.
    #[must_use]
    pub fn new(login: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: UserId::generate(),
            login: login.into(),
            password_hash: password_hash.into(),
            balance_cents: STARTING_BALANCE_CENTS,
            created_at: Utc::now(),
        }
    }
}

/// Normalize and validate a login name.
///
/// Returns the trimmed login, or `None` if its length is outside
/// [`MIN_LOGIN_LEN`]..=[`MAX_LOGIN_LEN`].
#[must_use]
pub fn normalize_login(login: &str) -> Option<&str> {
    let trimmed = login.trim();
    let len = trimmed.chars().count();
    (MIN_LOGIN_LEN..=MAX_LOGIN_LEN)
        .contains(&len)
        .then_some(trimmed)
}

/// Format a cent amount as dollars, e.g. `$95.00`.
#[must_use]
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
