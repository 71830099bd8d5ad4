//! Storage layer for reportpay.
//!
//! Balances and reports live in two independent stores with no shared
//! transaction manager:
//!
//! - the **ledger** ([`Ledger`]) is relational and owns user balances,
//! - the **report store** ([`ReportStore`]) is a document store and owns report
//!   ownership and purchase state.
//!
//! Each store exposes one atomic conditional write that the purchase flow relies
//! on: [`Ledger::debit`] and [`ReportStore::mark_purchased`]. All concurrency
//! control is pushed down into those writes.
//!
//! # Backends
//!
//! - [`PgLedger`]: PostgreSQL via `sqlx`
//! - [`MongoReportStore`]: MongoDB
//! - [`MemoryLedger`] / [`MemoryReportStore`]: in-process, for tests and local runs
//!
//! # Example
//!
//! ```no_run
//! use reportpay_store::{Ledger, MemoryLedger};
//!
//! # async fn example() -> reportpay_store::Result<()> {
//! let ledger = MemoryLedger::new();
//! let user = ledger.create_user("alice", "$argon2id$...").await?;
//! let balance = ledger.debit(&user.id, 500).await?;
//! assert_eq!(balance, 9_500);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod mongo;
pub mod postgres;
pub mod schema;
mod timeout;

pub use error::{Result, StoreError};
pub use memory::{MemoryLedger, MemoryReportStore};
pub use mongo::MongoReportStore;
pub use postgres::PgLedger;
pub use timeout::DEFAULT_STORE_TIMEOUT;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reportpay_core::{Page, Report, ReportId, User, UserId};

/// A debit whose report could not be flagged as purchased.
///
/// Recorded by the purchase flow so an operator or an offline job can
/// reconcile the ledger with the report store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnflaggedDebit {
    /// The debited user.
    pub user_id: UserId,
    /// The report that stayed unpurchased.
    pub report_id: ReportId,
    /// Debited amount in cents.
    pub amount_cents: i64,
    /// Why the report could not be flagged.
    pub reason: String,
    /// When the record was written.
    pub created_at: DateTime<Utc>,
}

/// The relational balance store.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Create a user with the starting balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if the login is taken.
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn get_user(&self, user_id: &UserId) -> Result<User>;

    /// Get a user by login.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no user has this login.
    async fn get_user_by_login(&self, login: &str) -> Result<User>;

    /// Read the current balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    async fn get_balance(&self, user_id: &UserId) -> Result<i64>;

    /// Decrement the balance by `amount_cents` if and only if the balance covers it.
    ///
    /// The check and the decrement are a single conditional write in the store.
    /// Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientFundsOrNotFound` if no row satisfied the condition.
    /// - `StoreError::InvalidAmount` if `amount_cents` is not positive.
    async fn debit(&self, user_id: &UserId, amount_cents: i64) -> Result<i64>;

    /// Increment the balance by `amount_cents`. Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::InvalidAmount` if `amount_cents` is not positive.
    async fn credit(&self, user_id: &UserId, amount_cents: i64) -> Result<i64>;

    /// Append a reconciliation record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn record_unflagged_debit(&self, entry: &UnflaggedDebit) -> Result<()>;

    /// List reconciliation records for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn unflagged_debits(&self, user_id: &UserId) -> Result<Vec<UnflaggedDebit>>;
}

/// The document store holding reports.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert a new anonymous report for a client token.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn create_report(&self, client_generated_id: &str) -> Result<Report>;

    /// Get a report by its public identifier.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the report doesn't exist.
    async fn get_by_public_id(&self, report_id: &ReportId) -> Result<Report>;

    /// Flag the report as purchased if and only if it is currently unpurchased.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyPurchasedOrNotFound` if no document was modified.
    async fn mark_purchased(&self, report_id: &ReportId) -> Result<()>;

    /// Assign `user_id` as owner of every unowned report carrying the client token.
    ///
    /// Returns the number of reports updated; a repeated call returns 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn link_anonymous(&self, client_generated_id: &str, user_id: &UserId) -> Result<u64>;

    /// List a user's reports, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_by_owner(&self, user_id: &UserId, page: Page) -> Result<(Vec<Report>, u64)>;
}

/// Reject non-positive amounts before they reach a store.
pub(crate) fn ensure_positive(amount_cents: i64) -> Result<()> {
    if amount_cents <= 0 {
        return Err(StoreError::InvalidAmount(amount_cents));
    }
    Ok(())
}
