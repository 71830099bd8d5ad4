//! Report purchase orchestration.
//!
//! A purchase touches two stores that share no transaction manager: the
//! relational ledger holds the balance and the document store holds the
//! report's purchase flag. [`Billing::purchase_report`] runs a fixed sequence
//! of reads and two conditional writes:
//!
//! 1. Read the report. Missing, or owned by someone else: `ReportNotFound`.
//! 2. Already purchased: `AlreadyPurchased`. The ledger is not touched.
//! 3. Read the balance. Below the price: `InsufficientBalance`.
//! 4. Conditionally debit the balance.
//! 5. Conditionally flag the report as purchased.
//!
//! Steps 4 and 5 are not atomic together. If step 5 reports that the flag was
//! already set, a concurrent purchase won and the debit is refunded. Any other
//! failure in step 5 leaves the user debited for an unflagged report; that is
//! surfaced as `PostDebitMarkFailed`, logged at error level and recorded in the
//! ledger's unflagged-debit table for reconciliation.
//!
//! # Cancellation
//!
//! The caller passes a [`CancellationToken`]. It is checked before every store
//! call up to and including the debit. Once the debit has been issued, step 5
//! always runs.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use reportpay_core::{BillingError, Page, Report, ReportId, Result, UserId};
use reportpay_store::{Ledger, ReportStore, StoreError, UnflaggedDebit};

/// A completed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    /// The purchased report.
    pub report_id: ReportId,
    /// Balance after the debit, in cents.
    pub balance_cents: i64,
}

/// One page of a user's reports.
#[derive(Debug, Clone)]
pub struct ReportPage {
    /// Reports, newest first.
    pub reports: Vec<Report>,
    /// Total number of reports the user owns.
    pub total: u64,
    /// The effective limit and offset after clamping.
    pub page: Page,
}

/// Coordinates the ledger and the report store.
#[derive(Clone)]
pub struct Billing {
    ledger: Arc<dyn Ledger>,
    reports: Arc<dyn ReportStore>,
    price_cents: i64,
}

impl Billing {
    /// Create an orchestrator charging `price_cents` per report.
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>, reports: Arc<dyn ReportStore>, price_cents: i64) -> Self {
        Self {
            ledger,
            reports,
            price_cents,
        }
    }

    // ========================================================================
    // Purchase
    // ========================================================================

    /// Purchase a report on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// - `ReportNotFound` if the report is missing or not owned by the user.
    /// - `AlreadyPurchased` if the report is purchased, including when a
    ///   concurrent purchase wins after this request's debit (the debit is refunded).
    /// - `UserNotFound` if the user has no ledger row.
    /// - `InsufficientBalance` if the balance does not cover the price.
    /// - `PostDebitMarkFailed` if the balance was debited but the report could not be flagged.
    /// - `Transient` if a store call timed out or the store was unreachable.
    /// - `Cancelled` if the token fired before the debit was issued.
    pub async fn purchase_report(
        &self,
        user_id: UserId,
        report_id: &ReportId,
        cancel: &CancellationToken,
    ) -> Result<Purchase> {
        ensure_live(cancel, "get_report")?;
        let report = match self.reports.get_by_public_id(report_id).await {
            Ok(report) => report,
            Err(StoreError::NotFound { .. }) => {
                return Err(BillingError::ReportNotFound {
                    report_id: report_id.clone(),
                })
            }
            Err(e) => return Err(classify(e, "get_report", true)),
        };

        if !report.is_owned_by(&user_id) {
            tracing::debug!(
                user_id = %user_id,
                report_id = %report_id,
                "Purchase attempted on a report the user does not own"
            );
            return Err(BillingError::ReportNotFound {
                report_id: report_id.clone(),
            });
        }

        if report.is_purchased {
            return Err(BillingError::AlreadyPurchased {
                report_id: report_id.clone(),
            });
        }

        ensure_live(cancel, "get_balance")?;
        let balance = match self.ledger.get_balance(&user_id).await {
            Ok(balance) => balance,
            Err(StoreError::NotFound { .. }) => return Err(BillingError::UserNotFound { user_id }),
            Err(e) => return Err(classify(e, "get_balance", true)),
        };

        if balance < self.price_cents {
            return Err(BillingError::InsufficientBalance {
                balance,
                required: self.price_cents,
            });
        }

        ensure_live(cancel, "debit")?;
        let balance_cents = match self.ledger.debit(&user_id, self.price_cents).await {
            Ok(new_balance) => new_balance,
            Err(StoreError::InsufficientFundsOrNotFound) => {
                return Err(self.explain_rejected_debit(user_id).await)
            }
            // The debit may have been applied; the outcome is unknown.
            Err(e) => return Err(classify(e, "debit", false)),
        };

        tracing::debug!(
            user_id = %user_id,
            report_id = %report_id,
            amount_cents = self.price_cents,
            balance_cents,
            "Balance debited for report"
        );

        match self.reports.mark_purchased(report_id).await {
            Ok(()) => {
                tracing::info!(
                    user_id = %user_id,
                    report_id = %report_id,
                    amount_cents = self.price_cents,
                    balance_cents,
                    "Report purchased"
                );
                Ok(Purchase {
                    report_id: report_id.clone(),
                    balance_cents,
                })
            }
            Err(StoreError::AlreadyPurchasedOrNotFound) => {
                Err(self.refund_lost_race(user_id, report_id).await)
            }
            Err(e) => Err(self.record_unflagged(user_id, report_id, e.to_string()).await),
        }
    }

    /// Tell a missing user apart from a short balance after the ledger rejected a debit.
    async fn explain_rejected_debit(&self, user_id: UserId) -> BillingError {
        match self.ledger.get_balance(&user_id).await {
            Ok(balance) => BillingError::InsufficientBalance {
                balance,
                required: self.price_cents,
            },
            Err(StoreError::NotFound { .. }) => BillingError::UserNotFound { user_id },
            // Nothing was debited, so the whole purchase can be retried.
            Err(e) => classify(e, "get_balance", true),
        }
    }

    /// Undo this request's debit after another purchase flagged the report first.
    async fn refund_lost_race(&self, user_id: UserId, report_id: &ReportId) -> BillingError {
        tracing::warn!(
            user_id = %user_id,
            report_id = %report_id,
            amount_cents = self.price_cents,
            "Report flagged by a concurrent purchase after debit, refunding"
        );

        match self.ledger.credit(&user_id, self.price_cents).await {
            Ok(balance_cents) => {
                tracing::info!(
                    user_id = %user_id,
                    report_id = %report_id,
                    balance_cents,
                    "Debit refunded"
                );
                BillingError::AlreadyPurchased {
                    report_id: report_id.clone(),
                }
            }
            Err(e) => {
                self.record_unflagged(user_id, report_id, format!("refund failed: {e}"))
                    .await
            }
        }
    }

    /// Surface a debit whose report stayed unflagged.
    async fn record_unflagged(
        &self,
        user_id: UserId,
        report_id: &ReportId,
        reason: String,
    ) -> BillingError {
        tracing::error!(
            user_id = %user_id,
            report_id = %report_id,
            amount_cents = self.price_cents,
            reason = %reason,
            reconciliation_required = true,
            "Balance debited but report not flagged as purchased"
        );

        let entry = UnflaggedDebit {
            user_id,
            report_id: report_id.clone(),
            amount_cents: self.price_cents,
            reason,
            created_at: Utc::now(),
        };
        if let Err(e) = self.ledger.record_unflagged_debit(&entry).await {
            tracing::error!(
                user_id = %user_id,
                report_id = %report_id,
                error = %e,
                "Failed to record unflagged debit"
            );
        }

        BillingError::PostDebitMarkFailed {
            user_id,
            report_id: report_id.clone(),
            amount_cents: self.price_cents,
        }
    }

    // ========================================================================
    // Reports
    // ========================================================================

    /// Create an anonymous report for a client token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank token, or `Transient`/`Storage` on store failure.
    pub async fn create_report(&self, client_generated_id: &str) -> Result<Report> {
        let client_generated_id = non_blank_token(client_generated_id)?;

        let report = self
            .reports
            .create_report(client_generated_id)
            .await
            .map_err(|e| classify(e, "create_report", false))?;

        tracing::info!(
            report_id = %report.report_id,
            client_generated_id = %report.client_generated_id,
            "Anonymous report created"
        );
        Ok(report)
    }

    /// Attach every unowned report carrying `client_generated_id` to `user_id`.
    ///
    /// Returns the number of reports linked. Linking is idempotent: a repeated
    /// call returns 0.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for a blank token.
    /// - `UserNotFound` if the user has no ledger row.
    /// - `Transient` if a store call timed out or the store was unreachable.
    pub async fn link_anonymous_reports(
        &self,
        user_id: UserId,
        client_generated_id: &str,
    ) -> Result<u64> {
        let client_generated_id = non_blank_token(client_generated_id)?;
        self.ensure_user(user_id).await?;

        // Safe to retry: the filter only matches reports that are still unowned.
        let linked = self
            .reports
            .link_anonymous(client_generated_id, &user_id)
            .await
            .map_err(|e| classify(e, "link_anonymous", true))?;

        tracing::info!(
            user_id = %user_id,
            client_generated_id,
            linked,
            "Anonymous reports linked"
        );
        Ok(linked)
    }

    /// List a user's reports, newest first.
    ///
    /// A `limit` outside `1..=100` becomes 20 and a negative `offset` becomes 0.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user has no ledger row, or `Transient` on
    /// store failure.
    pub async fn list_user_reports(
        &self,
        user_id: UserId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<ReportPage> {
        self.ensure_user(user_id).await?;

        let page = Page::new(limit, offset);
        let (reports, total) = self
            .reports
            .list_by_owner(&user_id, page)
            .await
            .map_err(|e| classify(e, "list_reports", true))?;

        Ok(ReportPage {
            reports,
            total,
            page,
        })
    }

    /// Read a user's balance in cents.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user has no ledger row, or `Transient` on
    /// store failure.
    pub async fn balance(&self, user_id: UserId) -> Result<i64> {
        match self.ledger.get_balance(&user_id).await {
            Ok(balance) => Ok(balance),
            Err(StoreError::NotFound { .. }) => Err(BillingError::UserNotFound { user_id }),
            Err(e) => Err(classify(e, "get_balance", true)),
        }
    }

    async fn ensure_user(&self, user_id: UserId) -> Result<()> {
        match self.ledger.get_user(&user_id).await {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(BillingError::UserNotFound { user_id }),
            Err(e) => Err(classify(e, "get_user", true)),
        }
    }
}

fn ensure_live(cancel: &CancellationToken, next: &'static str) -> Result<()> {
    if cancel.is_cancelled() {
        tracing::debug!(next_operation = next, "Purchase cancelled before debit");
        return Err(BillingError::Cancelled);
    }
    Ok(())
}

fn non_blank_token(client_generated_id: &str) -> Result<&str> {
    let trimmed = client_generated_id.trim();
    if trimmed.is_empty() {
        return Err(BillingError::InvalidInput(
            "client_generated_id is required".into(),
        ));
    }
    Ok(trimmed)
}

/// Map a store failure onto the caller-facing taxonomy.
///
/// `retryable` must be false once a mutating call with an unknown outcome has
/// been issued for the request.
pub(crate) fn classify(err: StoreError, operation: &'static str, retryable: bool) -> BillingError {
    if !err.is_transient() {
        return BillingError::Storage(err.to_string());
    }

    tracing::warn!(operation, error = %err, "Store call failed");
    BillingError::Transient {
        operation,
        retryable,
    }
}
