//! In-process store implementations.
//!
//! Both stores hold their state behind a single `tokio::sync::Mutex`, so every
//! conditional write is checked and applied under one lock acquisition. They
//! back the test suites and the `memory` storage mode of the service.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use reportpay_core::{Page, Report, ReportId, User, UserId};

use crate::error::{Result, StoreError};
use crate::{ensure_positive, Ledger, ReportStore, UnflaggedDebit};

// ============================================================================
// Ledger
// ============================================================================

#[derive(Default)]
struct LedgerState {
    users: HashMap<UserId, User>,
    unflagged: Vec<UnflaggedDebit>,
}

impl LedgerState {
    fn user(&self, user_id: &UserId) -> Result<&User> {
        self.users.get(user_id).ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })
    }
}

/// In-memory ledger.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a user's balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    pub async fn set_balance(&self, user_id: &UserId, balance_cents: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        let user = state.users.get_mut(user_id).ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;
        user.balance_cents = balance_cents;
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User> {
        let mut state = self.state.lock().await;

        if state.users.values().any(|u| u.login == login) {
            return Err(StoreError::Duplicate {
                entity: "user",
                key: login.to_string(),
            });
        }

        let user = User::new(login, password_hash);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: &UserId) -> Result<User> {
        self.state.lock().await.user(user_id).cloned()
    }

    async fn get_user_by_login(&self, login: &str) -> Result<User> {
        self.state
            .lock()
            .await
            .users
            .values()
            .find(|u| u.login == login)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "user",
                id: login.to_string(),
            })
    }

    async fn get_balance(&self, user_id: &UserId) -> Result<i64> {
        Ok(self.state.lock().await.user(user_id)?.balance_cents)
    }

    async fn debit(&self, user_id: &UserId, amount_cents: i64) -> Result<i64> {
        ensure_positive(amount_cents)?;

        let mut state = self.state.lock().await;
        match state.users.get_mut(user_id) {
            Some(user) if user.balance_cents >= amount_cents => {
                user.balance_cents -= amount_cents;
                Ok(user.balance_cents)
            }
            _ => Err(StoreError::InsufficientFundsOrNotFound),
        }
    }

    async fn credit(&self, user_id: &UserId, amount_cents: i64) -> Result<i64> {
        ensure_positive(amount_cents)?;

        let mut state = self.state.lock().await;
        let user = state.users.get_mut(user_id).ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;
        user.balance_cents += amount_cents;
        Ok(user.balance_cents)
    }

    async fn record_unflagged_debit(&self, entry: &UnflaggedDebit) -> Result<()> {
        self.state.lock().await.unflagged.push(entry.clone());
        Ok(())
    }

    async fn unflagged_debits(&self, user_id: &UserId) -> Result<Vec<UnflaggedDebit>> {
        Ok(self
            .state
            .lock()
            .await
            .unflagged
            .iter()
            .filter(|e| e.user_id == *user_id)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Report store
// ============================================================================

#[derive(Default)]
struct ReportState {
    reports: Vec<Report>,
    last_key: u64,
}

impl ReportState {
    fn push(&mut self, report: Report) -> Result<()> {
        if let Some(existing) = self
            .reports
            .iter()
            .find(|r| r.id == report.id || r.report_id == report.report_id)
        {
            return Err(StoreError::Duplicate {
                entity: "report",
                key: if existing.id == report.id {
                    report.id
                } else {
                    report.report_id.to_string()
                },
            });
        }
        self.reports.push(report);
        Ok(())
    }
}

/// In-memory report store.
///
/// Store keys come from a counter starting at 1. Reports are kept in insertion
/// order; listings sort by `created_at` descending and fall back to reverse
/// insertion order on ties.
#[derive(Clone, Default)]
pub struct MemoryReportStore {
    state: Arc<Mutex<ReportState>>,
}

impl MemoryReportStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a report record as-is, keeping its store key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if a report with the same store key or
    /// public ID exists.
    pub async fn insert(&self, report: Report) -> Result<()> {
        self.state.lock().await.push(report)
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn create_report(&self, client_generated_id: &str) -> Result<Report> {
        let mut state = self.state.lock().await;
        state.last_key += 1;
        let report = Report::new_anonymous(state.last_key.to_string(), client_generated_id);
        state.push(report.clone())?;
        Ok(report)
    }

    async fn get_by_public_id(&self, report_id: &ReportId) -> Result<Report> {
        self.state
            .lock()
            .await
            .reports
            .iter()
            .find(|r| r.report_id == *report_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "report",
                id: report_id.to_string(),
            })
    }

    async fn mark_purchased(&self, report_id: &ReportId) -> Result<()> {
        let mut state = self.state.lock().await;
        match state
            .reports
            .iter_mut()
            .find(|r| r.report_id == *report_id && !r.is_purchased)
        {
            Some(report) => {
                report.is_purchased = true;
                Ok(())
            }
            None => Err(StoreError::AlreadyPurchasedOrNotFound),
        }
    }

    async fn link_anonymous(&self, client_generated_id: &str, user_id: &UserId) -> Result<u64> {
        let mut state = self.state.lock().await;
        let mut linked = 0;
        for report in state
            .reports
            .iter_mut()
            .filter(|r| r.is_anonymous() && r.client_generated_id == client_generated_id)
        {
            report.user_id = Some(*user_id);
            linked += 1;
        }
        Ok(linked)
    }

    async fn list_by_owner(&self, user_id: &UserId, page: Page) -> Result<(Vec<Report>, u64)> {
        let state = self.state.lock().await;

        let mut owned: Vec<&Report> = state
            .reports
            .iter()
            .rev()
            .filter(|r| r.is_owned_by(user_id))
            .collect();
        // Stable sort keeps newer insertions first among equal timestamps.
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = owned.len() as u64;
        let offset = usize::try_from(page.offset).unwrap_or(0);
        let limit = usize::try_from(page.limit).unwrap_or(0);
        let page = owned
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn create_user_rejects_duplicate_login() {
        let ledger = MemoryLedger::new();
        let user = ledger.create_user("alice", "hash").await.unwrap();
        assert_eq!(user.balance_cents, 10_000);

        let result = ledger.create_user("alice", "other").await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn debit_is_conditional() {
        let ledger = MemoryLedger::new();
        let user = ledger.create_user("alice", "hash").await.unwrap();
        ledger.set_balance(&user.id, 700).await.unwrap();

        assert_eq!(ledger.debit(&user.id, 500).await.unwrap(), 200);
        let result = ledger.debit(&user.id, 500).await;
        assert!(matches!(result, Err(StoreError::InsufficientFundsOrNotFound)));
        assert_eq!(ledger.get_balance(&user.id).await.unwrap(), 200);
    }

    #[tokio::test]
    async fn debit_unknown_user_is_indistinguishable_from_insufficient() {
        let ledger = MemoryLedger::new();
        let result = ledger.debit(&UserId::generate(), 500).await;
        assert!(matches!(result, Err(StoreError::InsufficientFundsOrNotFound)));
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let ledger = MemoryLedger::new();
        let user = ledger.create_user("alice", "hash").await.unwrap();

        assert!(matches!(
            ledger.debit(&user.id, 0).await,
            Err(StoreError::InvalidAmount(0))
        ));
        assert!(matches!(
            ledger.credit(&user.id, -5).await,
            Err(StoreError::InvalidAmount(-5))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_debits_never_overdraw() {
        let ledger = MemoryLedger::new();
        let user = ledger.create_user("alice", "hash").await.unwrap();

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let ledger = ledger.clone();
                let user_id = user.id;
                tokio::spawn(async move { ledger.debit(&user_id, 500).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 20);
        assert_eq!(ledger.get_balance(&user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn store_keys_come_from_a_counter() {
        let store = MemoryReportStore::new();
        let first = store.create_report("client-1").await.unwrap();
        let second = store.create_report("client-1").await.unwrap();

        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
        assert_ne!(first.report_id, second.report_id);
        assert_eq!(store.get_by_public_id(&second.report_id).await.unwrap().id, "2");

        let clash = Report::new_anonymous("2", "client-2");
        assert!(matches!(
            store.insert(clash).await,
            Err(StoreError::Duplicate { entity: "report", ref key }) if key == "2"
        ));
    }

    #[tokio::test]
    async fn mark_purchased_is_compare_and_set() {
        let store = MemoryReportStore::new();
        let report = store.create_report("client-1").await.unwrap();

        store.mark_purchased(&report.report_id).await.unwrap();
        assert!(matches!(
            store.mark_purchased(&report.report_id).await,
            Err(StoreError::AlreadyPurchasedOrNotFound)
        ));
        assert!(matches!(
            store.mark_purchased(&ReportId::generate()).await,
            Err(StoreError::AlreadyPurchasedOrNotFound)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_marks_have_one_winner() {
        let store = MemoryReportStore::new();
        let report = store.create_report("client-1").await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                let report_id = report.report_id.clone();
                tokio::spawn(async move { store.mark_purchased(&report_id).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn link_only_touches_unowned_matching_reports() {
        let store = MemoryReportStore::new();
        let alice = UserId::generate();
        let bob = UserId::generate();

        store.create_report("client-1").await.unwrap();
        store.create_report("client-1").await.unwrap();
        store.create_report("client-2").await.unwrap();
        let mut owned = Report::new_anonymous("seed-1", "client-1");
        owned.user_id = Some(bob);
        store.insert(owned.clone()).await.unwrap();

        assert_eq!(store.link_anonymous("client-1", &alice).await.unwrap(), 2);
        assert_eq!(store.link_anonymous("client-1", &alice).await.unwrap(), 0);

        let kept = store.get_by_public_id(&owned.report_id).await.unwrap();
        assert_eq!(kept.user_id, Some(bob));
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paginated() {
        let store = MemoryReportStore::new();
        let owner = UserId::generate();
        let base = Utc::now();

        let mut ids = Vec::new();
        for minutes in 0..5 {
            let mut report = Report::new_anonymous(format!("seed-{minutes}"), "client-1");
            report.user_id = Some(owner);
            report.created_at = base + Duration::minutes(minutes);
            ids.push(report.report_id.clone());
            store.insert(report).await.unwrap();
        }
        store.create_report("client-1").await.unwrap();

        let (first, total) = store.list_by_owner(&owner, Page::new(Some(2), None)).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].report_id, ids[4]);
        assert_eq!(first[1].report_id, ids[3]);

        let (last, _) = store
            .list_by_owner(&owner, Page::new(Some(2), Some(4)))
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].report_id, ids[0]);

        let (beyond, total) = store
            .list_by_owner(&owner, Page::new(Some(2), Some(10)))
            .await
            .unwrap();
        assert!(beyond.is_empty());
        assert_eq!(total, 5);
    }

    #[tokio::test]
    async fn equal_timestamps_list_newest_insertion_first() {
        let store = MemoryReportStore::new();
        let owner = UserId::generate();
        let at = Utc::now();

        let mut ids = Vec::new();
        for n in 0..3 {
            let mut report = Report::new_anonymous(format!("seed-{n}"), "client-1");
            report.user_id = Some(owner);
            report.created_at = at;
            ids.push(report.report_id.clone());
            store.insert(report).await.unwrap();
        }

        let (reports, _) = store.list_by_owner(&owner, Page::default()).await.unwrap();
        let listed: Vec<_> = reports.into_iter().map(|r| r.report_id).collect();
        assert_eq!(listed, vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]);
    }
}
