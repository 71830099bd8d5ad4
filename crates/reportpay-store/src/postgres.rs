//! PostgreSQL ledger implementation.
//!
//! This module provides the `PgLedger` implementation of the `Ledger` trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use reportpay_core::{ReportId, User, UserId, STARTING_BALANCE_CENTS};

use crate::error::{Result, StoreError};
use crate::timeout::bounded;
use crate::{ensure_positive, Ledger, UnflaggedDebit};

/// Row shape of the `users` table.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    login: String,
    password_hash: String,
    balance_cents: i64,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: UserId::from_uuid(row.id),
            login: row.login,
            password_hash: row.password_hash,
            balance_cents: row.balance_cents,
            created_at: row.created_at,
        }
    }
}

/// Row shape of the `unflagged_debits` table.
#[derive(sqlx::FromRow)]
struct UnflaggedDebitRow {
    user_id: Uuid,
    report_id: String,
    amount_cents: i64,
    reason: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UnflaggedDebitRow> for UnflaggedDebit {
    type Error = StoreError;

    fn try_from(row: UnflaggedDebitRow) -> Result<Self> {
        let report_id: ReportId = row
            .report_id
            .parse()
            .map_err(|e| StoreError::Serialization(format!("report_id: {e}")))?;

        Ok(Self {
            user_id: UserId::from_uuid(row.user_id),
            report_id,
            amount_cents: row.amount_cents,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL-backed ledger.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
    call_timeout: Duration,
}

impl PgLedger {
    /// Wrap an existing pool.
    #[must_use]
    pub fn new(pool: PgPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }

    /// Connect a new pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        call_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(call_timeout)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "PostgreSQL pool connected");

        Ok(Self::new(pool, call_timeout))
    }

    /// Apply the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("PostgreSQL migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<User> {
        let insert = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (id, login, password_hash, balance_cents)
            VALUES ($1, $2, $3, $4)
            RETURNING id, login, password_hash, balance_cents, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(login)
        .bind(password_hash)
        .bind(STARTING_BALANCE_CENTS)
        .fetch_one(&self.pool);

        match tokio::time::timeout(self.call_timeout, insert).await {
            Ok(Ok(row)) => Ok(row.into()),
            Ok(Err(sqlx::Error::Database(db))) if db.is_unique_violation() => {
                Err(StoreError::Duplicate {
                    entity: "user",
                    key: login.to_string(),
                })
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(StoreError::Timeout {
                operation: "create_user",
            }),
        }
    }

    async fn get_user(&self, user_id: &UserId) -> Result<User> {
        let row = bounded(
            "get_user",
            self.call_timeout,
            sqlx::query_as::<_, UserRow>(
                "SELECT id, login, password_hash, balance_cents, created_at FROM users WHERE id = $1",
            )
            .bind(*user_id.as_uuid())
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(User::from).ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })
    }

    async fn get_user_by_login(&self, login: &str) -> Result<User> {
        let row = bounded(
            "get_user_by_login",
            self.call_timeout,
            sqlx::query_as::<_, UserRow>(
                "SELECT id, login, password_hash, balance_cents, created_at FROM users WHERE login = $1",
            )
            .bind(login)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(User::from).ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: login.to_string(),
        })
    }

    async fn get_balance(&self, user_id: &UserId) -> Result<i64> {
        bounded(
            "get_balance",
            self.call_timeout,
            sqlx::query_scalar::<_, i64>("SELECT balance_cents FROM users WHERE id = $1")
                .bind(*user_id.as_uuid())
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })
    }

    async fn debit(&self, user_id: &UserId, amount_cents: i64) -> Result<i64> {
        ensure_positive(amount_cents)?;

        // The WHERE clause is the guard: the row is only touched if it covers the amount.
        let new_balance = bounded(
            "debit",
            self.call_timeout,
            sqlx::query_scalar::<_, i64>(
                r"
                UPDATE users
                SET balance_cents = balance_cents - $2
                WHERE id = $1 AND balance_cents >= $2
                RETURNING balance_cents
                ",
            )
            .bind(*user_id.as_uuid())
            .bind(amount_cents)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(StoreError::InsufficientFundsOrNotFound)?;

        tracing::debug!(user_id = %user_id, amount_cents, new_balance, "Balance debited");

        Ok(new_balance)
    }

    async fn credit(&self, user_id: &UserId, amount_cents: i64) -> Result<i64> {
        ensure_positive(amount_cents)?;

        let new_balance = bounded(
            "credit",
            self.call_timeout,
            sqlx::query_scalar::<_, i64>(
                r"
                UPDATE users
                SET balance_cents = balance_cents + $2
                WHERE id = $1
                RETURNING balance_cents
                ",
            )
            .bind(*user_id.as_uuid())
            .bind(amount_cents)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or_else(|| StoreError::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;

        tracing::debug!(user_id = %user_id, amount_cents, new_balance, "Balance credited");

        Ok(new_balance)
    }

    async fn record_unflagged_debit(&self, entry: &UnflaggedDebit) -> Result<()> {
        bounded(
            "record_unflagged_debit",
            self.call_timeout,
            sqlx::query(
                r"
                INSERT INTO unflagged_debits (user_id, report_id, amount_cents, reason, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(*entry.user_id.as_uuid())
            .bind(entry.report_id.as_str())
            .bind(entry.amount_cents)
            .bind(entry.reason.as_str())
            .bind(entry.created_at)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    async fn unflagged_debits(&self, user_id: &UserId) -> Result<Vec<UnflaggedDebit>> {
        let rows = bounded(
            "unflagged_debits",
            self.call_timeout,
            sqlx::query_as::<_, UnflaggedDebitRow>(
                r"
                SELECT user_id, report_id, amount_cents, reason, created_at
                FROM unflagged_debits
                WHERE user_id = $1
                ORDER BY id
                ",
            )
            .bind(*user_id.as_uuid())
            .fetch_all(&self.pool),
        )
        .await?;

        rows.into_iter().map(UnflaggedDebit::try_from).collect()
    }
}
