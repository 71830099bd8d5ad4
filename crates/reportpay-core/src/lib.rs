//! Core types and utilities for reportpay.
//!
//! This crate provides the foundational types used throughout the reportpay platform:
//!
//! - **Identifiers**: `UserId`, `ReportId`
//! - **Users**: `User`, starting balance and login rules
//! - **Reports**: `Report`, report price
//! - **Pagination**: `Page`
//! - **Errors**: `BillingError`, the caller-facing error taxonomy
//!
//! # Money
//!
//! All amounts are `i64` cents. A new account starts with 10000 cents ($100) and a
//! report costs 500 cents ($5).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod page;
pub mod report;
pub mod user;

pub use error::{BillingError, Result};
pub use ids::{IdError, ReportId, UserId};
pub use page::{Page, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use report::{Report, REPORT_PRICE_CENTS};
pub use user::{
    format_cents, normalize_login, User, MAX_LOGIN_LEN, MIN_LOGIN_LEN, MIN_PASSWORD_LEN,
    STARTING_BALANCE_CENTS,
};
