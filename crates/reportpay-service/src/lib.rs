//! reportpay HTTP API service.
//!
//! This crate provides the HTTP API for reportpay:
//!
//! - Registration and login with HS256 bearer tokens
//! - Anonymous report creation and linking to an account
//! - Report listing and balance lookup
//! - Report purchase across the balance ledger and the report store
//!
//! The purchase flow lives in [`billing`]; handlers only translate HTTP to
//! calls on [`Billing`] and errors to [`ApiError`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Axum handlers are async even when nothing awaits

pub mod accounts;
pub mod auth;
pub mod billing;
pub mod config;
pub mod error;
pub mod handlers;
pub mod password;
pub mod routes;
pub mod state;

pub use accounts::Accounts;
pub use billing::{Billing, Purchase, ReportPage};
pub use config::{ServiceConfig, StorageBackend};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
