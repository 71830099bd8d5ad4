//! reportpay Client SDK.
//!
//! This crate provides a typed client for the reportpay HTTP API.
//!
//! # Example
//!
//! ```no_run
//! use reportpay_client::{ClientError, ReportPayClient};
//!
//! # async fn example() -> Result<(), ClientError> {
//! let client = ReportPayClient::new("http://localhost:8080")?;
//!
//! // Generate a report anonymously, then claim it after registering
//! let created = client.create_mock_report("device-123").await?;
//! let token = client.register("alice", "password123").await?;
//! client.link_anonymous(&token, "device-123").await?;
//!
//! match client.purchase_report(&token, &created.report_id).await {
//!     Ok(purchase) => println!("New balance: {}", purchase.balance_formatted),
//!     Err(ClientError::InsufficientBalance { balance, required }) => {
//!         println!("Need {required} cents, have {balance}");
//!     }
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, ReportPayClient};
pub use error::ClientError;
pub use types::{
    ApiErrorBody, ApiErrorResponse, BalanceResponse, CreateReportResponse, Credentials,
    HealthResponse, LinkAnonymousResponse, PurchaseResponse, Report, ReportListResponse,
    TokenResponse,
};
