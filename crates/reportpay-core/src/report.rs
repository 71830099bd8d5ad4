//! Report types for reportpay.
//!
//! Reports are generated anonymously, claimed by a user through the client
//! correlation token, and purchased at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ReportId, UserId};

/// Price of one report in cents ($5).
pub const REPORT_PRICE_CENTS: i64 = 500;

/// A generated report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Store-assigned primary key.
    pub id: String,

    /// Public identifier.
    pub report_id: ReportId,

    /// The owning user. `None` while the report is anonymous.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,

    /// Client-supplied token used to claim the report after login.
    pub client_generated_id: String,

    /// Whether the report has been paid for.
    pub is_purchased: bool,

    /// When the report was generated.
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Create a new anonymous, unpurchased report under the store key `id`.
    #[must_use]
    pub fn new_anonymous(id: impl Into<String>, client_generated_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            report_id: ReportId::generate(),
            user_id: None,
            client_generated_id: client_generated_id.into(),
            is_purchased: false,
            created_at: Utc::now(),
        }
    }

    /// Check whether the report belongs to the given user.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.user_id.as_ref() == Some(user_id)
    }

    /// Check whether the report has not been claimed yet.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}
