//! Handlers for the authenticated user's reports and balance.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use reportpay_core::{format_cents, Report};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Request to claim anonymous reports.
#[derive(Debug, Deserialize)]
pub struct LinkAnonymousRequest {
    /// Token the client used while anonymous.
    pub client_generated_id: String,
}

/// Link result.
#[derive(Debug, Serialize)]
pub struct LinkAnonymousResponse {
    /// Human-readable status.
    pub message: &'static str,
    /// Number of reports newly attached to the account.
    pub reports_linked: u64,
}

/// `POST /api/user/link-anonymous`.
pub async fn link_anonymous(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<LinkAnonymousRequest>,
) -> Result<Json<LinkAnonymousResponse>, ApiError> {
    let reports_linked = state
        .billing
        .link_anonymous_reports(auth.user_id, &body.client_generated_id)
        .await?;

    Ok(Json(LinkAnonymousResponse {
        message: "Anonymous reports linked successfully",
        reports_linked,
    }))
}

/// Report list query parameters.
///
/// Values that don't parse as integers fall back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ListReportsQuery {
    /// Page size (default: 20, max: 100).
    pub limit: Option<String>,
    /// Items to skip (default: 0).
    pub offset: Option<String>,
}

/// One page of the user's reports.
#[derive(Debug, Serialize)]
pub struct ListReportsResponse {
    /// Reports, newest first.
    pub reports: Vec<Report>,
    /// Total reports owned by the user.
    pub total: u64,
    /// Effective page size.
    pub limit: i64,
    /// Effective offset.
    pub offset: i64,
}

/// `GET /api/user/reports`.
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<ListReportsResponse>, ApiError> {
    let limit = query.limit.and_then(|s| s.trim().parse().ok());
    let offset = query.offset.and_then(|s| s.trim().parse().ok());

    let page = state
        .billing
        .list_user_reports(auth.user_id, limit, offset)
        .await?;

    Ok(Json(ListReportsResponse {
        reports: page.reports,
        total: page.total,
        limit: page.page.limit,
        offset: page.page.offset,
    }))
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Balance in cents.
    pub balance_cents: i64,
    /// Balance formatted as dollars.
    pub balance_formatted: String,
}

/// `GET /api/user/balance`.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance_cents = state.billing.balance(auth.user_id).await?;

    Ok(Json(BalanceResponse {
        balance_cents,
        balance_formatted: format_cents(balance_cents),
    }))
}
