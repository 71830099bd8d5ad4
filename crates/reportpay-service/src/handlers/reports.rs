//! Report creation and purchase handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use reportpay_core::{format_cents, BillingError, Report, ReportId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Request to create an anonymous report.
#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    /// Opaque token the anonymous client generated for itself.
    pub client_generated_id: String,
}

/// Created report.
#[derive(Debug, Serialize)]
pub struct CreateReportResponse {
    /// Human-readable status.
    pub message: &'static str,
    /// Public report ID.
    pub report_id: ReportId,
    /// The stored report.
    pub report: Report,
}

/// `POST /api/mock/create-report`.
///
/// Stands in for real report generation.
pub async fn create_mock_report(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<CreateReportResponse>), ApiError> {
    let report = state.billing.create_report(&body.client_generated_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateReportResponse {
            message: "Report created successfully",
            report_id: report.report_id.clone(),
            report,
        }),
    ))
}

/// Purchase result.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// Human-readable status.
    pub message: &'static str,
    /// Balance after the purchase, in cents.
    pub balance_cents: i64,
    /// Balance formatted as dollars.
    pub balance_formatted: String,
}

/// `POST /api/reports/:report_id/purchase`.
///
/// The purchase runs on its own task. If the client disconnects before the
/// task finishes, the token is cancelled; the purchase stops only if it has
/// not debited yet.
pub async fn purchase_report(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(report_id): Path<String>,
) -> Result<Json<PurchaseResponse>, ApiError> {
    let report_id = report_id
        .parse::<ReportId>()
        .map_err(BillingError::from)?;

    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let billing = state.billing.clone();
    let user_id = auth.user_id;
    let task = tokio::spawn(async move {
        billing
            .purchase_report(user_id, &report_id, &cancel)
            .await
    });

    let result = task
        .await
        .map_err(|e| ApiError::Internal(format!("purchase task failed: {e}")))?;
    let _ = guard.disarm();

    let purchase = result?;

    Ok(Json(PurchaseResponse {
        message: "Report purchased successfully",
        balance_cents: purchase.balance_cents,
        balance_formatted: format_cents(purchase.balance_cents),
    }))
}
