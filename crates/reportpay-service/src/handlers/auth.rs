//! Registration and login handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

/// Credentials for register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    /// Login name.
    pub login: String,
    /// Plain-text password.
    pub password: String,
}

/// Issued access token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// HS256 bearer token.
    pub access_token: String,
}

/// `POST /api/auth/register`.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let user = state.accounts.register(&body.login, &body.password).await?;
    let access_token = state.tokens.issue(user.id)?;

    Ok((StatusCode::CREATED, Json(TokenResponse { access_token })))
}

/// `POST /api/auth/login`.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state.accounts.login(&body.login, &body.password).await?;
    let access_token = state.tokens.issue(user.id)?;

    Ok(Json(TokenResponse { access_token }))
}
