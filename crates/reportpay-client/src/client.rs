//! reportpay HTTP client implementation.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, BalanceResponse, ClientTokenRequest, CreateReportResponse, Credentials,
    HealthResponse, LinkAnonymousResponse, PurchaseResponse, ReportListResponse, TokenResponse,
};

/// reportpay API client.
///
/// Protected calls take the bearer token returned by [`register`](Self::register)
/// or [`login`](Self::login).
#[derive(Debug, Clone)]
pub struct ReportPayClient {
    client: Client,
    base_url: String,
}

impl ReportPayClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the service (e.g., `"http://reportpay:8080"`)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new client with custom options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Build a URL from path segments, percent-encoding each one.
    fn segment_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Configuration(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Configuration("base URL cannot have a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ========================================================================
    // Public routes
    // ========================================================================

    /// Check service health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.send(self.client.get(self.url("/health"))).await
    }

    /// Register a new account and return its access token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with code `conflict` if the login is taken.
    pub async fn register(&self, login: &str, password: &str) -> Result<String, ClientError> {
        let body = Credentials {
            login: login.to_string(),
            password: password.to_string(),
        };
        let response: TokenResponse = self
            .send(self.client.post(self.url("/api/auth/register")).json(&body))
            .await?;
        Ok(response.access_token)
    }

    /// Log in and return an access token.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthorized` for wrong credentials.
    pub async fn login(&self, login: &str, password: &str) -> Result<String, ClientError> {
        let body = Credentials {
            login: login.to_string(),
            password: password.to_string(),
        };
        let response: TokenResponse = self
            .send(self.client.post(self.url("/api/auth/login")).json(&body))
            .await?;
        Ok(response.access_token)
    }

    /// Create an anonymous report for a client token.
    ///
    /// Only available when the service runs with mock routes enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn create_mock_report(
        &self,
        client_generated_id: &str,
    ) -> Result<CreateReportResponse, ClientError> {
        let body = ClientTokenRequest {
            client_generated_id,
        };
        self.send(
            self.client
                .post(self.url("/api/mock/create-report"))
                .json(&body),
        )
        .await
    }

    // ========================================================================
    // Authenticated routes
    // ========================================================================

    /// Attach anonymous reports created under `client_generated_id` to the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn link_anonymous(
        &self,
        access_token: &str,
        client_generated_id: &str,
    ) -> Result<LinkAnonymousResponse, ClientError> {
        let body = ClientTokenRequest {
            client_generated_id,
        };
        self.send(
            self.client
                .post(self.url("/api/user/link-anonymous"))
                .bearer_auth(access_token)
                .json(&body),
        )
        .await
    }

    /// List the account's reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_reports(
        &self,
        access_token: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<ReportListResponse, ClientError> {
        let mut query = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit));
        }
        if let Some(offset) = offset {
            query.push(("offset", offset));
        }

        self.send(
            self.client
                .get(self.url("/api/user/reports"))
                .bearer_auth(access_token)
                .query(&query),
        )
        .await
    }

    /// Get the account balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn balance(&self, access_token: &str) -> Result<BalanceResponse, ClientError> {
        self.send(
            self.client
                .get(self.url("/api/user/balance"))
                .bearer_auth(access_token),
        )
        .await
    }

    /// Purchase a report.
    ///
    /// # Errors
    ///
    /// - `ClientError::ReportNotFound` if the report is missing or not owned.
    /// - `ClientError::AlreadyPurchased` if the report was already purchased.
    /// - `ClientError::InsufficientBalance` if the balance does not cover the price.
    /// - `ClientError::Configuration` if the base URL cannot carry a path.
    pub async fn purchase_report(
        &self,
        access_token: &str,
        report_id: &str,
    ) -> Result<PurchaseResponse, ClientError> {
        let url = self.segment_url(&["api", "reports", report_id, "purchase"])?;

        tracing::debug!(report_id, "Purchasing report");

        self.send(self.client.post(url).bearer_auth(access_token))
            .await
    }

    /// Send a request and decode the response.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        handle_response(response).await
    }
}

/// Handle API response and convert errors.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        let bytes = response.bytes().await?;
        return Ok(serde_json::from_slice(&bytes)?);
    }

    // Try to parse error response
    let error_body: Result<ApiErrorResponse, _> = response.json().await;

    let Ok(api_error) = error_body else {
        return Err(ClientError::Api {
            code: "unknown".to_string(),
            message: format!("HTTP {status}"),
            status: status.as_u16(),
        });
    };

    let detail = |key: &str| {
        api_error
            .error
            .details
            .as_ref()
            .and_then(|d| d.get(key))
            .cloned()
    };

    // Map specific error codes to typed errors
    match api_error.error.code.as_str() {
        "report_not_found" => Err(ClientError::ReportNotFound),
        "already_purchased" => Err(ClientError::AlreadyPurchased),
        "insufficient_balance" => Err(ClientError::InsufficientBalance {
            balance: detail("balance")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
            required: detail("required")
                .and_then(|v| v.as_i64())
                .unwrap_or(0),
        }),
        "unauthorized" => Err(ClientError::Unauthorized),
        "store_unavailable" => Err(ClientError::Unavailable {
            retryable: detail("retryable")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }),
        code => Err(ClientError::Api {
            code: code.to_string(),
            message: api_error.error.message.clone(),
            status: status.as_u16(),
        }),
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = ReportPayClient::new("http://localhost:8080/").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(client.url("/health"), "http://localhost:8080/health");
    }
}
