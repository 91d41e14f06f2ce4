//! HTTP client for the pocketledger cloud sync API.
//!
//! The sync engine runs over a pre-authenticated channel: callers supply a
//! bearer token per request, token refresh happens elsewhere.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::engine::SyncTransport;
use crate::error::{Result, SyncApiError};
use crate::types::{ApiErrorResponse, PullChangesRequest, PullChangesResponse, PushChangesRequest};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Resolve the cloud API base URL from the environment.
pub fn cloud_api_base_url() -> Result<String> {
    std::env::var("SYNC_API_URL")
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            SyncApiError::invalid_request("SYNC_API_URL not configured. Sync is disabled.")
        })
}

/// Client for the pocketledger cloud sync API.
#[derive(Debug, Clone)]
pub struct SyncApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl SyncApiClient {
    /// Create a new sync API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the cloud API (e.g., "https://api.pocketledger.app")
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a client from the `SYNC_API_URL` environment variable.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(&cloud_api_base_url()?))
    }

    /// Create headers for an API request.
    fn headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| SyncApiError::invalid_request("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    fn error_from_body(status: reqwest::StatusCode, body: &str) -> SyncApiError {
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(body) {
            return SyncApiError::api(
                status.as_u16(),
                format!("{}: {}", error.code, error.message),
            );
        }
        SyncApiError::api(status.as_u16(), format!("Request failed: {}", body))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::error_from_body(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            SyncApiError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Check a response whose success body is empty.
    async fn check_response(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            debug!("API response status: {}", status);
            return Ok(());
        }

        let body = response.text().await?;
        Self::log_response(status, &body);
        Err(Self::error_from_body(status, &body))
    }

    /// Pull all remote changes since the request's checkpoint.
    ///
    /// POST /api/v1/sync/pull
    pub async fn pull_changes(
        &self,
        token: &str,
        request: &PullChangesRequest,
    ) -> Result<PullChangesResponse> {
        let url = format!("{}/api/v1/sync/pull", self.base_url);
        debug!(
            "Pulling changes since {} (migration {} -> {})",
            request.last_pulled_at, request.migration.from, request.migration.to
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers(token)?)
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Push one batch of local changes. Success is an empty 2xx body.
    ///
    /// POST /api/v1/sync/push
    pub async fn push_changes(&self, token: &str, request: &PushChangesRequest) -> Result<()> {
        let url = format!("{}/api/v1/sync/push", self.base_url);
        debug!(
            "Pushing {} rows across {} tables",
            request.changes.total_item_count(),
            request.changes.len()
        );

        let response = self
            .client
            .post(&url)
            .headers(self.headers(token)?)
            .json(request)
            .send()
            .await?;

        Self::check_response(response).await
    }
}

#[async_trait]
impl SyncTransport for SyncApiClient {
    async fn pull_changes(
        &self,
        token: &str,
        request: &PullChangesRequest,
    ) -> Result<PullChangesResponse> {
        SyncApiClient::pull_changes(self, token, request).await
    }

    async fn push_changes(&self, token: &str, request: &PushChangesRequest) -> Result<()> {
        SyncApiClient::push_changes(self, token, request).await
    }
}
