//! Shared HTTP plumbing for the real platform adapters: one call path that
//! applies the token bucket, bearer auth with single-flight refresh, status
//! mapping into the adapter error taxonomy, and bounded retry of transient
//! failures.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use adpilot_core::AdapterError;

use crate::auth::TokenGuard;
use crate::ratelimit::TokenBucket;

const TRANSIENT_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 200;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in_secs: i64,
}

/// Connection state shared by every operation of one platform adapter.
pub struct PlatformClient {
    client: reqwest::Client,
    endpoint: String,
    auth: TokenGuard,
    refresh_token: Option<String>,
    bucket: TokenBucket,
}

impl PlatformClient {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        refresh_token: Option<String>,
        bucket: TokenBucket,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            auth: TokenGuard::new(api_key),
            refresh_token,
            bucket,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Invoke a platform tool with JSON arguments, decoding the JSON reply.
    ///
    /// Applies the token bucket before going to the wire, refreshes auth
    /// (single-flight) on a 401, and retries transient failures with bounded
    /// exponential backoff. Everything else maps straight into the error
    /// taxonomy.
    pub async fn call<A: Serialize, T: DeserializeOwned>(
        &self,
        tool: &str,
        arguments: &A,
    ) -> Result<T, AdapterError> {
        self.bucket.try_acquire()?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.call_once(tool, arguments).await {
                Err(AdapterError::AuthExpired) if attempt == 1 => {
                    self.refresh_auth().await?;
                    continue;
                }
                Err(e) if e.is_retryable() && attempt < TRANSIENT_ATTEMPTS => {
                    let backoff = BACKOFF_BASE_MS * 2u64.pow(attempt - 1);
                    warn!(tool, attempt, backoff_ms = backoff, error = %e, "transient adapter error, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                    continue;
                }
                other => return other,
            }
        }
    }

    async fn call_once<A: Serialize, T: DeserializeOwned>(
        &self,
        tool: &str,
        arguments: &A,
    ) -> Result<T, AdapterError> {
        let url = format!("{}/tools/{tool}", self.endpoint);
        let mut request = self.client.post(&url).json(arguments);
        if let Some((token, _)) = self.auth.current().await {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(tool, %status, "platform call");

        match status.as_u16() {
            200..=299 => response
                .json::<T>()
                .await
                .map_err(|e| AdapterError::Validation(format!("undecodable response: {e}"))),
            401 => Err(AdapterError::AuthExpired),
            404 => Err(AdapterError::NotFound(tool.to_string())),
            400 | 422 => {
                let body = response.text().await.unwrap_or_default();
                Err(AdapterError::Validation(body))
            }
            429 => {
                let retry_after_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                Err(AdapterError::RateLimited { retry_after_secs })
            }
            500..=599 => Err(AdapterError::Transient(format!("status {status}"))),
            _ => Err(AdapterError::Unavailable(format!("status {status}"))),
        }
    }

    /// Single-flight refresh through the platform's oauth endpoint.
    async fn refresh_auth(&self) -> Result<(), AdapterError> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or(AdapterError::AuthExpired)?;
        let seen = self
            .auth
            .current()
            .await
            .map(|(_, generation)| generation)
            .unwrap_or(0);

        let client = self.client.clone();
        let url = format!("{}/oauth/refresh", self.endpoint);
        self.auth
            .refresh(seen, || async move {
                let response = client
                    .post(&url)
                    .json(&serde_json::json!({ "refresh_token": refresh_token }))
                    .send()
                    .await
                    .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(AdapterError::AuthExpired);
                }
                let body: RefreshResponse = response
                    .json()
                    .await
                    .map_err(|e| AdapterError::Validation(format!("bad refresh reply: {e}")))?;
                Ok((
                    body.access_token,
                    Utc::now() + chrono::Duration::seconds(body.expires_in_secs),
                ))
            })
            .await?;
        Ok(())
    }

    /// Lightweight reachability probe used by `health()`.
    pub async fn ping(&self) -> Result<(), AdapterError> {
        let url = format!("{}/health", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AdapterError::Unavailable(format!(
                "status {}",
                response.status()
            )))
        }
    }
}
