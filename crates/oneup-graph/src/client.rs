//! Microsoft Graph API client
//!
//! Provides a retry-wrapped HTTP client for the Microsoft Graph API.
//! Handles authentication headers, endpoint construction, transient-failure
//! retries and error status mapping.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use oneup_graph::auth::StaticTokenProvider;
//! use oneup_graph::client::{GraphClient, RequestAuth};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tokens = Arc::new(StaticTokenProvider::new("access-token-here"));
//! let client = GraphClient::new(tokens, Duration::from_secs(60))?;
//! let url = client.url("/me/drive/root");
//! let response = client
//!     .execute("get_root", RequestAuth::Bearer, |http| http.get(&url))
//!     .await?;
//! println!("{}", response.status());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use oneup_core::ports::ITokenProvider;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::retry::{is_transient_error, is_transient_status, RetryPolicy};
use crate::GraphError;

/// Base URL for Microsoft Graph API v1.0
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Whether a request carries the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAuth {
    /// `Authorization: Bearer <token>` from the token provider
    Bearer,
    /// Pre-authenticated URL (upload sessions); no header is added
    None,
}

// ============================================================================
// GraphClient
// ============================================================================

/// HTTP client for Microsoft Graph API calls
///
/// Wraps `reqwest::Client` with authentication headers, base URL
/// construction and the retry policy applied to every request.
pub struct GraphClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Source of the bearer token, queried before every attempt
    tokens: Arc<dyn ITokenProvider>,
    /// Backoff settings for transient failures
    retry: RetryPolicy,
}

impl GraphClient {
    /// Creates a new GraphClient pointing at the public Graph endpoint
    ///
    /// # Arguments
    /// * `tokens` - Token provider consulted before every request
    /// * `timeout` - Per-request timeout; a timed-out attempt is retried
    pub fn new(tokens: Arc<dyn ITokenProvider>, timeout: Duration) -> Result<Self, GraphError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: GRAPH_BASE_URL.to_string(),
            tokens,
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the base URL (useful for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replaces the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Absolute URL for an API path such as `/me/drive/root`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // Retry-wrapped execution
    // ========================================================================

    /// Executes an HTTP request with exponential backoff on transient failures.
    ///
    /// `build` is called once per attempt so that the body is re-sent in full.
    /// An attempt is retried when sending fails at the connection level, the
    /// request times out, or the status is 5xx or 429. Any other response,
    /// successful or not, is returned to the caller as-is.
    ///
    /// # Arguments
    /// * `operation` - Logical operation name, used in logs and errors
    /// * `auth` - Whether to attach the bearer token
    /// * `build` - Produces the request for one attempt
    ///
    /// # Returns
    /// The first non-transient response, or [`GraphError::RetriesExhausted`]
    /// once every attempt failed transiently
    pub async fn execute<F>(
        &self,
        operation: &str,
        auth: RequestAuth,
        build: F,
    ) -> Result<Response, GraphError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt - 1);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_error,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = build(&self.client);
            if auth == RequestAuth::Bearer {
                let token = self
                    .tokens
                    .access_token()
                    .await
                    .map_err(|e| GraphError::Auth(format!("{e:#}")))?;
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) if is_transient_status(response.status()) => {
                    last_error = format!("HTTP {}", response.status().as_u16());
                }
                Ok(response) => {
                    if attempt > 0 {
                        info!(operation, attempt = attempt + 1, "Request succeeded after retry");
                    }
                    debug!(operation, status = response.status().as_u16(), "Request completed");
                    return Ok(response);
                }
                Err(e) if is_transient_error(&e) => {
                    last_error = e.to_string();
                }
                Err(e) => return Err(GraphError::NetworkError(e)),
            }
        }

        warn!(operation, attempts, error = %last_error, "Retry limit exhausted");
        Err(GraphError::RetriesExhausted {
            operation: operation.to_string(),
            attempts,
            last_error,
        })
    }
}

// ============================================================================
// Response helpers
// ============================================================================

/// Passes 2xx responses through and turns anything else into
/// [`GraphError::Rejected`] carrying the response body
pub async fn expect_success(operation: &str, response: Response) -> Result<Response, GraphError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(rejected(operation, response).await)
}

/// Builds a [`GraphError::Rejected`] from an error response
pub async fn rejected(operation: &str, response: Response) -> GraphError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_string());
    GraphError::Rejected {
        operation: operation.to_string(),
        status,
        body,
    }
}

/// Parses a JSON response body
pub async fn read_json<T: DeserializeOwned>(
    operation: &str,
    response: Response,
) -> Result<T, GraphError> {
    response
        .json()
        .await
        .map_err(|e| GraphError::InvalidResponse(format!("{operation}: {e}")))
}
