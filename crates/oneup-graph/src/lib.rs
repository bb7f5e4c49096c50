//! OneUp Graph - Microsoft Graph API client
//!
//! Provides async client for:
//! - Bearer token supply and refresh (system keyring, OAuth2 refresh grant)
//! - Retry-wrapped HTTP transport with exponential backoff
//! - OneDrive folder, upload, metadata and delete operations
//!
//! ## Modules
//!
//! - [`auth`] - Token providers and keyring token storage
//! - [`client`] - Retry-wrapped Microsoft Graph API HTTP client
//! - [`items`] - Item-by-path addressing, folder, timestamp and delete operations
//! - [`provider`] - `ICloudProvider` implementation
//! - [`retry`] - Retry policy and transient failure classification
//! - [`upload`] - File upload operations (simple and chunked)

pub mod auth;
pub mod client;
pub mod items;
pub mod provider;
pub mod retry;
pub mod upload;

use thiserror::Error;

/// Errors that can occur when communicating with the Microsoft Graph API
#[derive(Debug, Error)]
pub enum GraphError {
    /// No usable bearer token could be obtained
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Every attempt hit a transient failure; no definitive answer was received
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Logical operation name, e.g. `upload_chunk`
        operation: String,
        /// Number of attempts made
        attempts: u32,
        /// Description of the last transient failure
        last_error: String,
    },

    /// The server answered with a non-retriable error status
    #[error("{operation} rejected with HTTP {status}: {body}")]
    Rejected {
        /// Logical operation name
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// A network-level error that is not worth retrying
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GraphError {
    /// HTTP status of a rejected request
    pub fn status(&self) -> Option<u16> {
        match self {
            GraphError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server answered "not found"
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the request never received a definitive answer
    pub fn is_exhausted(&self) -> bool {
        matches!(self, GraphError::RetriesExhausted { .. })
    }
}
