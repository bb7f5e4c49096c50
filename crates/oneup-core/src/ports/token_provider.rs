//! Token provider port
//!
//! Supplies the bearer credential for remote requests. How the credential
//! was first obtained (interactive login) is outside this workspace; the
//! provider only hands out a valid access token, refreshing it when needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth tokens received from the identity provider
///
/// Contains the access token for API requests, an optional refresh token
/// for obtaining new access tokens, and the expiration time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    /// Bearer token for authenticating API requests
    pub access_token: String,
    /// Token for refreshing the access token without user interaction
    /// (requires `offline_access` scope)
    pub refresh_token: Option<String>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within the given duration
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// Port trait for obtaining a bearer token
#[async_trait::async_trait]
pub trait ITokenProvider: Send + Sync {
    /// Returns an access token valid for at least the next request
    ///
    /// Called before every request attempt, so implementations should
    /// cache the token and only refresh it close to expiry.
    async fn access_token(&self) -> anyhow::Result<String>;
}
