//! Bearer token supply for Microsoft Graph API requests
//!
//! The interactive login that first obtains tokens is outside this crate;
//! tokens are expected in the system keyring (or passed in directly).
//!
//! ## Components
//!
//! - [`OAuth2Config`] - Client ID, endpoints and scopes
//! - [`KeyringTokenStorage`] - Token persistence in the system keyring
//! - [`RefreshFlow`] - OAuth2 refresh-token grant
//! - [`StaticTokenProvider`] - Fixed token, e.g. from an environment variable
//! - [`RefreshingTokenProvider`] - Cached tokens refreshed shortly before expiry

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Utc};
use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, EndpointNotSet, EndpointSet, RefreshToken, Scope,
    TokenResponse, TokenUrl,
};
use oneup_core::ports::{ITokenProvider, Tokens};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default Microsoft OAuth2 authorization endpoint (consumers tenant)
const AUTH_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/authorize";

/// Default Microsoft OAuth2 token endpoint (consumers tenant)
const TOKEN_URL: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/token";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "oneup";

/// Default OAuth2 scopes for OneDrive access
const DEFAULT_SCOPES: &[&str] = &["Files.ReadWrite.All", "offline_access"];

/// Tokens are refreshed when they expire within this many minutes
const REFRESH_MARGIN_MINUTES: i64 = 5;

// ============================================================================
// OAuth2Config
// ============================================================================

/// Configuration for the OAuth2 refresh grant
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Application (client) ID from Azure AD app registration
    pub app_id: String,
    /// Token endpoint
    pub token_url: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    /// Creates a new OAuth2Config with the given app_id and default settings
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            token_url: TOKEN_URL.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Creates a config with custom scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Creates a config with a custom token endpoint (useful for testing)
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }
}

// ============================================================================
// Token storage
// ============================================================================

/// Persistent location of the OAuth tokens
pub trait TokenStorage: Send + Sync {
    /// Loads the stored tokens, `None` when nothing is stored
    fn load(&self) -> Result<Option<Tokens>>;

    /// Replaces the stored tokens
    fn store(&self, tokens: &Tokens) -> Result<()>;
}

/// Stores and retrieves OAuth tokens from the system keyring
///
/// Uses the `keyring` crate to store tokens securely in the OS credential
/// store (e.g., GNOME Keyring, KDE Wallet, macOS Keychain).
/// Tokens are serialized as JSON with the service name "oneup" and the
/// account name as the username.
pub struct KeyringTokenStorage {
    account: String,
}

impl KeyringTokenStorage {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE, &self.account)
            .context("Failed to create keyring entry")
    }
}

impl TokenStorage for KeyringTokenStorage {
    fn load(&self) -> Result<Option<Tokens>> {
        match self.entry()?.get_password() {
            Ok(json) => {
                let tokens: Tokens = serde_json::from_str(&json)
                    .context("Failed to deserialize tokens from keyring")?;
                debug!(account = %self.account, "Loaded tokens from keyring");
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => {
                debug!(account = %self.account, "No tokens found in keyring");
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    fn store(&self, tokens: &Tokens) -> Result<()> {
        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;
        self.entry()?
            .set_password(&json)
            .context("Failed to store tokens in keyring")?;

        debug!(account = %self.account, "Stored tokens in keyring");
        Ok(())
    }
}

// ============================================================================
// RefreshFlow
// ============================================================================

/// OAuth2 refresh-token grant using the `oauth2` crate
pub struct RefreshFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    scopes: Vec<String>,
}

impl RefreshFlow {
    /// Creates a new RefreshFlow with the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.app_id.clone()))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string()).context("Invalid authorization URL")?)
            .set_token_uri(
                TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?,
            );

        Ok(Self {
            client,
            scopes: config.scopes.clone(),
        })
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// # Arguments
    /// * `refresh_token` - The refresh token from a previous authentication
    ///
    /// # Returns
    /// New OAuth tokens. The previous refresh token is kept when the server
    /// does not rotate it.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");

        let http_client = reqwest::Client::new();
        let refresh = RefreshToken::new(refresh_token.to_string());
        let mut request = self.client.exchange_refresh_token(&refresh);
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let token_result = request
            .request_async(&http_client)
            .await
            .context("Failed to refresh token")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at,
        };

        info!("Successfully refreshed access token");
        Ok(tokens)
    }
}

// ============================================================================
// Token providers
// ============================================================================

/// Hands out a fixed access token
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl ITokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(anyhow!("Access token is empty"));
        }
        Ok(self.token.clone())
    }
}

/// Serves tokens from a [`TokenStorage`], refreshing them when they are
/// about to expire and writing the refreshed tokens back
pub struct RefreshingTokenProvider<S: TokenStorage> {
    storage: S,
    flow: Option<RefreshFlow>,
    cached: Mutex<Option<Tokens>>,
}

impl<S: TokenStorage> RefreshingTokenProvider<S> {
    /// # Arguments
    /// * `storage` - Where the tokens live
    /// * `flow` - Refresh grant; without it an expiring token is an error
    pub fn new(storage: S, flow: Option<RefreshFlow>) -> Self {
        Self {
            storage,
            flow,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait::async_trait]
impl<S: TokenStorage> ITokenProvider for RefreshingTokenProvider<S> {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = self.storage.load()?;
        }

        let tokens = cached
            .as_ref()
            .ok_or_else(|| anyhow!("No stored tokens; sign in first"))?;

        if !tokens.expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES)) {
            return Ok(tokens.access_token.clone());
        }

        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or_else(|| anyhow!("Access token expired and no refresh token is stored"))?;
        let flow = self
            .flow
            .as_ref()
            .ok_or_else(|| anyhow!("Access token expired and no app_id is configured"))?;

        let fresh = flow.refresh_token(&refresh_token).await?;
        if let Err(e) = self.storage.store(&fresh) {
            warn!(error = %e, "Could not persist refreshed tokens");
        }

        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }
}

/// Token provider backed by the system keyring
pub type KeyringTokenProvider = RefreshingTokenProvider<KeyringTokenStorage>;
