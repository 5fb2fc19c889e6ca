use chrono::{Local, NaiveDateTime};
use reqwest::Client;
use std::path::Path;
use tokio::sync::{Mutex, RwLock};

use super::refresh::{self, mask};
use super::store::TokenStore;
use super::types::{CachedToken, OAuthConfig, OAuthCredentials};
use crate::error::Result;

/// Authentication manager
/// Supplies a valid bearer token, refreshing and persisting it as needed.
///
/// State is per instance. Refreshes are single-flight: concurrent callers
/// that find the token expired queue on `refresh_lock`, and every caller
/// after the first reuses the token the first one obtained.
pub struct TokenManager {
    /// Accounts server base URL
    domain_url: String,

    credentials: OAuthCredentials,

    /// Current access token and its expiry
    cached: RwLock<Option<CachedToken>>,

    /// Held for the duration of a refresh
    refresh_lock: Mutex<()>,

    store: TokenStore,

    /// HTTP client for refresh requests
    client: Client,
}

impl TokenManager {
    /// Create a manager and warm its cache from the token file, if any
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(config, client))
    }

    /// Same as `new`, sharing an existing HTTP client
    pub fn with_client(config: OAuthConfig, client: Client) -> Self {
        let domain_url = config.resolved_accounts_url().to_string();
        let store = TokenStore::new(config.token_path);

        let cached = store.load();
        match &cached {
            Some(token) => tracing::info!(
                path = %store.path().display(),
                expiry = %token.expiry,
                "Loaded cached token"
            ),
            None => tracing::info!(
                path = %store.path().display(),
                "No usable cached token, starting cold"
            ),
        }

        Self {
            domain_url,
            credentials: config.credentials,
            cached: RwLock::new(cached),
            refresh_lock: Mutex::new(()),
            store,
            client,
        }
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn get_access_token(&self) -> Result<String> {
        if let Some(token) = self.current_token().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Someone else may have refreshed while we waited
        if let Some(token) = self.current_token().await {
            tracing::debug!("Reusing token refreshed by a concurrent caller");
            return Ok(token);
        }

        self.refresh_locked().await
    }

    /// Refresh unconditionally and return the new token
    pub async fn refresh(&self) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Caller must hold `refresh_lock`
    async fn refresh_locked(&self) -> Result<String> {
        let fresh =
            refresh::refresh_access_token(&self.client, &self.domain_url, &self.credentials)
                .await?;

        // Persist before publishing so the file never lags a completed refresh
        self.store.save(&fresh)?;
        tracing::info!(path = %self.store.path().display(), "Token persisted");

        let token = fresh.token.clone();
        *self.cached.write().await = Some(fresh);
        Ok(token)
    }

    /// Token if present and not expired
    async fn current_token(&self) -> Option<String> {
        let cached = self.cached.read().await;
        let now = Local::now().naive_local();
        match &*cached {
            Some(t) if !t.is_expired_at(now) => {
                tracing::trace!(token = %mask(&t.token), "Using cached token");
                Some(t.token.clone())
            }
            _ => None,
        }
    }

    /// True if no expiry is recorded or it has passed
    pub async fn is_expired(&self) -> bool {
        let cached = self.cached.read().await;
        match &*cached {
            None => true,
            Some(t) => t.is_expired_at(Local::now().naive_local()),
        }
    }

    pub async fn expires_at(&self) -> Option<NaiveDateTime> {
        self.cached.read().await.as_ref().map(|t| t.expiry)
    }

    pub fn domain_url(&self) -> &str {
        &self.domain_url
    }

    pub fn token_path(&self) -> &Path {
        self.store.path()
    }

    #[cfg(test)]
    async fn set_cached(&self, token: Option<CachedToken>) {
        *self.cached.write().await = token;
    }
}
