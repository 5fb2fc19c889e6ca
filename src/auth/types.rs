// Authentication types

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::domain::Domain;
use crate::error::Result;

pub const DEFAULT_TOKEN_DIR: &str = "./";
pub const DEFAULT_TOKEN_FILENAME: &str = "token.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Refresh-token grant parameters; never mutated after construction
#[derive(Clone)]
pub struct OAuthCredentials {
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: String,
}

impl OAuthCredentials {
    pub fn new(
        refresh_token: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        grant_type: impl Into<String>,
    ) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            grant_type: grant_type.into(),
        }
    }

    /// Query parameters of the refresh request
    pub(crate) fn as_params(&self) -> [(&'static str, &str); 4] {
        [
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", self.grant_type.as_str()),
        ]
    }
}

// Secrets stay out of logs
impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("refresh_token", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("grant_type", &self.grant_type)
            .finish()
    }
}

/// Everything a `TokenManager` needs at construction
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub domain: Domain,
    pub credentials: OAuthCredentials,
    /// Overrides `domain.accounts_url()` when set
    pub accounts_url: Option<String>,
    pub token_path: PathBuf,
    pub request_timeout: Duration,
}

impl OAuthConfig {
    /// Resolve `domain_name` (case-insensitive) and use `./token.json` for persistence
    pub fn new(
        domain_name: &str,
        refresh_token: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        grant_type: impl Into<String>,
    ) -> Result<Self> {
        let domain: Domain = domain_name.parse()?;
        Ok(Self {
            domain,
            credentials: OAuthCredentials::new(refresh_token, client_id, client_secret, grant_type),
            accounts_url: None,
            token_path: Path::new(DEFAULT_TOKEN_DIR).join(DEFAULT_TOKEN_FILENAME),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    /// Keep the filename, move the file into `dir`
    pub fn token_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let filename = self
            .token_path
            .file_name()
            .map(|f| f.to_os_string())
            .unwrap_or_else(|| DEFAULT_TOKEN_FILENAME.into());
        self.token_path = dir.as_ref().join(filename);
        self
    }

    /// Keep the directory, rename the file
    pub fn token_filename(mut self, filename: impl AsRef<Path>) -> Self {
        self.token_path.set_file_name(filename.as_ref());
        self
    }

    pub fn token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn accounts_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Accounts server base URL actually used for refreshes
    pub fn resolved_accounts_url(&self) -> &str {
        self.accounts_url
            .as_deref()
            .unwrap_or_else(|| self.domain.accounts_url())
    }
}

/// Bearer token held in memory together with its local expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: String,
    pub expiry: NaiveDateTime,
}

impl CachedToken {
    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        now >= self.expiry
    }
}

/// Accounts server refresh response; only `access_token` is used
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}
