// Persisted token record
// One JSON file per token manager: {"token": "...", "expiry": "YYYY-MM-DD HH:MM:SS"}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::types::CachedToken;
use crate::error::{Result, ZohoError};

pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize, Deserialize)]
struct TokenRecord {
    token: String,
    #[serde(with = "expiry_format")]
    expiry: chrono::NaiveDateTime,
}

mod expiry_format {
    use super::EXPIRY_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.format(EXPIRY_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, EXPIRY_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// File-backed token cache (plain overwrite, last writer wins)
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort read: a missing, unreadable or malformed file is a cold cache
    pub fn load(&self) -> Option<CachedToken> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "No cached token file");
                return None;
            }
        };

        match serde_json::from_str::<TokenRecord>(&content) {
            Ok(record) if record.token.trim().is_empty() => {
                tracing::warn!(path = %self.path.display(), "Ignoring token file with empty token");
                None
            }
            Ok(record) => Some(CachedToken {
                token: record.token,
                expiry: record.expiry,
            }),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring malformed token file"
                );
                None
            }
        }
    }

    /// Overwrite the file with `token`, creating parent directories as needed
    pub fn save(&self, token: &CachedToken) -> Result<()> {
        let record = TokenRecord {
            token: token.token.clone(),
            expiry: token.expiry,
        };
        let io_err = |source: std::io::Error| ZohoError::TokenStoreError {
            path: self.path.clone(),
            source,
        };
        let content = serde_json::to_string(&record).map_err(|e| io_err(e.into()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&self.path, content).map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), "Token saved");
        Ok(())
    }
}
