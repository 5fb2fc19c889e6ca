// Error handling module
// Defines the error taxonomy surfaced by the token manager and the API client

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while obtaining a token or sending a CRM request
///
/// Non-2xx responses from the CRM resource API are NOT errors; they are
/// handed back to the caller as raw responses. Only the OAuth refresh
/// exchange turns a bad status into an error.
#[derive(Error, Debug)]
pub enum ZohoError {
    /// Unrecognised domain name or other construction-time misconfiguration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// OAuth endpoint answered with a non-200 status
    #[error("Token refresh failed: {status} - {body}")]
    AuthRefreshError { status: u16, body: String },

    /// Missing identifier or parameter, detected before any I/O
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Connection, timeout or malformed response from the HTTP layer
    #[error("HTTP transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    /// Token file could not be written after a successful refresh
    #[error("Failed to write token file {}: {source}", .path.display())]
    TokenStoreError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File to upload could not be read
    #[error("Failed to read attachment {}: {source}", .path.display())]
    AttachmentError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Other local I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ZohoError {
    /// Shorthand for a missing required argument
    pub(crate) fn required(name: &str) -> Self {
        ZohoError::InvalidArgument(format!("{} is required.", name))
    }
}

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, ZohoError>;
