// Zoho CRM client - library root

pub mod auth;
pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;

pub use auth::{Domain, OAuthConfig, OAuthCredentials, StaticToken, TokenManager, TokenProvider};
pub use client::ZohoClient;
pub use error::{Result, ZohoError};
