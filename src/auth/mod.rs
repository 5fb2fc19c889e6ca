// Authentication module
// Owns OAuth credential state and the on-disk token cache

mod domain;
mod manager;
mod provider;
mod refresh;
mod store;
mod types;

pub use domain::Domain;
pub use manager::TokenManager;
pub use provider::{StaticToken, TokenProvider};
pub use refresh::{token_url, TOKEN_LEASE_MINUTES};
pub use store::{TokenStore, EXPIRY_FORMAT};
pub use types::{
    CachedToken, OAuthConfig, OAuthCredentials, DEFAULT_TOKEN_DIR, DEFAULT_TOKEN_FILENAME,
};
