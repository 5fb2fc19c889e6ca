// Token sources for the API client

use async_trait::async_trait;

use super::manager::TokenManager;
use crate::error::Result;

/// Anything that can hand out a bearer token for a request
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

#[async_trait]
impl TokenProvider for TokenManager {
    async fn access_token(&self) -> Result<String> {
        self.get_access_token().await
    }
}

/// A token obtained elsewhere and passed in as-is
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
