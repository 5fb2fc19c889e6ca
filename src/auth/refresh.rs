// Token refresh logic

use chrono::{Duration, Local};
use reqwest::{Client, StatusCode};

use super::types::{CachedToken, OAuthCredentials, RefreshResponse};
use crate::error::{Result, ZohoError};

/// Fixed lease granted to every refreshed token, regardless of `expires_in`
pub const TOKEN_LEASE_MINUTES: i64 = 50;

/// Get the token endpoint for an accounts server base URL
pub fn token_url(accounts_url: &str) -> String {
    format!("{}/oauth/v2/token", accounts_url.trim_end_matches('/'))
}

/// Exchange the refresh token for a new access token
///
/// Only a 200 is accepted; any other status becomes `AuthRefreshError`
/// carrying the status and raw body.
pub async fn refresh_access_token(
    client: &Client,
    accounts_url: &str,
    creds: &OAuthCredentials,
) -> Result<CachedToken> {
    let url = token_url(accounts_url);
    tracing::info!(url = %url, "Refreshing Zoho access token...");

    let response = client
        .post(&url)
        .query(&creds.as_params())
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to send token refresh request");
            ZohoError::TransportError(e)
        })?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read token refresh error body");
                String::new()
            }
        };
        tracing::error!(
            status = status.as_u16(),
            body = %body,
            "Token refresh failed"
        );
        return Err(ZohoError::AuthRefreshError {
            status: status.as_u16(),
            body,
        });
    }

    let data: RefreshResponse = response.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse token refresh response");
        ZohoError::TransportError(e)
    })?;

    if data.access_token.trim().is_empty() {
        tracing::error!("Token refresh response carried an empty access_token");
        return Err(ZohoError::AuthRefreshError {
            status: status.as_u16(),
            body: "access_token is empty".to_string(),
        });
    }

    let expiry = Local::now().naive_local() + Duration::minutes(TOKEN_LEASE_MINUTES);

    tracing::info!(
        token = %mask(&data.access_token),
        expiry = %expiry,
        "Access token refreshed"
    );

    Ok(CachedToken {
        token: data.access_token,
        expiry,
    })
}

/// First few characters of a token, for logs
pub(crate) fn mask(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}...", prefix)
}
