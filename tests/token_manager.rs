// Integration tests for the token manager
//
// A mockito server stands in for the Zoho accounts server; token files live
// in a temporary directory per test.

use chrono::{Duration, Local, NaiveDateTime};
use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use zoho_crm::auth::{EXPIRY_FORMAT, TOKEN_LEASE_MINUTES};
use zoho_crm::{OAuthConfig, TokenManager, ZohoError};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

fn config(server: &ServerGuard, dir: &Path) -> OAuthConfig {
    OAuthConfig::new(
        "United States",
        "1000.refresh",
        "1000.CLIENT",
        "client-secret",
        "refresh_token",
    )
    .unwrap()
    .accounts_url(server.url())
    .token_dir(dir)
}

fn refresh_params() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("refresh_token".into(), "1000.refresh".into()),
        Matcher::UrlEncoded("client_id".into(), "1000.CLIENT".into()),
        Matcher::UrlEncoded("client_secret".into(), "client-secret".into()),
        Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
    ])
}

async fn mock_refresh(server: &mut ServerGuard, token: &str, hits: usize) -> Mock {
    server
        .mock("POST", "/oauth/v2/token")
        .match_query(refresh_params())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": token,
                "api_domain": "https://www.zohoapis.com",
                "token_type": "Bearer",
                "expires_in": 3600
            })
            .to_string(),
        )
        .expect(hits)
        .create_async()
        .await
}

fn write_token_file(dir: &Path, token: &str, expiry: NaiveDateTime) {
    let content = json!({
        "token": token,
        "expiry": expiry.format(EXPIRY_FORMAT).to_string(),
    });
    std::fs::write(dir.join("token.json"), content.to_string()).unwrap();
}

fn read_token_file(dir: &Path) -> (String, NaiveDateTime) {
    let raw = std::fs::read_to_string(dir.join("token.json")).unwrap();
    let json: Value = serde_json::from_str(&raw).unwrap();
    let expiry =
        NaiveDateTime::parse_from_str(json["expiry"].as_str().unwrap(), EXPIRY_FORMAT).unwrap();
    (json["token"].as_str().unwrap().to_string(), expiry)
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

// ==================================================================================================
// Cached Token Tests
// ==================================================================================================

#[tokio::test]
async fn test_cold_start_refreshes_once_then_uses_cache() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let mock = mock_refresh(&mut server, "1000.fresh", 1).await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();
    assert!(manager.is_expired().await);

    let first = manager.get_access_token().await.unwrap();
    let second = manager.get_access_token().await.unwrap();

    assert_eq!(first, "1000.fresh");
    assert_eq!(first, second);
    assert!(!manager.is_expired().await);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_valid_token_file_avoids_network() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    write_token_file(dir.path(), "1000.from-disk", now() + Duration::minutes(30));
    let mock = mock_refresh(&mut server, "1000.unused", 0).await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();

    assert!(!manager.is_expired().await);
    assert_eq!(manager.get_access_token().await.unwrap(), "1000.from-disk");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_expired_token_triggers_exactly_one_refresh() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    write_token_file(dir.path(), "1000.stale", now() - Duration::minutes(1));
    let mock = mock_refresh(&mut server, "1000.renewed", 1).await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();
    assert!(manager.is_expired().await);

    assert_eq!(manager.get_access_token().await.unwrap(), "1000.renewed");
    assert_eq!(manager.get_access_token().await.unwrap(), "1000.renewed");
    mock.assert_async().await;

    let (token, _) = read_token_file(dir.path());
    assert_eq!(token, "1000.renewed");
}

#[tokio::test]
async fn test_malformed_token_file_is_cold_cache() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("token.json"), r#"{"token": "1000.half"}"#).unwrap();
    let mock = mock_refresh(&mut server, "1000.fresh", 1).await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();
    assert!(manager.is_expired().await);
    assert!(manager.expires_at().await.is_none());

    assert_eq!(manager.get_access_token().await.unwrap(), "1000.fresh");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_blank_token_file_triggers_refresh() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    write_token_file(dir.path(), "", now() + Duration::days(365));
    let mock = mock_refresh(&mut server, "1000.fresh", 1).await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();
    assert!(manager.is_expired().await);

    assert_eq!(manager.get_access_token().await.unwrap(), "1000.fresh");
    mock.assert_async().await;

    let (token, _) = read_token_file(dir.path());
    assert_eq!(token, "1000.fresh");
}

// ==================================================================================================
// Refresh Tests
// ==================================================================================================

#[tokio::test]
async fn test_refresh_persists_token_with_fifty_minute_lease() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let _mock = mock_refresh(&mut server, "1000.persisted", 1).await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();

    let before = now();
    manager.get_access_token().await.unwrap();
    let after = now();

    let lease = Duration::minutes(TOKEN_LEASE_MINUTES);
    assert_eq!(lease, Duration::minutes(50));

    // File stores whole seconds
    let (token, expiry) = read_token_file(dir.path());
    assert_eq!(token, "1000.persisted");
    assert!(expiry >= before + lease - Duration::seconds(1), "{} too early", expiry);
    assert!(expiry <= after + lease, "{} too late", expiry);

    let in_memory = manager.expires_at().await.unwrap();
    assert!(in_memory >= before + lease && in_memory <= after + lease);
}

#[tokio::test]
async fn test_persisted_token_warms_a_new_manager() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let mock = mock_refresh(&mut server, "1000.shared", 1).await;

    let first = TokenManager::new(config(&server, dir.path())).unwrap();
    first.get_access_token().await.unwrap();

    let second = TokenManager::new(config(&server, dir.path())).unwrap();
    assert_eq!(second.get_access_token().await.unwrap(), "1000.shared");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_forced_refresh_replaces_valid_token() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    write_token_file(dir.path(), "1000.valid", now() + Duration::minutes(30));
    let mock = mock_refresh(&mut server, "1000.forced", 1).await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();
    assert_eq!(manager.refresh().await.unwrap(), "1000.forced");
    assert_eq!(manager.get_access_token().await.unwrap(), "1000.forced");
    assert_eq!(read_token_file(dir.path()).0, "1000.forced");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_refresh_failure_leaves_state_untouched() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let stale_expiry = (now() - Duration::minutes(5))
        .format(EXPIRY_FORMAT)
        .to_string();
    let stale_expiry = NaiveDateTime::parse_from_str(&stale_expiry, EXPIRY_FORMAT).unwrap();
    write_token_file(dir.path(), "1000.stale", stale_expiry);
    let file_before = std::fs::read_to_string(dir.path().join("token.json")).unwrap();

    let mock = server
        .mock("POST", "/oauth/v2/token")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_body(r#"{"error":"invalid_code"}"#)
        .expect(1)
        .create_async()
        .await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();
    let err = manager.get_access_token().await.unwrap_err();

    match err {
        ZohoError::AuthRefreshError { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_code"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(manager.expires_at().await, Some(stale_expiry));
    assert!(manager.is_expired().await);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("token.json")).unwrap(),
        file_before
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_non_200_success_status_is_refresh_error() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let _mock = server
        .mock("POST", "/oauth/v2/token")
        .match_query(Matcher::Any)
        .with_status(201)
        .with_body(r#"{"access_token":"1000.odd"}"#)
        .create_async()
        .await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();
    let err = manager.get_access_token().await.unwrap_err();
    assert!(matches!(err, ZohoError::AuthRefreshError { status: 201, .. }));
    assert!(!dir.path().join("token.json").exists());
}

#[tokio::test]
async fn test_missing_access_token_in_response() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let _mock = server
        .mock("POST", "/oauth/v2/token")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"error":"invalid_client"}"#)
        .create_async()
        .await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();
    let err = manager.get_access_token().await.unwrap_err();
    assert!(matches!(err, ZohoError::TransportError(_)));
    assert!(manager.is_expired().await);
}

#[tokio::test]
async fn test_empty_access_token_is_refresh_error() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let mock = mock_refresh(&mut server, "", 1).await;

    let manager = TokenManager::new(config(&server, dir.path())).unwrap();
    let err = manager.get_access_token().await.unwrap_err();

    assert!(matches!(err, ZohoError::AuthRefreshError { status: 200, .. }));
    assert!(manager.is_expired().await);
    assert!(!dir.path().join("token.json").exists());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unwritable_token_path_surfaces_store_error() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "x").unwrap();
    let _mock = mock_refresh(&mut server, "1000.lost", 1).await;

    let config = config(&server, dir.path()).token_path(blocker.join("token.json"));
    let manager = TokenManager::new(config).unwrap();

    let err = manager.get_access_token().await.unwrap_err();
    assert!(matches!(err, ZohoError::TokenStoreError { .. }));
    assert!(manager.is_expired().await);
}

// ==================================================================================================
// Concurrency Tests
// ==================================================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_refresh() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let mock = mock_refresh(&mut server, "1000.single-flight", 1).await;

    let manager = Arc::new(TokenManager::new(config(&server, dir.path())).unwrap());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.get_access_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "1000.single-flight");
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_instances_do_not_share_tokens() {
    let mut server = mockito::Server::new_async().await;
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    write_token_file(dir_a.path(), "1000.tenant-a", now() + Duration::minutes(30));
    write_token_file(dir_b.path(), "1000.tenant-b", now() + Duration::minutes(30));
    let mock = mock_refresh(&mut server, "1000.unused", 0).await;

    let a = TokenManager::new(config(&server, dir_a.path())).unwrap();
    let b = TokenManager::new(config(&server, dir_b.path())).unwrap();

    assert_eq!(a.get_access_token().await.unwrap(), "1000.tenant-a");
    assert_eq!(b.get_access_token().await.unwrap(), "1000.tenant-b");
    mock.assert_async().await;
}
