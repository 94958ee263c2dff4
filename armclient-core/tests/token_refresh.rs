//! Integration tests for credential acquisition and refresh.
//!
//! These tests verify that the TokenAuthenticator correctly:
//! - Serves valid cached credentials without contacting the broker
//! - Refreshes expired credentials through the identity endpoint
//! - Surfaces broker rejections and unreachable endpoints with the right kind

mod common;

use std::sync::Arc;

use armclient_core::{
    ArmError, AuthError, CloudEnvironment, Credential, CredentialKind, ErrorKind,
    ManagedIdentityBroker, MemoryCache, MemorySettingsStore, Secret, Settings, TenantId,
    TenantSelector, TokenAuthenticator, TokenCache,
};
use chrono::{Duration, Utc};
use common::{jwt, mock_cloud};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path},
};

#[cfg(feature = "oauth")]
use armclient_core::OAuthRefreshBroker;

fn settings(active: &str) -> Arc<MemorySettingsStore> {
    Arc::new(MemorySettingsStore::with_settings(Settings::new(active)))
}

#[cfg(feature = "oauth")]
fn oauth_authenticator(
    cloud: CloudEnvironment,
    active: &str,
) -> TokenAuthenticator<MemoryCache, OAuthRefreshBroker> {
    TokenAuthenticator::new(
        MemoryCache::new(),
        OAuthRefreshBroker::new(cloud),
        settings(active),
    )
}

#[cfg(feature = "oauth")]
#[tokio::test]
async fn test_valid_cached_credential_skips_broker() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let auth = oauth_authenticator(mock_cloud(&mock_server), "tenant-a");
    let cached = common::valid_credential("tenant-a");
    auth.store_credential(&cached).await.unwrap();

    let credential = auth.get_token(&TenantSelector::Current).await.unwrap();
    assert_eq!(credential.access_token, cached.access_token);
}

#[cfg(feature = "oauth")]
#[tokio::test]
async fn test_expired_credential_is_refreshed_for_its_tenant() {
    let mock_server = MockServer::start().await;
    let new_token = jwt(Utc::now() + Duration::hours(1), "tenant-a");

    Mock::given(method("POST"))
        .and(path("/tenant-a/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": new_token,
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "new-refresh",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = oauth_authenticator(mock_cloud(&mock_server), "tenant-a");
    let expired = Credential::with_expiry(
        TenantId::new("tenant-a"),
        Secret::new(jwt(Utc::now() - Duration::minutes(10), "tenant-a")),
        Utc::now() - Duration::minutes(10),
    )
    .with_refresh_token(Secret::new("old-refresh"));
    auth.store_credential(&expired).await.unwrap();

    let credential = auth.get_token(&TenantSelector::Current).await.unwrap();

    assert_eq!(credential.access_token.expose(), new_token);
    assert!(credential.is_usable(Duration::minutes(5)));

    // rotated refresh token is cached
    let refresh = auth
        .cache()
        .load(&TenantId::new("tenant-a"), CredentialKind::RefreshToken)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refresh.expose(), "new-refresh");
}

#[cfg(feature = "oauth")]
#[tokio::test]
async fn test_seed_refresh_token_used_for_explicit_tenant() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-b/oauth2/v2.0/token"))
        .and(body_string_contains("refresh_token=seed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": jwt(Utc::now() + Duration::hours(1), "tenant-b"),
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = TokenAuthenticator::new(
        MemoryCache::new(),
        OAuthRefreshBroker::new(mock_cloud(&mock_server)).with_refresh_token("seed"),
        settings("tenant-a"),
    );

    let credential = auth
        .get_token(&TenantSelector::from_option(Some("tenant-b")))
        .await
        .unwrap();

    assert_eq!(credential.tenant_id.as_str(), "tenant-b");
    assert_eq!(credential.claims().unwrap().tid.as_deref(), Some("tenant-b"));
}

#[cfg(feature = "oauth")]
#[tokio::test]
async fn test_rejected_refresh_is_an_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tenant-a/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "AADSTS70008: The refresh token has expired",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = oauth_authenticator(mock_cloud(&mock_server), "tenant-a");
    auth.cache()
        .save(
            &TenantId::new("tenant-a"),
            CredentialKind::RefreshToken,
            &Secret::new("stale"),
        )
        .await
        .unwrap();

    let err = auth.get_token(&TenantSelector::Current).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected { .. }), "got {:?}", err);
    assert_eq!(ArmError::from(err).kind(), ErrorKind::Auth);

    // nothing cached for the failed tenant
    assert!(
        auth.cache()
            .load(&TenantId::new("tenant-a"), CredentialKind::AccessToken)
            .await
            .unwrap()
            .is_none()
    );
}

#[cfg(feature = "oauth")]
#[tokio::test]
async fn test_no_session_without_refresh_token() {
    let mock_server = MockServer::start().await;
    let auth = oauth_authenticator(mock_cloud(&mock_server), "");

    let err = auth.get_token(&TenantSelector::Current).await.unwrap_err();
    match err {
        AuthError::NoSession { tenant } => assert_eq!(tenant, "common"),
        other => panic!("expected NoSession, got {:?}", other),
    }
}

#[cfg(feature = "oauth")]
#[tokio::test]
async fn test_unreachable_identity_endpoint_is_a_network_error() {
    let cloud = CloudEnvironment::new(
        "Unreachable",
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
        "https://management.core.windows.net/",
    );
    let auth = TokenAuthenticator::new(
        MemoryCache::new(),
        OAuthRefreshBroker::new(cloud).with_refresh_token("seed"),
        settings("tenant-a"),
    );

    let err = auth.get_token(&TenantSelector::Current).await.unwrap_err();
    assert!(matches!(err, AuthError::Unreachable { .. }), "got {:?}", err);
    assert_eq!(ArmError::from(err).kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_managed_identity_broker() {
    let mock_server = MockServer::start().await;
    let token = jwt(Utc::now() + Duration::hours(1), "home-tenant");

    Mock::given(method("POST"))
        .and(path("/msi/token"))
        .and(header("Metadata", "true"))
        .and(body_string_contains(
            "resource=https%3A%2F%2Fmanagement.core.windows.net%2F",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": token,
            "expires_on": "1700000000",
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let broker = ManagedIdentityBroker::new(
        format!("{}/msi/token", mock_server.uri()),
        "https://management.core.windows.net/",
    );
    let auth = TokenAuthenticator::new(MemoryCache::new(), broker, settings(""));

    let credential = auth.get_token(&TenantSelector::Current).await.unwrap();
    assert_eq!(credential.access_token.expose(), token);
    assert!(credential.refresh_token.is_none());

    // second call is served from the cache
    auth.get_token(&TenantSelector::Current).await.unwrap();
}

#[tokio::test]
async fn test_managed_identity_token_for_other_tenant_is_refused() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/msi/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": jwt(Utc::now() + Duration::hours(1), "home-tenant"),
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let broker = ManagedIdentityBroker::new(
        format!("{}/msi/token", mock_server.uri()),
        "https://management.core.windows.net/",
    );
    let auth = TokenAuthenticator::new(MemoryCache::new(), broker, settings(""));
    let other = TenantId::new("other-tenant");

    let err = auth
        .get_token(&TenantSelector::Explicit(other.clone()))
        .await
        .unwrap_err();

    match &err {
        AuthError::NoSession { tenant } => assert_eq!(tenant, "other-tenant"),
        other => panic!("expected NoSession, got {:?}", other),
    }
    assert_eq!(ArmError::from(err).kind(), ErrorKind::Auth);
    assert!(
        auth.cache()
            .load(&other, CredentialKind::AccessToken)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_managed_identity_error_status_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/msi/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("identity not found"))
        .mount(&mock_server)
        .await;

    let broker = ManagedIdentityBroker::new(
        format!("{}/msi/token", mock_server.uri()),
        "https://management.core.windows.net/",
    );
    let auth = TokenAuthenticator::new(MemoryCache::new(), broker, settings(""));

    let err = auth.get_token(&TenantSelector::Current).await.unwrap_err();
    match err {
        AuthError::Rejected { message, .. } => assert!(message.contains("identity not found")),
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_acquired_token_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/msi/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "not-a-jwt",
        })))
        .mount(&mock_server)
        .await;

    let broker = ManagedIdentityBroker::new(
        format!("{}/msi/token", mock_server.uri()),
        "https://management.core.windows.net/",
    );
    let auth = TokenAuthenticator::new(MemoryCache::new(), broker, settings(""));

    let err = auth.get_token(&TenantSelector::Current).await.unwrap_err();
    assert!(matches!(err, AuthError::MalformedToken { .. }));
}
