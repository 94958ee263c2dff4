//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use armclient_core::{
    ArmClient, CloudEnvironment, Credential, ManagedIdentityBroker, MemoryCache, RequestDispatcher,
    Secret, SettingsStore, TenantDirectory, TenantId, TokenAuthenticator, UrlResolver,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use wiremock::MockServer;

/// Build an unsigned three-segment JWT.
pub fn jwt(expires_at: DateTime<Utc>, tenant: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"none"}"#);
    let payload = serde_json::json!({
        "exp": expires_at.timestamp(),
        "tid": tenant,
        "upn": "operator@contoso.com",
        "aud": "https://management.core.windows.net/",
    });
    format!("{}.{}.sig", header, URL_SAFE_NO_PAD.encode(payload.to_string()))
}

/// A cloud whose authority and management endpoint are the mock server.
pub fn mock_cloud(server: &MockServer) -> CloudEnvironment {
    CloudEnvironment::new(
        "MockCloud",
        server.uri(),
        server.uri(),
        "https://management.core.windows.net/",
    )
}

/// A credential valid for an hour.
pub fn valid_credential(tenant: &str) -> Credential {
    let expires_at = Utc::now() + Duration::hours(1);
    Credential::with_expiry(
        TenantId::new(tenant),
        Secret::new(jwt(expires_at, tenant)),
        expires_at,
    )
}

pub type TestClient = ArmClient<MemoryCache, ManagedIdentityBroker>;

/// A client pointed at the mock server with a valid cached credential for
/// `cached_tenant`. Its broker endpoint is not mounted, so any acquisition fails.
pub async fn client_with_cached_token(
    server: &MockServer,
    settings: Arc<dyn SettingsStore>,
    cached_tenant: &str,
) -> (TestClient, Credential) {
    let broker = ManagedIdentityBroker::new(
        format!("{}/msi/token", server.uri()),
        "https://management.core.windows.net/",
    );
    let authenticator = TokenAuthenticator::new(MemoryCache::new(), broker, settings);

    let credential = valid_credential(cached_tenant);
    authenticator.store_credential(&credential).await.unwrap();

    let resolver = UrlResolver::parse(&server.uri()).unwrap();
    let http = reqwest::Client::new();
    let client = ArmClient::new(
        authenticator,
        TenantDirectory::new(http.clone(), resolver.clone()),
        RequestDispatcher::new(http, resolver).with_correlation_id(|| "test-correlation".to_string()),
    );

    (client, credential)
}
