//! Identity brokers: where fresh access tokens come from.
//!
//! armclient does not run interactive sign-in. It relies on an existing
//! session exposed by one of these brokers:
//! - [`OAuthRefreshBroker`] (feature `oauth`) - exchanges a refresh token at
//!   the cloud's token endpoint
//! - [`ManagedIdentityBroker`] - asks a managed identity endpoint, as found in
//!   Azure Cloud Shell via `MSI_ENDPOINT`
//!
//! [`create_broker`] picks one from configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cloud::CloudEnvironment;
use crate::model::TenantId;
use crate::secret::Secret;
use crate::token::AuthError;

/// Environment variable holding a refresh token to seed the cache with.
pub const REFRESH_TOKEN_ENV: &str = "ARMCLIENT_REFRESH_TOKEN";

/// Environment variable Cloud Shell sets to its managed identity endpoint.
pub const MSI_ENDPOINT_ENV: &str = "MSI_ENDPOINT";

/// Token material handed back by a broker.
#[derive(Debug, Clone)]
pub struct AcquiredToken {
    pub access_token: Secret,
    pub refresh_token: Option<Secret>,
}

/// Source of access tokens for a tenant.
#[async_trait]
pub trait IdentityBroker: Send + Sync {
    /// Acquire an access token scoped to `tenant`.
    ///
    /// `refresh_token` is the cached refresh material for that tenant, if any.
    async fn acquire_for_tenant(
        &self,
        tenant: &TenantId,
        refresh_token: Option<&Secret>,
    ) -> Result<AcquiredToken, AuthError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl IdentityBroker for Box<dyn IdentityBroker> {
    async fn acquire_for_tenant(
        &self,
        tenant: &TenantId,
        refresh_token: Option<&Secret>,
    ) -> Result<AcquiredToken, AuthError> {
        (**self).acquire_for_tenant(tenant, refresh_token).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Which broker to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrokerKind {
    /// Managed identity when `MSI_ENDPOINT` is set, refresh-token exchange otherwise.
    #[default]
    Auto,
    #[serde(rename = "oauth")]
    OAuth,
    ManagedIdentity,
}

/// Create the identity broker selected by `kind`.
pub fn create_broker(
    kind: BrokerKind,
    cloud: &CloudEnvironment,
) -> Result<Box<dyn IdentityBroker>, AuthError> {
    let msi_endpoint = std::env::var(MSI_ENDPOINT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty());

    match (kind, msi_endpoint) {
        (BrokerKind::ManagedIdentity | BrokerKind::Auto, Some(endpoint)) => {
            tracing::debug!("Using managed identity endpoint {}", endpoint);
            Ok(Box::new(ManagedIdentityBroker::new(endpoint, &cloud.resource)))
        }
        (BrokerKind::ManagedIdentity, None) => Err(AuthError::BrokerUnavailable {
            message: format!("{} is not set", MSI_ENDPOINT_ENV),
        }),
        (BrokerKind::OAuth | BrokerKind::Auto, _) => oauth_broker(cloud),
    }
}

#[cfg(feature = "oauth")]
fn oauth_broker(cloud: &CloudEnvironment) -> Result<Box<dyn IdentityBroker>, AuthError> {
    Ok(Box::new(OAuthRefreshBroker::from_env(cloud.clone())))
}

#[cfg(not(feature = "oauth"))]
fn oauth_broker(_cloud: &CloudEnvironment) -> Result<Box<dyn IdentityBroker>, AuthError> {
    Err(AuthError::BrokerUnavailable {
        message: "OAuth feature not enabled and no managed identity endpoint found".to_string(),
    })
}

#[cfg(feature = "oauth")]
pub use self::oauth::OAuthRefreshBroker;

#[cfg(feature = "oauth")]
mod oauth {
    use async_trait::async_trait;
    use oauth2::{
        AuthType, AuthUrl, ClientId, RefreshToken, RequestTokenError, Scope, TokenResponse,
        TokenUrl, basic::BasicClient, reqwest::async_http_client,
    };

    use super::{AcquiredToken, IdentityBroker, REFRESH_TOKEN_ENV};
    use crate::cloud::CloudEnvironment;
    use crate::model::TenantId;
    use crate::secret::Secret;
    use crate::token::AuthError;

    /// Refresh-token exchange against the cloud's OAuth 2.0 token endpoint.
    ///
    /// The refresh token is the cached one for the tenant, or else the seed
    /// given at construction (usually from `ARMCLIENT_REFRESH_TOKEN`). Refresh
    /// tokens issued for one tenant are accepted by the authority for every
    /// other tenant of the same account.
    pub struct OAuthRefreshBroker {
        cloud: CloudEnvironment,
        seed_refresh_token: Option<Secret>,
    }

    impl OAuthRefreshBroker {
        pub fn new(cloud: CloudEnvironment) -> Self {
            Self {
                cloud,
                seed_refresh_token: None,
            }
        }

        /// Seed the broker from `ARMCLIENT_REFRESH_TOKEN` when set.
        pub fn from_env(cloud: CloudEnvironment) -> Self {
            let seed = std::env::var(REFRESH_TOKEN_ENV)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(Secret::new);
            Self {
                cloud,
                seed_refresh_token: seed,
            }
        }

        pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
            self.seed_refresh_token = Some(Secret::new(refresh_token));
            self
        }

        fn client(&self, tenant: &TenantId) -> Result<BasicClient, AuthError> {
            let auth_url = AuthUrl::new(self.cloud.authorize_url(tenant)).map_err(|e| {
                AuthError::BrokerUnavailable {
                    message: format!("invalid authorize URL: {}", e),
                }
            })?;
            let token_url = TokenUrl::new(self.cloud.token_url(tenant)).map_err(|e| {
                AuthError::BrokerUnavailable {
                    message: format!("invalid token URL: {}", e),
                }
            })?;

            Ok(BasicClient::new(
                ClientId::new(self.cloud.client_id.clone()),
                None,
                auth_url,
                Some(token_url),
            )
            .set_auth_type(AuthType::RequestBody))
        }
    }

    #[async_trait]
    impl IdentityBroker for OAuthRefreshBroker {
        async fn acquire_for_tenant(
            &self,
            tenant: &TenantId,
            refresh_token: Option<&Secret>,
        ) -> Result<AcquiredToken, AuthError> {
            let refresh_token = refresh_token
                .or(self.seed_refresh_token.as_ref())
                .ok_or_else(|| AuthError::NoSession {
                    tenant: tenant.to_string(),
                })?;

            let client = self.client(tenant)?;
            let response = client
                .exchange_refresh_token(&RefreshToken::new(refresh_token.expose().to_string()))
                .add_scope(Scope::new(self.cloud.default_scope()))
                .add_scope(Scope::new("offline_access".to_string()))
                .request_async(async_http_client)
                .await
                .map_err(|e| match e {
                    RequestTokenError::Request(err) => AuthError::Unreachable {
                        endpoint: self.cloud.token_url(tenant),
                        message: err.to_string(),
                    },
                    RequestTokenError::ServerResponse(err) => AuthError::Rejected {
                        tenant: tenant.to_string(),
                        message: err.to_string(),
                    },
                    RequestTokenError::Parse(err, _) => AuthError::Rejected {
                        tenant: tenant.to_string(),
                        message: format!("unreadable token response: {}", err),
                    },
                    RequestTokenError::Other(message) => AuthError::Rejected {
                        tenant: tenant.to_string(),
                        message,
                    },
                })?;

            // keep the old refresh token when the authority does not rotate it
            let refresh_token = response
                .refresh_token()
                .map(|t| Secret::new(t.secret().as_str()))
                .unwrap_or_else(|| refresh_token.clone());

            Ok(AcquiredToken {
                access_token: Secret::new(response.access_token().secret().as_str()),
                refresh_token: Some(refresh_token),
            })
        }

        fn name(&self) -> &'static str {
            "oauth-refresh"
        }
    }
}

/// Token response of a managed identity endpoint.
#[derive(Debug, Deserialize)]
struct ManagedIdentityResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Managed identity token endpoint, as exposed by Azure Cloud Shell.
///
/// The endpoint always answers for the signed-in account's home tenant.
pub struct ManagedIdentityBroker {
    endpoint: String,
    resource: String,
    http_client: reqwest::Client,
}

impl ManagedIdentityBroker {
    pub fn new(endpoint: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            resource: resource.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl IdentityBroker for ManagedIdentityBroker {
    async fn acquire_for_tenant(
        &self,
        tenant: &TenantId,
        _refresh_token: Option<&Secret>,
    ) -> Result<AcquiredToken, AuthError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("resource", &self.resource)
            .finish();

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("Metadata", "true")
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::Unreachable {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| AuthError::Unreachable {
            endpoint: self.endpoint.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(AuthError::Rejected {
                tenant: tenant.to_string(),
                message: format!("managed identity endpoint returned {}: {}", status, text),
            });
        }

        let token: ManagedIdentityResponse =
            serde_json::from_str(&text).map_err(|e| AuthError::Rejected {
                tenant: tenant.to_string(),
                message: format!("unreadable managed identity response: {}", e),
            })?;

        Ok(AcquiredToken {
            access_token: Secret::new(token.access_token),
            refresh_token: token.refresh_token.map(Secret::new),
        })
    }

    fn name(&self) -> &'static str {
        "managed-identity"
    }
}
