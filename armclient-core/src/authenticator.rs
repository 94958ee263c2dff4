//! Tenant-scoped bearer credentials with caching and refresh.
//!
//! [`TokenAuthenticator`] resolves which tenant a request runs under, returns
//! a cached credential while it is still valid, and otherwise asks its
//! [`IdentityBroker`] for a fresh one.
//!
//! # Credential lifecycle (per tenant)
//!
//! `Uncached -> Cached(valid) -> Cached(expired) -> Refreshing -> Cached(valid)`,
//! or `Refreshing -> Failed`, surfaced as [`AuthError`]. A cached credential
//! turns expired purely by the passing of time; the expiry skew is subtracted
//! so a token does not run out mid-request.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use armclient_core::{
//!     MemoryCache, MemorySettingsStore, TenantSelector, TokenAuthenticator,
//!     broker::ManagedIdentityBroker,
//! };
//!
//! let broker = ManagedIdentityBroker::new(
//!     "http://localhost:50342/oauth2/token",
//!     "https://management.core.windows.net/",
//! );
//! let authenticator = TokenAuthenticator::new(
//!     MemoryCache::new(),
//!     broker,
//!     Arc::new(MemorySettingsStore::new()),
//! );
//!
//! let credential = authenticator.get_token(&TenantSelector::Current).await?;
//! println!("token for {} expires at {}", credential.tenant_id, credential.expires_at);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Duration};
use std::sync::Arc;

use crate::broker::IdentityBroker;
use crate::cache::TokenCache;
use crate::model::{CredentialKind, TenantId, TenantSelector};
use crate::secret::Secret;
use crate::settings::SettingsStore;
use crate::token::{AuthError, Credential};

/// Default expiry skew in seconds.
///
/// Tokens are treated as expired this long before their `exp` claim.
pub const DEFAULT_EXPIRY_SKEW_SECS: i64 = 300;

/// Tenant used when no active tenant was ever selected.
pub const DEFAULT_TENANT: &str = "common";

/// Resolves and caches bearer credentials.
///
/// # Type Parameters
///
/// * `S` - The per-tenant token cache
/// * `B` - The identity broker fresh tokens are acquired from
pub struct TokenAuthenticator<S: TokenCache, B: IdentityBroker> {
    cache: S,
    broker: B,
    settings: Arc<dyn SettingsStore>,
    default_tenant: TenantId,
    skew: Duration,
}

impl<S: TokenCache, B: IdentityBroker> TokenAuthenticator<S, B> {
    /// Create a new authenticator with the default skew and default tenant.
    pub fn new(cache: S, broker: B, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            cache,
            broker,
            settings,
            default_tenant: TenantId::new(DEFAULT_TENANT),
            skew: Duration::seconds(DEFAULT_EXPIRY_SKEW_SECS),
        }
    }

    /// Use a custom expiry skew.
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    /// Use a custom tenant when no active tenant is set.
    pub fn with_default_tenant(mut self, tenant: TenantId) -> Self {
        self.default_tenant = tenant;
        self
    }

    /// The token cache.
    pub fn cache(&self) -> &S {
        &self.cache
    }

    /// The settings store the active tenant is read from.
    pub fn settings(&self) -> &Arc<dyn SettingsStore> {
        &self.settings
    }

    /// Resolve a selector to a concrete tenant.
    ///
    /// `Current` reads the settings store once; an unset active tenant falls
    /// back to the default tenant.
    pub fn resolve_tenant(&self, selector: &TenantSelector) -> Result<TenantId, AuthError> {
        match selector {
            TenantSelector::Explicit(tenant) => Ok(tenant.clone()),
            TenantSelector::Current => {
                let settings = self.settings.read()?;
                Ok(settings
                    .active_tenant()
                    .map(TenantId::new)
                    .unwrap_or_else(|| self.default_tenant.clone()))
            }
        }
    }

    /// Get a usable credential, acquiring a fresh one if needed.
    ///
    /// A cached credential is returned unchanged while `now < expires_at - skew`.
    /// Anything else goes to the identity broker, with the cached refresh token
    /// when there is one. Failures are not retried.
    pub async fn get_token(&self, selector: &TenantSelector) -> Result<Credential, AuthError> {
        let tenant = self.resolve_tenant(selector)?;

        let cached = self.cached_credential(&tenant).await?;
        if let Some(credential) = &cached {
            if credential.is_usable(self.skew) {
                tracing::debug!("Using cached access token for tenant {}", tenant);
                return Ok(credential.clone());
            }

            tracing::info!(
                "Access token for tenant {} expired at {}, refreshing",
                tenant,
                credential.expires_at
            );
        }

        let refresh_token = self
            .cache
            .load(&tenant, CredentialKind::RefreshToken)
            .await?;

        let acquired = match self
            .broker
            .acquire_for_tenant(&tenant, refresh_token.as_ref())
            .await
        {
            Ok(acquired) => acquired,
            Err(e) => {
                tracing::error!(
                    "Failed to acquire token for tenant {} via {}: {}",
                    tenant,
                    self.broker.name(),
                    e
                );
                return Err(e);
            }
        };

        let credential = Credential::from_access_token(
            tenant.clone(),
            acquired.access_token,
            acquired.refresh_token.or(refresh_token),
        )?;

        if let Some(issued_for) = foreign_tenant(&tenant, &credential)? {
            tracing::warn!(
                "{} issued a token for tenant {} when {} was requested; not using it",
                self.broker.name(),
                issued_for,
                tenant
            );
            return Err(AuthError::NoSession {
                tenant: tenant.to_string(),
            });
        }

        self.store_credential(&credential).await?;

        tracing::info!(
            "Acquired access token for tenant {} via {}, valid until {}",
            tenant,
            self.broker.name(),
            credential.expires_at
        );

        Ok(credential)
    }

    /// Read the cached credential for a tenant without refreshing.
    ///
    /// Returns `None` when no access token is cached or its expiry is unknown.
    pub async fn cached_credential(
        &self,
        tenant: &TenantId,
    ) -> Result<Option<Credential>, AuthError> {
        let access_token = match self.cache.load(tenant, CredentialKind::AccessToken).await? {
            Some(token) => token,
            None => return Ok(None),
        };

        let expires_at = self
            .cache
            .load(tenant, CredentialKind::TokenExpiry)
            .await?
            .and_then(|secret| secret.expose().parse::<i64>().ok())
            .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0));

        let Some(expires_at) = expires_at else {
            tracing::debug!("Cached token for tenant {} has no expiry, ignoring it", tenant);
            return Ok(None);
        };

        let mut credential = Credential::with_expiry(tenant.clone(), access_token, expires_at);
        if let Some(refresh) = self.cache.load(tenant, CredentialKind::RefreshToken).await? {
            credential = credential.with_refresh_token(refresh);
        }

        Ok(Some(credential))
    }

    /// Store a credential in the cache under its tenant.
    pub async fn store_credential(&self, credential: &Credential) -> Result<(), AuthError> {
        let tenant = &credential.tenant_id;

        self.cache
            .save(tenant, CredentialKind::AccessToken, &credential.access_token)
            .await?;

        let expiry = Secret::new(credential.expires_at.timestamp().to_string());
        self.cache
            .save(tenant, CredentialKind::TokenExpiry, &expiry)
            .await?;

        if let Some(refresh_token) = &credential.refresh_token {
            self.cache
                .save(tenant, CredentialKind::RefreshToken, refresh_token)
                .await?;
        }

        tracing::debug!("Stored credential for tenant {}", tenant);
        Ok(())
    }
}

/// Tenant names that stand for "whichever tenant signs in".
const TENANT_ALIASES: [&str; 3] = ["common", "organizations", "consumers"];

/// The `tid` of a credential when it names a tenant other than `requested`.
///
/// Aliases and domain names cannot be compared against a directory id and
/// are accepted as-is, as are tokens without a `tid` claim.
fn foreign_tenant(
    requested: &TenantId,
    credential: &Credential,
) -> Result<Option<String>, AuthError> {
    let requested = requested.as_str();
    if TENANT_ALIASES.contains(&requested) || requested.contains('.') {
        return Ok(None);
    }

    Ok(credential
        .claims()?
        .tid
        .filter(|tid| !tid.eq_ignore_ascii_case(requested)))
}
