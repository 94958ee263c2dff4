//! Per-tenant token cache.
//!
//! Entries are addressed by tenant and [`CredentialKind`]. Two backends exist:
//! - [`MemoryCache`] - process-local, used in tests and as the fallback
//! - [`KeyringCache`] (feature `keyring-store`) - the OS keyring, so tokens
//!   survive between invocations
//!
//! [`create_cache`] picks one. Concurrent invocations sharing the keyring
//! race; the last write wins.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{CredentialKind, TenantId};
use crate::secret::Secret;

mod memory;
#[cfg(feature = "keyring-store")]
mod keyring;

pub use self::memory::MemoryCache;
#[cfg(feature = "keyring-store")]
pub use self::keyring::KeyringCache;

/// Keyring service name all cache entries live under.
pub const KEYRING_SERVICE: &str = "armclient";

/// Error type for token cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend failed to read or write an entry.
    #[error("token cache backend failed on {key}: {message}")]
    Backend { key: String, message: String },

    /// No OS keyring can be reached.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },
}

/// Storage for tenant-scoped credential material.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Load an entry; `None` when nothing is cached.
    async fn load(
        &self,
        tenant: &TenantId,
        kind: CredentialKind,
    ) -> Result<Option<Secret>, CacheError>;

    /// Save an entry, replacing any previous value.
    async fn save(
        &self,
        tenant: &TenantId,
        kind: CredentialKind,
        value: &Secret,
    ) -> Result<(), CacheError>;

    /// Remove an entry. Removing a missing entry succeeds.
    async fn remove(&self, tenant: &TenantId, kind: CredentialKind) -> Result<(), CacheError>;

    /// Remove every entry of a tenant.
    async fn clear_tenant(&self, tenant: &TenantId) -> Result<(), CacheError> {
        for kind in CredentialKind::ALL {
            self.remove(tenant, kind).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TokenCache for Box<dyn TokenCache> {
    async fn load(
        &self,
        tenant: &TenantId,
        kind: CredentialKind,
    ) -> Result<Option<Secret>, CacheError> {
        (**self).load(tenant, kind).await
    }

    async fn save(
        &self,
        tenant: &TenantId,
        kind: CredentialKind,
        value: &Secret,
    ) -> Result<(), CacheError> {
        (**self).save(tenant, kind, value).await
    }

    async fn remove(&self, tenant: &TenantId, kind: CredentialKind) -> Result<(), CacheError> {
        (**self).remove(tenant, kind).await
    }
}

/// Create the token cache.
///
/// With `prefer_keyring` the OS keyring is tried first; when it cannot be
/// reached (or the `keyring-store` feature is off) tokens are kept in memory
/// and every invocation asks the identity broker again.
pub fn create_cache(prefer_keyring: bool) -> Box<dyn TokenCache> {
    if prefer_keyring {
        match keyring_cache() {
            Ok(cache) => return cache,
            Err(e) => tracing::warn!("{}; caching tokens in memory for this invocation", e),
        }
    }

    tracing::debug!("Using in-memory token cache");
    Box::new(MemoryCache::new())
}

#[cfg(feature = "keyring-store")]
fn keyring_cache() -> Result<Box<dyn TokenCache>, CacheError> {
    let cache = KeyringCache::try_new(KEYRING_SERVICE)?;
    tracing::debug!("Using OS keyring for the token cache");
    Ok(Box::new(cache))
}

#[cfg(not(feature = "keyring-store"))]
fn keyring_cache() -> Result<Box<dyn TokenCache>, CacheError> {
    Err(CacheError::KeyringUnavailable {
        message: "built without the keyring-store feature".to_string(),
    })
}
