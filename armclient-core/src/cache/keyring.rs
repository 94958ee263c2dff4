//! OS keyring token cache.

use async_trait::async_trait;
use keyring::Entry;

use super::{CacheError, TokenCache};
use crate::model::{CredentialKind, TenantId};
use crate::secret::Secret;

const AVAILABILITY_KEY: &str = "armclient/availability-check";

/// Token cache in the platform keyring (Keychain, Secret Service, Credential
/// Manager).
///
/// Each entry is stored under the cache's service name with the user
/// `armclient/{tenant}/{kind}`.
#[derive(Debug)]
pub struct KeyringCache {
    service: String,
}

impl KeyringCache {
    /// Open the keyring, failing when no backend keeps what is written.
    ///
    /// A throwaway entry is written, read back through a second handle and
    /// deleted. Backends that accept writes but forget them fail here.
    pub fn try_new(service: &str) -> Result<Self, CacheError> {
        let unavailable = |e: keyring::Error| CacheError::KeyringUnavailable {
            message: e.to_string(),
        };
        let marker = uuid::Uuid::new_v4().to_string();

        Entry::new(service, AVAILABILITY_KEY)
            .and_then(|entry| entry.set_password(&marker))
            .map_err(unavailable)?;
        let read_back = Entry::new(service, AVAILABILITY_KEY).and_then(|entry| entry.get_password());
        let _ = Entry::new(service, AVAILABILITY_KEY).and_then(|entry| entry.delete_credential());

        match read_back {
            Ok(value) if value == marker => Ok(Self {
                service: service.to_string(),
            }),
            Ok(_) => Err(CacheError::KeyringUnavailable {
                message: "keyring returned a different value than was written".to_string(),
            }),
            Err(keyring::Error::NoEntry) => Err(CacheError::KeyringUnavailable {
                message: "keyring does not keep entries".to_string(),
            }),
            Err(e) => Err(unavailable(e)),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, CacheError> {
        Entry::new(&self.service, key).map_err(|e| backend(key, e))
    }
}

fn backend(key: &str, err: keyring::Error) -> CacheError {
    CacheError::Backend {
        key: key.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl TokenCache for KeyringCache {
    async fn load(
        &self,
        tenant: &TenantId,
        kind: CredentialKind,
    ) -> Result<Option<Secret>, CacheError> {
        let key = kind.key_for(tenant);
        match self.entry(&key)?.get_password() {
            Ok(value) => Ok(Some(Secret::new(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(backend(&key, e)),
        }
    }

    async fn save(
        &self,
        tenant: &TenantId,
        kind: CredentialKind,
        value: &Secret,
    ) -> Result<(), CacheError> {
        let key = kind.key_for(tenant);
        self.entry(&key)?
            .set_password(value.expose())
            .map_err(|e| backend(&key, e))
    }

    async fn remove(&self, tenant: &TenantId, kind: CredentialKind) -> Result<(), CacheError> {
        let key = kind.key_for(tenant);
        match self.entry(&key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(backend(&key, e)),
        }
    }
}
