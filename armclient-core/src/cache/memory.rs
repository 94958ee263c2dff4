//! Process-local token cache.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{CacheError, TokenCache};
use crate::model::{CredentialKind, TenantId};
use crate::secret::Secret;

/// Token cache held in memory; gone when the process exits.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<(TenantId, CredentialKind), Secret>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Tenants with at least one cached entry.
    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self
            .entries
            .read()
            .keys()
            .map(|(tenant, _)| tenant.clone())
            .collect();
        tenants.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        tenants.dedup();
        tenants
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.len())
            .finish()
    }
}

#[async_trait]
impl TokenCache for MemoryCache {
    async fn load(
        &self,
        tenant: &TenantId,
        kind: CredentialKind,
    ) -> Result<Option<Secret>, CacheError> {
        Ok(self.entries.read().get(&(tenant.clone(), kind)).cloned())
    }

    async fn save(
        &self,
        tenant: &TenantId,
        kind: CredentialKind,
        value: &Secret,
    ) -> Result<(), CacheError> {
        self.entries
            .write()
            .insert((tenant.clone(), kind), value.clone());
        Ok(())
    }

    async fn remove(&self, tenant: &TenantId, kind: CredentialKind) -> Result<(), CacheError> {
        self.entries.write().remove(&(tenant.clone(), kind));
        Ok(())
    }
}
