//! Cloud environment configuration and registry.
//!
//! This module provides:
//! - [`CloudEnvironment`] - Endpoints of one Azure cloud
//! - [`CloudRegistry`] - Registry of known clouds, looked up by name
//!
//! The registry comes pre-configured with the public, China and US
//! Government clouds and can be extended with custom environments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::TenantId;

/// Public client id used for refresh-token exchange (Azure PowerShell).
pub const DEFAULT_CLIENT_ID: &str = "1950a258-227b-4e31-a9cf-717495945fc2";

/// Name of the cloud used when none is configured.
pub const DEFAULT_CLOUD: &str = "AzureCloud";

/// Endpoints of an Azure cloud.
///
/// # Example
///
/// ```
/// use armclient_core::cloud::CloudRegistry;
///
/// let registry = CloudRegistry::with_defaults();
/// let cloud = registry.get("azurecloud").unwrap();
/// assert_eq!(cloud.resource_manager, "https://management.azure.com");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudEnvironment {
    /// Name of the cloud (e.g., "AzureCloud").
    pub name: String,

    /// Identity authority host, without trailing slash.
    pub authority_host: String,

    /// Resource Manager endpoint requests are sent to.
    pub resource_manager: String,

    /// Audience tokens are requested for.
    pub resource: String,

    /// Public client id used against the authority.
    pub client_id: String,
}

impl CloudEnvironment {
    /// Create a new cloud environment with the default client id.
    pub fn new(
        name: impl Into<String>,
        authority_host: impl Into<String>,
        resource_manager: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            authority_host: authority_host.into(),
            resource_manager: resource_manager.into(),
            resource: resource.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }

    /// Set the client id.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// OAuth 2.0 token endpoint for a tenant.
    pub fn token_url(&self, tenant: &TenantId) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            tenant
        )
    }

    /// OAuth 2.0 authorization endpoint for a tenant.
    pub fn authorize_url(&self, tenant: &TenantId) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.authority_host.trim_end_matches('/'),
            tenant
        )
    }

    /// The `.default` scope of the management resource.
    pub fn default_scope(&self) -> String {
        format!("{}/.default", self.resource.trim_end_matches('/'))
    }
}

/// Registry of cloud environments.
///
/// Names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct CloudRegistry {
    clouds: BTreeMap<String, CloudEnvironment>,
}

impl CloudRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the well-known Azure clouds registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(CloudEnvironment::new(
            "AzureCloud",
            "https://login.microsoftonline.com",
            "https://management.azure.com",
            "https://management.core.windows.net/",
        ));

        registry.register(CloudEnvironment::new(
            "AzureChinaCloud",
            "https://login.chinacloudapi.cn",
            "https://management.chinacloudapi.cn",
            "https://management.core.chinacloudapi.cn/",
        ));

        registry.register(CloudEnvironment::new(
            "AzureUSGovernment",
            "https://login.microsoftonline.us",
            "https://management.usgovcloudapi.net",
            "https://management.core.usgovcloudapi.net/",
        ));

        registry
    }

    /// Register a cloud; an existing cloud with the same name is replaced.
    pub fn register(&mut self, cloud: CloudEnvironment) {
        self.clouds.insert(cloud.name.to_lowercase(), cloud);
    }

    /// Look up a cloud by name.
    pub fn get(&self, name: &str) -> Option<&CloudEnvironment> {
        self.clouds.get(&name.to_lowercase())
    }

    /// Names of all registered clouds.
    pub fn names(&self) -> Vec<&str> {
        self.clouds.values().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let registry = CloudRegistry::with_defaults();
        assert_eq!(registry.names().len(), 3);
        assert!(registry.get("AzureUSGovernment").is_some());
        assert!(registry.get("azurechinacloud").is_some());
        assert!(registry.get("mooncake").is_none());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = CloudRegistry::with_defaults();
        registry.register(
            CloudEnvironment::new("azurecloud", "http://a", "http://m", "http://r/")
                .with_client_id("custom"),
        );

        let cloud = registry.get("AzureCloud").unwrap();
        assert_eq!(cloud.client_id, "custom");
        assert_eq!(registry.names().len(), 3);
    }

    #[test]
    fn test_endpoints() {
        let registry = CloudRegistry::with_defaults();
        let cloud = registry.get(DEFAULT_CLOUD).unwrap();
        let tenant = TenantId::new("common");

        assert_eq!(
            cloud.token_url(&tenant),
            "https://login.microsoftonline.com/common/oauth2/v2.0/token"
        );
        assert_eq!(
            cloud.default_scope(),
            "https://management.core.windows.net/.default"
        );
    }
}
