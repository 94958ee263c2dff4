//! Domain model types for armclient.
//!
//! This module defines the core types used throughout the request pipeline:
//! - [`TenantId`] - Identifier for a directory tenant (GUID or domain, or `common`)
//! - [`TenantSelector`] - Either the active tenant or an explicit one
//! - [`Tenant`] - A tenant record returned by the management API
//! - [`CredentialKind`] - Kind of cached credential material

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a directory tenant.
///
/// Tenant ids are compared case-insensitively by the management API, so the
/// id is normalized to lowercase on construction.
///
/// # Examples
///
/// ```
/// use armclient_core::TenantId;
///
/// let tenant = TenantId::new("72F988BF-86F1-41AF-91AB-2D7CD011DB47");
/// assert_eq!(tenant.as_str(), "72f988bf-86f1-41af-91ab-2d7cd011db47");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    /// Create a new tenant id.
    ///
    /// Surrounding whitespace is trimmed and the id is lowercased.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_lowercase())
    }

    /// Get the tenant id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Which tenant a credential should be scoped to.
///
/// `Current` is resolved once, at the authenticator boundary, from the
/// persisted settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantSelector {
    /// The active tenant from the settings store, or the configured default.
    Current,

    /// An explicitly chosen tenant.
    Explicit(TenantId),
}

impl TenantSelector {
    /// Build a selector from an optional command-line value.
    ///
    /// `None`, an empty string and the literal `current` all mean the active tenant.
    pub fn from_option(tenant: Option<&str>) -> Self {
        match tenant.map(str::trim) {
            None | Some("") => Self::Current,
            Some(t) if t.eq_ignore_ascii_case("current") => Self::Current,
            Some(t) => Self::Explicit(TenantId::new(t)),
        }
    }
}

/// A tenant the signed-in identity can access.
///
/// Deserialized from the `value` array of the management API's `/tenants`
/// listing. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    /// The tenant's directory id (GUID).
    pub tenant_id: String,

    /// Human-readable directory name, when the API version returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Primary domain of the directory, when returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_domain: Option<String>,
}

impl Tenant {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            display_name: None,
            default_domain: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Kind of credential material cached per tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Bearer access token (short-lived).
    AccessToken,

    /// Refresh token (long-lived).
    RefreshToken,

    /// Access token expiry, seconds since epoch.
    TokenExpiry,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 3] = [
        Self::AccessToken,
        Self::RefreshToken,
        Self::TokenExpiry,
    ];

    /// Get the credential kind as a string for storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::TokenExpiry => "token_expiry",
        }
    }

    /// Storage key for this kind under the given tenant.
    ///
    /// Keys follow the pattern: `armclient/{tenant}/{kind}`
    pub fn key_for(&self, tenant: &TenantId) -> String {
        format!("armclient/{}/{}", tenant, self.as_str())
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
