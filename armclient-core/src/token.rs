//! Bearer credentials and token payload decoding.
//!
//! This module provides:
//! - [`Credential`] - A tenant-scoped bearer token with its expiry
//! - [`TokenClaims`] - The subset of JWT payload claims armclient reads
//! - [`decode_payload`] - Decode the middle segment of a JWT without verifying it
//! - [`AuthError`] - Errors raised while obtaining or inspecting credentials

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::CacheError;
use crate::model::TenantId;
use crate::secret::Secret;
use crate::settings::StorageError;

/// Error type for credential operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No signed-in session exists for the tenant.
    #[error("no session for tenant '{tenant}'; sign in first or set ARMCLIENT_REFRESH_TOKEN")]
    NoSession { tenant: String },

    /// The identity broker refused to issue a token.
    #[error("identity broker rejected token request for tenant '{tenant}': {message}")]
    Rejected { tenant: String, message: String },

    /// The management API refused the credential.
    #[error("credential rejected with status {status}: {message}")]
    Unauthorized { status: u16, message: String },

    /// The access token is not a three-segment JWT with a readable payload.
    #[error("malformed token: {message}")]
    MalformedToken { message: String },

    /// The identity endpoint could not be reached.
    #[error("identity endpoint {endpoint} unreachable: {message}")]
    Unreachable { endpoint: String, message: String },

    /// No identity broker can run in this environment.
    #[error("identity broker unavailable: {message}")]
    BrokerUnavailable { message: String },

    /// Token cache error.
    #[error("token cache error: {0}")]
    Cache(#[from] CacheError),

    /// Settings could not be read while resolving the active tenant.
    #[error(transparent)]
    Settings(#[from] StorageError),
}

/// Claims read from an access token payload.
///
/// Only `exp` is required. All other claims are kept in `extra` so the full
/// payload can be displayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since epoch.
    pub exp: i64,

    /// Tenant the token was issued in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,

    /// Object id of the signed-in principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_name: Option<String>,

    /// Audience, the management resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenClaims {
    /// Decode the claims of a JWT access token.
    pub fn from_token(token: &str) -> Result<Self, AuthError> {
        let payload = decode_payload(token)?;
        serde_json::from_value(payload).map_err(|e| AuthError::MalformedToken {
            message: format!("invalid token claims: {}", e),
        })
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> Result<DateTime<Utc>, AuthError> {
        DateTime::from_timestamp(self.exp, 0).ok_or_else(|| AuthError::MalformedToken {
            message: format!("expiry claim out of range: {}", self.exp),
        })
    }

    /// Best available display name of the signed-in principal.
    pub fn principal(&self) -> Option<&str> {
        self.upn.as_deref().or(self.unique_name.as_deref())
    }
}

/// Decode the payload segment of a JWT into JSON.
///
/// The signature is not verified. Both padded and unpadded base64url are
/// accepted. Tokens without exactly three segments are rejected.
pub fn decode_payload(token: &str) -> Result<serde_json::Value, AuthError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::MalformedToken {
            message: format!("expected 3 segments, got {}", segments.len()),
        });
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| AuthError::MalformedToken {
            message: format!("invalid payload encoding: {}", e),
        })?;

    serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken {
        message: format!("payload is not JSON: {}", e),
    })
}

/// A bearer credential scoped to one tenant.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Tenant this credential was acquired for.
    pub tenant_id: TenantId,

    /// The JWT access token.
    pub access_token: Secret,

    /// Expiry taken from the token's `exp` claim.
    pub expires_at: DateTime<Utc>,

    /// Refresh material, when the broker hands one out.
    pub refresh_token: Option<Secret>,
}

impl Credential {
    /// Build a credential from a freshly acquired token.
    ///
    /// The expiry is read from the token payload; a token whose payload cannot
    /// be decoded is rejected.
    pub fn from_access_token(
        tenant_id: TenantId,
        access_token: Secret,
        refresh_token: Option<Secret>,
    ) -> Result<Self, AuthError> {
        let expires_at = TokenClaims::from_token(access_token.expose())?.expires_at()?;
        Ok(Self {
            tenant_id,
            access_token,
            expires_at,
            refresh_token,
        })
    }

    /// Build a credential with a known expiry, as read back from the cache.
    pub fn with_expiry(
        tenant_id: TenantId,
        access_token: Secret,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            access_token,
            expires_at,
            refresh_token: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: Secret) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }

    /// Whether the token is past its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    /// Whether the token may still be used, keeping `skew` in reserve.
    pub fn is_usable(&self, skew: Duration) -> bool {
        Utc::now() < self.expires_at - skew
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose())
    }

    /// Decode this credential's claims.
    pub fn claims(&self) -> Result<TokenClaims, AuthError> {
        TokenClaims::from_token(self.access_token.expose())
    }
}
