//! # armclient Core
//!
//! Core library for armclient, a command-line client for the Azure Resource
//! Manager REST API.
//!
//! This crate provides:
//! - Tenant-scoped bearer credentials with caching and refresh ([`TokenAuthenticator`])
//! - Tenant discovery and validation ([`TenantDirectory`])
//! - Resource path resolution ([`UrlResolver`])
//! - Request dispatch with caller headers and file bodies ([`RequestDispatcher`])
//! - Persisted active-tenant settings ([`SettingsStore`])
//! - In-memory and (optionally) keyring-based token caches
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use armclient_core::{ArmClient, RequestSpec, TenantSelector, Verb};
//!
//! async fn subscriptions(client: &armclient_core::DynArmClient) -> Result<String, armclient_core::ArmError> {
//!     let spec = RequestSpec::new(Verb::Get, "/subscriptions?api-version=2020-01-01");
//!     let response = client.request(&spec, &TenantSelector::Current).await?;
//!     Ok(response.body_text())
//! }
//! ```

pub mod authenticator;
pub mod broker;
pub mod cache;
pub mod client;
pub mod cloud;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod request;
pub mod resolve;
pub mod secret;
pub mod settings;
pub mod token;

// Re-export commonly used types at crate root
pub use model::{
    CredentialKind,
    Tenant,
    TenantId,
    TenantSelector,
};

pub use cache::{
    CacheError,
    MemoryCache,
    TokenCache,
    create_cache,
};

#[cfg(feature = "keyring-store")]
pub use cache::KeyringCache;

pub use secret::Secret;

pub use settings::{
    FileSettingsStore,
    MemorySettingsStore,
    Settings,
    SettingsStore,
    StorageError,
};

pub use token::{
    AuthError,
    Credential,
    TokenClaims,
    decode_payload,
};

pub use broker::{
    AcquiredToken,
    BrokerKind,
    IdentityBroker,
    ManagedIdentityBroker,
    create_broker,
};

#[cfg(feature = "oauth")]
pub use broker::OAuthRefreshBroker;

pub use cloud::{
    CloudEnvironment,
    CloudRegistry,
};

pub use authenticator::TokenAuthenticator;
pub use directory::{TenantDirectory, validate_tenant};
pub use resolve::UrlResolver;
pub use request::{BodySource, HeaderPair, RequestSpec, Verb, read_body_argument};
pub use dispatch::{RequestDispatcher, ResponseResult};
pub use client::{ArmClient, DynArmClient};

pub use error::{
    ArmError,
    ErrorKind,
    InputError,
    NetworkError,
};
