//! Top-level error types for armclient.
//!
//! Every failure is classified into one of four kinds (see [`ErrorKind`]):
//! bad user input, authentication, network transport, or settings storage.
//! A non-success HTTP status from the management API is not an error.

use std::path::PathBuf;
use thiserror::Error;

use crate::settings::StorageError;
use crate::token::AuthError;

/// User-fixable input problems, reported before any network call.
#[derive(Debug, Error)]
pub enum InputError {
    /// No resource path was given.
    #[error("no path specified")]
    EmptyPath,

    /// The path could not be turned into a URL.
    #[error("invalid request URL '{input}': {message}")]
    InvalidUrl { input: String, message: String },

    /// A `Name=Value` header argument could not be parsed.
    #[error("cannot parse specified header '{header}'. Value must be in format Header=Value")]
    MalformedHeader { header: String },

    /// A `@file` body reference points at nothing.
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// A `@file` body reference exists but could not be read.
    #[error("failed to read file: {}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tenant id is not among the tenants the identity can access.
    #[error("you don't have access to specified tenant: {tenant}")]
    UnknownTenant { tenant: String },

    /// The HTTP verb is not one of GET, HEAD, PUT, PATCH, DELETE, POST.
    #[error("unsupported HTTP verb: {verb}")]
    UnknownVerb { verb: String },
}

/// Transport-level failures reaching a remote endpoint.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// DNS, connection, TLS or body-read failure.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// A fixed resource answered with a status the caller cannot interpret.
    #[error("{url} returned unexpected status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The response body did not have the expected shape.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// A paged listing pointed somewhere it must not be followed.
    #[error("stopped paging at {url}: {message}")]
    Paging { url: String, message: String },
}

impl NetworkError {
    pub(crate) fn transport(url: impl Into<String>, err: &reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }
}

/// Coarse classification of an [`ArmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Auth,
    Network,
    Storage,
}

/// Top-level error type encompassing all armclient errors.
#[derive(Debug, Error)]
pub enum ArmError {
    /// Bad path, malformed header, missing or unreadable body file.
    #[error(transparent)]
    InvalidInput(#[from] InputError),

    /// No session, unrefreshable or malformed credential, rejected credential.
    #[error(transparent)]
    Auth(AuthError),

    /// Transport failure reaching the identity endpoint or the management API.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Settings persistence failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ArmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Network(_) => ErrorKind::Network,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<AuthError> for ArmError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unreachable { endpoint, message } => {
                Self::Network(NetworkError::Transport {
                    url: endpoint,
                    message,
                })
            }
            AuthError::Settings(e) => Self::Storage(e),
            other => Self::Auth(other),
        }
    }
}
