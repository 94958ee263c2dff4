//! Resource path resolution.
//!
//! [`UrlResolver`] turns what the user typed into a full management API URL.
//! Absolute `http`/`https` URLs pass through; anything else is a path relative
//! to the API base. No `api-version` is ever appended.

use url::Url;

use crate::error::InputError;

/// Management API base used when none is configured.
pub const DEFAULT_API_BASE: &str = "https://management.azure.com";

/// Resolves user-supplied resource paths against a base URL.
#[derive(Debug, Clone)]
pub struct UrlResolver {
    base: String,
}

impl UrlResolver {
    pub fn new(base: Url) -> Self {
        Self {
            base: base.as_str().trim_end_matches('/').to_string(),
        }
    }

    /// Create a resolver from a base URL string.
    pub fn parse(base: &str) -> Result<Self, InputError> {
        let base = Url::parse(base.trim()).map_err(|e| InputError::InvalidUrl {
            input: base.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(base))
    }

    /// The base URL, without trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve `user_path` into a URL.
    ///
    /// `"/foo"`, `"//foo"` and `"foo"` all resolve to `{base}/foo`. Query
    /// strings are kept as given.
    pub fn resolve(&self, user_path: &str) -> Result<Url, InputError> {
        let input = user_path.trim();
        if input.is_empty() {
            return Err(InputError::EmptyPath);
        }

        if let Some(url) = absolute_url(input) {
            return Ok(url);
        }

        let joined = format!(
            "{}/{}",
            self.base,
            input.trim_start_matches('/')
        );

        Url::parse(&joined).map_err(|e| InputError::InvalidUrl {
            input: input.to_string(),
            message: e.to_string(),
        })
    }
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self {
            base: DEFAULT_API_BASE.to_string(),
        }
    }
}

/// An `http`/`https` URL, in the parser's normal form.
///
/// The parser adds `/` to a bare host, percent-encodes and drops dot
/// segments, so the URL sent may differ textually from the input.
fn absolute_url(input: &str) -> Option<Url> {
    let url = Url::parse(input).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
