//! Request description: verb, path, body and caller headers.
//!
//! Everything here is validated before any network call is made.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::InputError;

/// HTTP verbs the management API is driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Head,
    Put,
    Patch,
    Delete,
    Post,
}

impl Verb {
    pub const ALL: [Verb; 6] = [
        Verb::Get,
        Verb::Head,
        Verb::Put,
        Verb::Patch,
        Verb::Delete,
        Verb::Post,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Post => "POST",
        }
    }

    /// Whether a body is sent with this verb when one is supplied.
    pub fn carries_body(&self) -> bool {
        match self {
            Verb::Put | Verb::Post | Verb::Patch => true,
            Verb::Get | Verb::Head | Verb::Delete => false,
        }
    }

    pub fn method(&self) -> reqwest::Method {
        match self {
            Verb::Get => reqwest::Method::GET,
            Verb::Head => reqwest::Method::HEAD,
            Verb::Put => reqwest::Method::PUT,
            Verb::Patch => reqwest::Method::PATCH,
            Verb::Delete => reqwest::Method::DELETE,
            Verb::Post => reqwest::Method::POST,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InputError::UnknownVerb {
                verb: s.to_string(),
            })
    }
}

/// A caller-supplied header given as `Name=Value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

impl HeaderPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse `Name=Value`, splitting on the first `=` only.
    ///
    /// `"X-Y=1=2"` yields name `X-Y` and value `1=2`. Whitespace is trimmed
    /// from the name only; the value is kept verbatim. The name and value
    /// must also be valid in an HTTP header.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let malformed = || InputError::MalformedHeader {
            header: raw.to_string(),
        };

        let (name, value) = raw.split_once('=').ok_or_else(malformed)?;
        let name = name.trim();
        if name.is_empty()
            || reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err()
            || reqwest::header::HeaderValue::from_str(value).is_err()
        {
            return Err(malformed());
        }

        Ok(Self::new(name, value))
    }
}

impl FromStr for HeaderPair {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Where a request body came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    /// The argument text itself.
    Literal(String),
    /// Contents of a file given as `@path`.
    File { path: PathBuf, contents: Vec<u8> },
}

impl BodySource {
    pub fn bytes(&self) -> &[u8] {
        match self {
            BodySource::Literal(text) => text.as_bytes(),
            BodySource::File { contents, .. } => contents,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            BodySource::Literal(text) => text.into_bytes(),
            BodySource::File { contents, .. } => contents,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, BodySource::Literal(_))
    }
}

/// Interpret a body argument.
///
/// `@path` reads the file at `path` (one pair of surrounding quotes is
/// stripped, relative paths are made absolute). Anything else is the body.
pub fn read_body_argument(arg: &str) -> Result<BodySource, InputError> {
    let Some(reference) = arg.strip_prefix('@') else {
        return Ok(BodySource::Literal(arg.to_string()));
    };

    let path = absolute_path(strip_quotes(reference.trim()))?;

    match path.try_exists() {
        Ok(true) => {}
        Ok(false) => return Err(InputError::FileNotFound { path }),
        Err(source) => return Err(InputError::ReadFailure { path, source }),
    }

    let contents = std::fs::read(&path).map_err(|source| InputError::ReadFailure {
        path: path.clone(),
        source,
    })?;

    tracing::debug!("Read {} byte body from {}", contents.len(), path.display());
    Ok(BodySource::File { path, contents })
}

fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix(['\'', '"']).unwrap_or(s);
    s.strip_suffix(['\'', '"']).unwrap_or(s)
}

fn absolute_path(raw: &str) -> Result<PathBuf, InputError> {
    if raw.is_empty() {
        return Err(InputError::FileNotFound {
            path: PathBuf::new(),
        });
    }
    std::path::absolute(Path::new(raw)).map_err(|source| InputError::ReadFailure {
        path: PathBuf::from(raw),
        source,
    })
}

/// Everything needed to issue one management API request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub verb: Verb,
    pub path: String,
    pub body: Option<Vec<u8>>,
    /// Applied in order; the last header with a given name wins.
    pub extra_headers: Vec<HeaderPair>,
}

impl RequestSpec {
    pub fn new(verb: Verb, path: impl Into<String>) -> Self {
        Self {
            verb,
            path: path.into(),
            body: None,
            extra_headers: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, header: HeaderPair) -> Self {
        self.extra_headers.push(header);
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = HeaderPair>) -> Self {
        self.extra_headers.extend(headers);
        self
    }

    /// The body that will actually be sent, if any.
    pub fn effective_body(&self) -> Option<&[u8]> {
        if self.verb.carries_body() {
            self.body.as_deref()
        } else {
            None
        }
    }
}
