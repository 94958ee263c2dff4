//! Request dispatch against the management API.
//!
//! [`RequestDispatcher`] turns a [`RequestSpec`] plus a [`Credential`] into an
//! HTTP round trip. Any status code, 4xx and 5xx included, comes back as a
//! [`ResponseResult`]; only transport failures are errors.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT as UA,
};

use crate::error::{ArmError, InputError, NetworkError};
use crate::request::{HeaderPair, RequestSpec};
use crate::resolve::UrlResolver;
use crate::token::Credential;

/// Client identification sent with every request.
pub const USER_AGENT: &str = concat!("armclient-rs/", env!("CARGO_PKG_VERSION"));

/// Header carrying the per-request correlation id.
pub const CORRELATION_HEADER: &str = "x-ms-client-request-id";

const JSON: &str = "application/json";

/// Source of correlation ids.
pub type CorrelationIdFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Outcome of a completed HTTP round trip.
#[derive(Debug, Clone)]
pub struct ResponseResult {
    pub status: u16,
    /// Lowercased header names; repeated headers are joined with `", "`.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    /// From request start until the body was fully read.
    pub elapsed: Duration,
    /// The URL the request was sent to.
    pub url: String,
}

impl ResponseResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Executes management API requests.
#[derive(Clone)]
pub struct RequestDispatcher {
    http: reqwest::Client,
    resolver: UrlResolver,
    user_agent: String,
    correlation_id: CorrelationIdFn,
}

impl RequestDispatcher {
    /// Create a dispatcher with random UUID correlation ids.
    pub fn new(http: reqwest::Client, resolver: UrlResolver) -> Self {
        Self {
            http,
            resolver,
            user_agent: USER_AGENT.to_string(),
            correlation_id: Arc::new(|| uuid::Uuid::new_v4().to_string()),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_correlation_id<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.correlation_id = Arc::new(f);
        self
    }

    pub fn resolver(&self) -> &UrlResolver {
        &self.resolver
    }

    /// Default headers with the caller's headers overlaid in order.
    pub fn build_headers(
        &self,
        credential: &Credential,
        extra: &[HeaderPair],
    ) -> Result<HeaderMap, InputError> {
        let mut headers = HeaderMap::new();

        let mut authorization = header_value(&credential.bearer(), "Authorization")?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(UA, header_value(&self.user_agent, "User-Agent")?);
        headers.insert(
            HeaderName::from_static(CORRELATION_HEADER),
            header_value(&(self.correlation_id)(), CORRELATION_HEADER)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));

        for pair in extra {
            let malformed = || InputError::MalformedHeader {
                header: format!("{}={}", pair.name, pair.value),
            };
            let name = HeaderName::from_bytes(pair.name.as_bytes()).map_err(|_| malformed())?;
            let value = HeaderValue::from_str(&pair.value).map_err(|_| malformed())?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Send the request and read the full response.
    pub async fn dispatch(
        &self,
        spec: &RequestSpec,
        credential: &Credential,
    ) -> Result<ResponseResult, ArmError> {
        let url = self.resolver.resolve(&spec.path)?;
        let headers = self.build_headers(credential, &spec.extra_headers)?;

        let mut request = self
            .http
            .request(spec.verb.method(), url.clone())
            .headers(headers);
        if let Some(body) = spec.effective_body() {
            request = request.body(body.to_vec());
        }

        tracing::debug!("{} {}", spec.verb, url);
        let started = Instant::now();

        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::transport(url.as_str(), &e))?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::transport(url.as_str(), &e))?
            .to_vec();
        let elapsed = started.elapsed();

        tracing::debug!("{} {} -> {} in {:?}", spec.verb, url, status, elapsed);

        Ok(ResponseResult {
            status,
            headers,
            body,
            elapsed,
            url: url.to_string(),
        })
    }
}

fn header_value(value: &str, name: &str) -> Result<HeaderValue, InputError> {
    HeaderValue::from_str(value).map_err(|_| InputError::MalformedHeader {
        header: name.to_string(),
    })
}

fn collect_headers(map: &HeaderMap) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes());
        headers
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    headers
}
