//! Tenant discovery.
//!
//! Lists the tenants the signed-in identity can access through the
//! management API's `/tenants` resource.

use std::collections::HashSet;

use serde::Deserialize;
use url::Url;

use crate::error::{ArmError, NetworkError};
use crate::model::Tenant;
use crate::resolve::UrlResolver;
use crate::token::{AuthError, Credential};

/// The fixed tenant listing resource.
pub const TENANTS_PATH: &str = "/tenants?api-version=2020-01-01";

/// Most pages fetched for one listing.
pub const MAX_TENANT_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantPage {
    #[serde(default)]
    value: Vec<Tenant>,
    #[serde(default)]
    next_link: Option<String>,
}

/// Client for the tenant listing resource.
#[derive(Debug, Clone)]
pub struct TenantDirectory {
    http: reqwest::Client,
    resolver: UrlResolver,
}

impl TenantDirectory {
    pub fn new(http: reqwest::Client, resolver: UrlResolver) -> Self {
        Self { http, resolver }
    }

    /// List accessible tenants in server order.
    ///
    /// Pages are followed through `nextLink` one at a time. A 401 or 403 is an
    /// [`AuthError::Unauthorized`]; any other non-success status is a
    /// [`NetworkError::UnexpectedStatus`].
    ///
    /// The credential is only sent to the management API's own origin: a
    /// `nextLink` elsewhere, a link already fetched, or more than
    /// [`MAX_TENANT_PAGES`] pages end the listing with
    /// [`NetworkError::Paging`].
    pub async fn list_tenants(&self, credential: &Credential) -> Result<Vec<Tenant>, ArmError> {
        let first = self.resolver.resolve(TENANTS_PATH)?;
        let origin = first.origin();

        let mut tenants = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            if visited.len() >= MAX_TENANT_PAGES {
                return Err(paging(url.as_str(), format!("more than {} pages", MAX_TENANT_PAGES)));
            }
            if !visited.insert(url.to_string()) {
                return Err(paging(url.as_str(), "link repeats an earlier page"));
            }

            let page = self.fetch_page(url.as_str(), credential).await?;
            tenants.extend(page.value);

            next = match page.next_link.filter(|link| !link.trim().is_empty()) {
                Some(link) => Some(next_page_url(&link, &origin)?),
                None => None,
            };
        }

        tracing::debug!("Listed {} tenants in {} pages", tenants.len(), visited.len());
        Ok(tenants)
    }

    async fn fetch_page(&self, url: &str, credential: &Credential) -> Result<TenantPage, ArmError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(credential.access_token.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| NetworkError::transport(url, &e))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Unauthorized {
                status: status.as_u16(),
                message,
            }
            .into());
        }
        if !status.is_success() {
            return Err(NetworkError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::transport(url, &e))?;

        serde_json::from_slice(&body).map_err(|e| {
            NetworkError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

fn next_page_url(link: &str, origin: &url::Origin) -> Result<Url, ArmError> {
    let url = Url::parse(link.trim())
        .map_err(|e| paging(link, format!("invalid link: {}", e)))?;

    if &url.origin() != origin {
        tracing::warn!("Refusing to follow nextLink to {}", url);
        return Err(paging(url.as_str(), "link leaves the management endpoint"));
    }
    Ok(url)
}

fn paging(url: &str, message: impl Into<String>) -> ArmError {
    NetworkError::Paging {
        url: url.to_string(),
        message: message.into(),
    }
    .into()
}

/// Whether `tenant_id` names one of `tenants`, ignoring ASCII case.
pub fn validate_tenant(tenant_id: &str, tenants: &[Tenant]) -> bool {
    let candidate = tenant_id.trim();
    !candidate.is_empty()
        && tenants
            .iter()
            .any(|t| t.tenant_id.eq_ignore_ascii_case(candidate))
}
