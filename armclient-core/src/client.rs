//! The top-level operations: issue a request, print a token, manage tenants.

use std::sync::Arc;

use crate::authenticator::TokenAuthenticator;
use crate::broker::IdentityBroker;
use crate::cache::TokenCache;
use crate::directory::{TenantDirectory, validate_tenant};
use crate::dispatch::{RequestDispatcher, ResponseResult};
use crate::error::{ArmError, InputError};
use crate::model::{Tenant, TenantSelector};
use crate::request::RequestSpec;
use crate::settings::{Settings, SettingsStore};
use crate::token::Credential;

/// Client wired with runtime-selected cache and broker.
pub type DynArmClient = ArmClient<Box<dyn TokenCache>, Box<dyn IdentityBroker>>;

/// Authenticated access to the management API.
pub struct ArmClient<S: TokenCache, B: IdentityBroker> {
    authenticator: TokenAuthenticator<S, B>,
    directory: TenantDirectory,
    dispatcher: RequestDispatcher,
    settings: Arc<dyn SettingsStore>,
}

impl<S: TokenCache, B: IdentityBroker> ArmClient<S, B> {
    /// Build a client. Settings are shared with the authenticator.
    pub fn new(
        authenticator: TokenAuthenticator<S, B>,
        directory: TenantDirectory,
        dispatcher: RequestDispatcher,
    ) -> Self {
        let settings = Arc::clone(authenticator.settings());
        Self {
            authenticator,
            directory,
            dispatcher,
            settings,
        }
    }

    pub fn authenticator(&self) -> &TokenAuthenticator<S, B> {
        &self.authenticator
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// Issue a request under the selected tenant.
    ///
    /// The path is checked before a credential is acquired. Non-success
    /// statuses are returned, not raised.
    pub async fn request(
        &self,
        spec: &RequestSpec,
        tenant: &TenantSelector,
    ) -> Result<ResponseResult, ArmError> {
        self.dispatcher.resolver().resolve(&spec.path)?;
        let credential = self.authenticator.get_token(tenant).await?;
        self.dispatcher.dispatch(spec, &credential).await
    }

    /// A usable credential for the selected tenant.
    pub async fn token(&self, tenant: &TenantSelector) -> Result<Credential, ArmError> {
        Ok(self.authenticator.get_token(tenant).await?)
    }

    /// Tenants accessible with the active tenant's credential.
    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, ArmError> {
        let credential = self.authenticator.get_token(&TenantSelector::Current).await?;
        self.directory.list_tenants(&credential).await
    }

    /// Make `tenant_id` the active tenant.
    ///
    /// The id is checked against the tenant listing first; settings are left
    /// untouched unless it matches.
    pub async fn set_active_tenant(&self, tenant_id: &str) -> Result<Tenant, ArmError> {
        let tenants = self.list_tenants().await?;

        if !validate_tenant(tenant_id, &tenants) {
            return Err(InputError::UnknownTenant {
                tenant: tenant_id.to_string(),
            }
            .into());
        }

        let tenant_id = tenant_id.trim();
        self.settings.write(&Settings::new(tenant_id))?;
        tracing::info!("Active tenant set to {}", tenant_id);

        let tenant = tenants
            .into_iter()
            .find(|t| t.tenant_id.eq_ignore_ascii_case(tenant_id))
            .unwrap_or_else(|| Tenant::new(tenant_id));
        Ok(tenant)
    }

    /// The persisted active tenant, if any.
    pub fn active_tenant(&self) -> Result<Option<String>, ArmError> {
        let settings = self.settings.read()?;
        Ok(settings.active_tenant().map(str::to_string))
    }
}
