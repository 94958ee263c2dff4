//! Command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use armclient_core::{
    ArmClient, ArmError, CloudEnvironment, CloudRegistry, DynArmClient, ErrorKind,
    FileSettingsStore, HeaderPair, RequestDispatcher, RequestSpec, SettingsStore, TenantDirectory,
    TenantId, TenantSelector, TokenAuthenticator, UrlResolver, Verb, create_broker, create_cache,
    decode_payload, read_body_argument,
};

use crate::RequestArgs;
use crate::config::ClientConfig;
use crate::output;

/// Issue one request and print the response body.
///
/// Headers, body and path are checked before any credential is acquired.
pub async fn request(
    verb: Verb,
    args: RequestArgs,
    config: &ClientConfig,
    verbose: bool,
) -> Result<()> {
    let spec = build_spec(verb, &args)?;
    let cloud = cloud(config)?;
    resolver(config, &cloud)?.resolve(&spec.path)?;

    // echo literal bodies; file bodies are not repeated
    if verbose && verb.carries_body() {
        if let Some(body) = args.body.as_deref().filter(|b| !b.starts_with('@')) {
            println!("{}", output::pretty_json(body.as_bytes()));
        }
    }

    let client = build_client(config, &cloud)?;
    let selector = TenantSelector::from_option(args.tenant.as_deref());
    let response = client
        .request(&spec, &selector)
        .await
        .map_err(|e| with_action(e, "Request failed"))?;

    if verbose {
        println!("{}", output::response_detail(verb, &response, &spec.extra_headers));
    }
    println!("{}", output::pretty_json(&response.body));
    Ok(())
}

/// Print the decoded claims of the access token, or the raw token.
pub async fn token(raw: bool, tenant: Option<&str>, config: &ClientConfig) -> Result<()> {
    let client = build_client(config, &cloud(config)?)?;
    let credential = client
        .token(&TenantSelector::from_option(tenant))
        .await
        .map_err(|e| with_action(e, "Failed to get access token"))?;

    tracing::debug!(
        "Token for tenant {} expires at {}",
        credential.tenant_id,
        credential.expires_at.to_rfc3339()
    );

    if raw {
        println!("{}", credential.access_token.expose());
        return Ok(());
    }

    let claims = decode_payload(credential.access_token.expose())
        .context("Invalid JWT token retrieved")?;
    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(())
}

pub async fn list_tenants(config: &ClientConfig) -> Result<()> {
    let client = build_client(config, &cloud(config)?)?;
    let tenants = client
        .list_tenants()
        .await
        .map_err(|e| with_action(e, "Failed to get tenants"))?;

    println!("{}", serde_json::to_string_pretty(&tenants)?);
    Ok(())
}

pub async fn set_tenant(tenant_id: &str, config: &ClientConfig) -> Result<()> {
    let client = build_client(config, &cloud(config)?)?;
    let tenant = client.set_active_tenant(tenant_id).await?;

    match tenant.display_name {
        Some(name) => println!("Active tenant set to {} ({})", tenant_id.trim(), name),
        None => println!("Active tenant set to {}", tenant_id.trim()),
    }
    Ok(())
}

pub fn show_tenant(config: &ClientConfig) -> Result<()> {
    let settings = settings_store(config)?
        .read()
        .context("Failed to show current tenant")?;

    println!("{}", settings.active_tenant().unwrap_or_default());
    Ok(())
}

fn build_spec(verb: Verb, args: &RequestArgs) -> Result<RequestSpec> {
    let headers = args
        .headers
        .iter()
        .map(|h| HeaderPair::parse(h))
        .collect::<Result<Vec<_>, _>>()?;

    let mut spec = RequestSpec::new(verb, args.path.as_str()).with_headers(headers);

    if verb.carries_body() {
        if let Some(arg) = &args.body {
            spec = spec.with_body(read_body_argument(arg)?.into_bytes());
        }
    }

    Ok(spec)
}

fn cloud(config: &ClientConfig) -> Result<CloudEnvironment> {
    let registry = CloudRegistry::with_defaults();
    registry.get(&config.cloud).cloned().with_context(|| {
        format!(
            "Unknown cloud '{}'. Known clouds: {}",
            config.cloud,
            registry.names().join(", ")
        )
    })
}

fn resolver(config: &ClientConfig, cloud: &CloudEnvironment) -> Result<UrlResolver> {
    let base = config
        .api_base
        .as_deref()
        .unwrap_or(&cloud.resource_manager);
    Ok(UrlResolver::parse(base)?)
}

fn settings_store(config: &ClientConfig) -> Result<Arc<dyn SettingsStore>> {
    let store = match &config.settings_path {
        Some(path) => FileSettingsStore::at_path(path),
        None => FileSettingsStore::open_default()?,
    };
    Ok(Arc::new(store))
}

fn build_client(config: &ClientConfig, cloud: &CloudEnvironment) -> Result<DynArmClient> {
    let resolver = resolver(config, cloud)?;
    let broker = create_broker(config.broker, cloud)?;
    tracing::debug!("Using {} identity broker for {}", broker.name(), cloud.name);

    let authenticator = TokenAuthenticator::new(
        create_cache(config.prefer_keyring),
        broker,
        settings_store(config)?,
    )
    .with_skew(chrono::Duration::seconds(config.expiry_skew_secs))
    .with_default_tenant(TenantId::new(config.default_tenant.as_str()));

    let http = reqwest::Client::new();
    Ok(ArmClient::new(
        authenticator,
        TenantDirectory::new(http.clone(), resolver.clone()),
        RequestDispatcher::new(http, resolver),
    ))
}

/// Prefix authentication failures with what was being attempted.
fn with_action(err: ArmError, action: &'static str) -> anyhow::Error {
    match err.kind() {
        ErrorKind::Auth => anyhow::Error::new(err).context("Failed to acquire auth token"),
        ErrorKind::Network => anyhow::Error::new(err).context(action),
        ErrorKind::InvalidInput | ErrorKind::Storage => err.into(),
    }
}
