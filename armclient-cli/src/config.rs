//! CLI configuration handling.

use anyhow::{Context, Result};
use armclient_core::BrokerKind;
use armclient_core::authenticator::{DEFAULT_EXPIRY_SKEW_SECS, DEFAULT_TENANT};
use armclient_core::cloud::DEFAULT_CLOUD;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Cloud environment name (AzureCloud, AzureChinaCloud, AzureUSGovernment).
    pub cloud: String,

    /// Tenant used when no active tenant was selected.
    pub default_tenant: String,

    /// Seconds subtracted from token expiry before a token counts as expired.
    pub expiry_skew_secs: i64,

    /// Cache tokens in the OS keyring when available.
    pub prefer_keyring: bool,

    /// Where fresh tokens come from.
    pub broker: BrokerKind,

    /// Override of the cloud's management endpoint.
    pub api_base: Option<String>,

    /// Override of the settings file location.
    pub settings_path: Option<PathBuf>,

    /// Logging level when `RUST_LOG` is not set.
    pub log_level: String,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cloud: DEFAULT_CLOUD.to_string(),
            default_tenant: DEFAULT_TENANT.to_string(),
            expiry_skew_secs: DEFAULT_EXPIRY_SKEW_SECS,
            prefer_keyring: true,
            broker: BrokerKind::Auto,
            api_base: None,
            settings_path: None,
            log_level: "warn".to_string(),
            config_path: PathBuf::new(),
        }
    }
}

/// Load configuration from `path`, or from the default location.
///
/// A missing file yields defaults; an unreadable or invalid one is an error.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => project_dirs()
            .map(|d| d.config_dir().join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from("armclient.toml")),
    };

    let mut config = if config_path.exists() {
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {:?}", config_path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", config_path))?
    } else {
        ClientConfig::default()
    };

    config.config_path = config_path;
    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "armclient", "armclient")
}
