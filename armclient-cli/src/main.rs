//! armclient
//!
//! Command line client for Azure Resource Manager REST APIs.
//!
//! # Usage
//!
//! ```bash
//! # Issue a request against the active tenant
//! armclient get /subscriptions?api-version=2020-01-01
//!
//! # Create a resource group from a file, with an extra header
//! armclient put /subscriptions/{id}/resourcegroups/rg?api-version=2021-04-01 @rg.json -H If-None-Match=*
//!
//! # Inspect the current access token
//! armclient token
//!
//! # Switch the active tenant
//! armclient tenant set 72f988bf-86f1-41af-91ab-2d7cd011db47
//! ```

use std::path::PathBuf;

use anyhow::Result;
use armclient_core::Verb;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "armclient")]
#[command(about = "Command line client for Azure Resource Manager APIs")]
#[command(version)]
struct Cli {
    /// Output verbose messages like request URL, headers etc.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Resource path (e.g. /subscriptions?api-version=2020-01-01) or absolute URL
    pub path: String,

    /// Request body for PUT, PATCH and POST; use @file to read it from a file
    pub body: Option<String>,

    /// Additional request header, may be repeated
    #[arg(short = 'H', long = "header", value_name = "NAME=VALUE")]
    pub headers: Vec<String>,

    /// Tenant to run the request under instead of the active tenant
    #[arg(short, long)]
    pub tenant: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Makes a GET request to ARM endpoint
    Get(RequestArgs),

    /// Makes a HEAD request to ARM endpoint
    Head(RequestArgs),

    /// Makes a PUT request to ARM endpoint
    Put(RequestArgs),

    /// Makes a PATCH request to ARM endpoint
    Patch(RequestArgs),

    /// Makes a DELETE request to ARM endpoint
    Delete(RequestArgs),

    /// Makes a POST request to ARM endpoint
    Post(RequestArgs),

    /// Prints the access token of a tenant, the active tenant by default
    Token {
        /// Print the raw access token instead of its claims
        #[arg(short, long)]
        raw: bool,

        /// Tenant id
        #[arg(short, long)]
        tenant: Option<String>,
    },

    /// Manage the tenants the signed-in account has access to
    Tenant {
        #[command(subcommand)]
        command: Option<TenantCommand>,
    },
}

#[derive(Subcommand)]
enum TenantCommand {
    /// Sets the active tenant
    Set {
        /// Tenant id to make active
        tenant_id: String,
    },

    /// Shows the active tenant
    Show,

    /// Lists all accessible tenants
    List,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &config.log_level);
    tracing::debug!("Loaded configuration from {:?}", config.config_path);

    match cli.command {
        Commands::Get(args) => commands::request(Verb::Get, args, &config, cli.verbose).await,
        Commands::Head(args) => commands::request(Verb::Head, args, &config, cli.verbose).await,
        Commands::Put(args) => commands::request(Verb::Put, args, &config, cli.verbose).await,
        Commands::Patch(args) => commands::request(Verb::Patch, args, &config, cli.verbose).await,
        Commands::Delete(args) => commands::request(Verb::Delete, args, &config, cli.verbose).await,
        Commands::Post(args) => commands::request(Verb::Post, args, &config, cli.verbose).await,
        Commands::Token { raw, tenant } => commands::token(raw, tenant.as_deref(), &config).await,
        Commands::Tenant { command } => match command.unwrap_or(TenantCommand::List) {
            TenantCommand::Set { tenant_id } => commands::set_tenant(&tenant_id, &config).await,
            TenantCommand::Show => commands::show_tenant(&config),
            TenantCommand::List => commands::list_tenants(&config).await,
        },
    }
}

/// Log to stderr so stdout carries only command output.
fn init_logging(verbose: bool, default_level: &str) {
    let filter = if verbose {
        EnvFilter::new(format!("armclient=debug,armclient_core=debug,{}", default_level))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
