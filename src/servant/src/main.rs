//! Servant Daemon
//!
//! Serves the administrative API for IIS sites and offers a few local
//! inspection commands against the same site registry.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use servant_api::{
    api::{schema::StatsResponse, ApiServer},
    config::Config,
    host::HostMonitor,
    site::ServantServerInfo,
    SiteManager, SiteRegistry,
};

/// Servant administrative API for IIS sites
#[derive(Parser)]
#[command(name = "servant")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/servant/servant.conf")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve,

    /// Inspect registered sites
    Sites {
        #[command(subcommand)]
        action: SiteCommands,
    },

    /// Show application pools and certificates
    Info,

    /// Show host statistics
    Stats,

    /// Validate the configuration file and exit
    CheckConfig,
}

#[derive(Subcommand)]
enum SiteCommands {
    /// List all sites
    List,
    /// Show a single site
    Show {
        /// IIS site id
        id: i64,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration first so its log level can apply; its outcome is logged
    // once the subscriber is installed
    let config = Config::load(&cli.config)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    if cli.config.exists() {
        info!("Configuration file: {}", cli.config.display());
    } else {
        warn!(
            "Configuration file not found: {}, using defaults",
            cli.config.display()
        );
    }

    let registry = SiteRegistry::load(&config.sites.registry).with_context(|| {
        format!(
            "Failed to load site registry: {}",
            config.sites.registry.display()
        )
    })?;

    match cli.command {
        None | Some(Commands::Serve) => {
            info!("Starting Servant API...");
            let server = ApiServer::new(config, Arc::new(registry));
            server.start().await?;
        }
        Some(Commands::Sites { action }) => match action {
            SiteCommands::List => {
                let sites = registry.get_sites(true)?;
                println!("{}", serde_json::to_string_pretty(&sites)?);
            }
            SiteCommands::Show { id } => match registry.get_site_by_id(id)? {
                Some(site) => println!("{}", serde_json::to_string_pretty(&site)?),
                None => anyhow::bail!("No site with id {}", id),
            },
        },
        Some(Commands::Info) => {
            let info = ServantServerInfo::collect(&registry)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Some(Commands::Stats) => {
            let sites = registry.get_sites(true)?;
            let stats = StatsResponse::new(HostMonitor::new().snapshot(), 0.0, 0, &sites);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Some(Commands::CheckConfig) => {
            config.validate()?;
            println!("Configuration OK");
        }
    }

    Ok(())
}
