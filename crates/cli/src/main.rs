use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wayfinder_core::{
    config::{RoutingStrategyKind, WayfinderConfig},
    Wayfinder, WayfinderBuilder,
};

mod commands;
use commands::{fetch, handle_config_command, resolve, select, ConfigCommands, FetchOptions};

#[derive(Parser)]
#[command(name = "wayfinder")]
#[command(about = "Wayfinder CLI - resolve, route and verify ar:// requests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to $WAYFINDER_CONFIG or config/wayfinder.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gateway URL to route across (can be specified multiple times)
    #[arg(long = "gateway", global = true)]
    gateways: Vec<String>,

    /// Routing strategy override
    #[arg(long, global = true, value_parser = parse_strategy)]
    strategy: Option<RoutingStrategyKind>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an ar:// reference to a gateway URL
    Resolve { target: String },

    /// Run gateway selection and print the chosen gateway
    Select {
        /// Number of selections to run
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Fetch a reference or URL, verifying ar:// responses when enabled
    Fetch {
        target: String,

        /// Write the body to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Enable verification regardless of the config file
        #[arg(long)]
        verify: bool,

        /// Fail instead of returning unverified data
        #[arg(long)]
        strict: bool,

        /// Seconds to wait for the background verification outcome
        #[arg(long, default_value = "30")]
        verify_wait: u64,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn parse_strategy(raw: &str) -> Result<RoutingStrategyKind, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unknown routing strategy '{raw}'"))
}

fn init_logging(config: &WayfinderConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,wayfinder_core={level},wayfinder={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        let fmt_layer = tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(true)
            .with_line_number(true)
            .with_target(false)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).init();
    }
}

fn load_config(cli: &Cli) -> Result<WayfinderConfig> {
    let mut config = match &cli.config {
        Some(path) => WayfinderConfig::from_file(path),
        None => WayfinderConfig::load(),
    }
    .context("failed to load configuration")?;

    if !cli.gateways.is_empty() {
        config.gateways.urls.clone_from(&cli.gateways);
    }
    if let Some(strategy) = cli.strategy {
        config.routing.strategy = strategy;
    }
    if let Commands::Fetch { verify, strict, .. } = &cli.command {
        config.verification.enabled |= *verify || *strict;
        config.verification.strict |= *strict;
    }
    Ok(config)
}

fn build_wayfinder(config: &WayfinderConfig) -> Result<Wayfinder> {
    Ok(WayfinderBuilder::from_config(config)?.build()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config);

    // Config commands never touch the network.
    match cli.command {
        Commands::Config(command) => handle_config_command(command, &config)?,
        Commands::Resolve { target } => resolve(&build_wayfinder(&config)?, &target).await?,
        Commands::Select { count } => select(&build_wayfinder(&config)?, count).await?,
        Commands::Fetch { target, output, verify_wait, .. } => {
            let options =
                FetchOptions { target, output, verify_wait: Duration::from_secs(verify_wait) };
            fetch(&build_wayfinder(&config)?, options).await?;
        }
    }

    Ok(())
}
