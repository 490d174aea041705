use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::path::Path;
use wayfinder_core::config::WayfinderConfig;

use super::utils::{print_info, print_success};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the effective configuration (file plus environment overrides)
    Validate,

    /// Print the effective configuration as TOML
    Show,

    /// Write a configuration file with every default spelled out
    Generate {
        /// Output path for the config file
        #[arg(short, long, default_value = "config/wayfinder.toml")]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config_command(command: ConfigCommands, config: &WayfinderConfig) -> Result<()> {
    match command {
        ConfigCommands::Validate => validate_config(config),
        ConfigCommands::Show => show_config(config),
        ConfigCommands::Generate { output, force } => generate_config(&output, force),
    }
}

fn validate_config(config: &WayfinderConfig) -> Result<()> {
    print_info("Validating configuration...");
    config.validate().map_err(anyhow::Error::msg)?;
    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Gateways: {}", config.gateways.urls.len());
    println!("  Routing: {:?}", config.routing.strategy);
    println!(
        "  Verification: {}",
        if config.verification.enabled {
            format!(
                "{:?} against {} trusted gateways{}",
                config.verification.strategies,
                config.verification.trusted_gateways.len(),
                if config.verification.strict { " (strict)" } else { "" }
            )
        } else {
            "disabled".to_string()
        }
    );
    Ok(())
}

fn show_config(config: &WayfinderConfig) -> Result<()> {
    println!("{}", toml::to_string_pretty(config).context("failed to render configuration")?);
    Ok(())
}

fn generate_config(output: &str, force: bool) -> Result<()> {
    let path = Path::new(output);
    if path.exists() && !force {
        bail!("File {output} already exists. Use --force to overwrite.");
    }

    let rendered = toml::to_string_pretty(&WayfinderConfig::default())
        .context("failed to render default configuration")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, format!("# Wayfinder configuration\n\n{rendered}"))
        .with_context(|| format!("failed to write {output}"))?;

    print_success(&format!("Configuration written to {output}"));
    Ok(())
}
