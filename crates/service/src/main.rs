//! keypilotd - KeyPilot profile sync daemon
//!
//! Watches application focus and keeps the macro pad programmed with the
//! matching profile.

#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use keypilot_device::DeviceSyncPort;
use keypilot_service::{KeyPilotConfig, KeyPilotDaemon};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "keypilotd")]
#[command(about = "KeyPilot - switch macro pad profiles with application focus")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ~/.config/keypilot/config.json)
    #[arg(long, global = true, env = "KEYPILOT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (default)
    Run,

    /// List stored profiles
    List,

    /// Dry-run a profile's mapping through the device tool
    Validate {
        /// Profile name
        name: String,
    },

    /// Turn automatic switching on or off (takes effect on next start)
    AutoSwitch {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("keypilot={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => KeyPilotConfig::default_config_path()?,
    };
    let config = KeyPilotConfig::load_from_path(&config_path).await?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            info!("Starting KeyPilot v{}", env!("CARGO_PKG_VERSION"));
            KeyPilotDaemon::new(config).run().await
        }
        Commands::List => list_profiles(&KeyPilotDaemon::new(config)),
        Commands::Validate { name } => validate_profile(&KeyPilotDaemon::new(config), &name).await,
        Commands::AutoSwitch { state } => {
            let enabled = matches!(state, Toggle::On);
            let config = KeyPilotConfig {
                auto_switch_enabled: enabled,
                ..config
            };
            config
                .save_to_path(&config_path)
                .await
                .context("Failed to persist auto-switch setting")?;
            println!(
                "Automatic switching {} (restart keypilotd to apply)",
                if enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
    }
}

fn list_profiles(daemon: &KeyPilotDaemon) -> Result<()> {
    let repository = daemon.open_repository()?;
    let repository = repository.read();

    for profile in repository.profiles() {
        let marker = if profile.is_default { "*" } else { " " };
        let apps = if profile.application_identifiers.is_empty() {
            "-".to_string()
        } else {
            profile.application_identifiers.join(", ")
        };
        println!("{marker} {} {:<24} {apps}", profile.icon, profile.name);
    }
    Ok(())
}

async fn validate_profile(daemon: &KeyPilotDaemon, name: &str) -> Result<()> {
    let profile = {
        let repository = daemon.open_repository()?;
        let guard = repository.read();
        guard
            .find_by_name(name)
            .cloned()
            .with_context(|| format!("No profile named {name:?}"))?
    };

    let unknown = profile.key_mapping.invalid_fields();
    if !unknown.is_empty() {
        println!("Unrecognized actions in: {}", unknown.join(", "));
    }

    let port = daemon.device_port();
    if port.validate(&profile.key_mapping).await {
        println!("{}: mapping accepted by {}", profile.name, port.tool_path().display());
        Ok(())
    } else {
        bail!("{}: mapping rejected by the device tool", profile.name)
    }
}
