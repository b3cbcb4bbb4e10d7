mod commands;
mod config;
mod discord;
mod dispatch;
mod interaction;
mod response;
mod server;
mod verify;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{CommandRegistry, Env};
use crate::config::Config;
use crate::discord::DiscordClient;
use crate::server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pinbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let register = args.iter().any(|a| a == "--register");
    let config_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Application: {}", config.discord.application_id);
    info!("  API base: {}", config.discord.api_base);
    info!("  Outbound timeout: {}s", config.http.timeout_secs);

    let client = Arc::new(DiscordClient::new(
        &config.discord.api_base,
        &config.discord.token,
        config.http.timeout(),
    )?);
    let registry = CommandRegistry::with_builtin_commands()?;
    let definitions = registry.definitions();
    info!("Loaded {} command(s)", definitions.len());

    if register {
        let registered = client
            .register_commands(&config.discord.application_id, &definitions)
            .await?;
        info!("Successfully registered all commands");
        info!("{}", registered);
        return Ok(());
    }

    let public_key = verify::parse_public_key(&config.discord.public_key)
        .context("Invalid discord.public_key")?;

    let state = AppState {
        registry: Arc::new(registry),
        env: Env {
            application_id: config.discord.application_id.clone(),
            channels: client,
        },
        public_key,
    };

    server::serve(&config.listen_address(), state).await
}
