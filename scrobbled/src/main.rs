//! scrobbled - Main entry point
//!
//! Loads configuration before touching the network, then either prints the
//! one-time authorization URL or runs the full pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scrobbled_common::config::{ConfigResolver, TomlConfig, CONFIG_ENV_VAR};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for scrobbled
#[derive(Parser, Debug)]
#[command(name = "scrobbled")]
#[command(about = "Build a Spotify playlist from your Last.fm scrobble history")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the Spotify authorization URL for obtaining an access token
    Authorize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is loaded before logging so its level can seed the filter
    let config_path = ConfigResolver::new(args.config.clone())
        .resolve()
        .context("Failed to locate config file")?;
    let config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting scrobbled"
    );

    match args.command {
        Some(Command::Authorize) => {
            let state = chrono::Utc::now().timestamp_millis().to_string();
            let url = scrobbled::auth::authorize_url(
                &config.spotify.client_id,
                &config.spotify.redirect_uri,
                &state,
            )?;
            println!("Open this URL, approve access, and copy the access_token");
            println!("from the redirect URL fragment into [spotify] access_token:");
            println!();
            println!("{}", url);
        }
        None => {
            let summary = scrobbled::run(&config).await?;
            println!(
                "Published {} tracks to playlist {} (summary: {})",
                summary.publish.tracks_added,
                summary.publish.playlist_id,
                summary.summary_path.display()
            );
        }
    }

    Ok(())
}
