//! practice-cache - maintenance tool for the practice question cache
//!
//! Opens the on-disk cache described by the environment (see
//! [`CacheConfig::from_env`]) and runs one maintenance command.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use practice_cache::cli::Cli;
use practice_cache::{CacheConfig, CacheStore};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging (stderr)
/// 2. Parse command-line arguments
/// 3. Load configuration from environment variables
/// 4. Open the cache store, provisioning its directories
/// 5. Run the command and print its JSON result (`watch` runs the
///    background sweep until Ctrl+C/SIGTERM first)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "practice_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: cache_dir={}, max_memory_bytes={}, default_ttl={}ms, cleanup_interval={}s",
        config.cache_dir.display(),
        config.max_memory_bytes,
        config.default_ttl_ms,
        config.cleanup_interval
    );
    let cleanup_interval = config.cleanup_interval;

    let store = CacheStore::open(config)
        .await
        .context("Failed to open cache directory")?;
    let store = Arc::new(store);

    let output = cli.command.run(&store, cleanup_interval).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
