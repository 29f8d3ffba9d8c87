//! Command-line interface for cache maintenance
//!
//! Parses the `practice-cache` subcommands and runs them against a
//! [`CacheStore`], printing JSON to stdout.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::signal;
use tracing::{info, warn};

use crate::cache::{CacheStatus, CacheStore, GetOptions, SetOptions};
use crate::tasks::spawn_cleanup_task;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The payload given to `set` is not valid JSON
    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// The shutdown signal handler could not be installed
    #[error("Failed to wait for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

/// Practice question cache maintenance
#[derive(Parser, Debug)]
#[command(name = "practice-cache")]
#[command(about = "Inspect and maintain the practice question cache")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show memory and per-namespace file usage
    Status {
        /// Limit the report to one namespace
        #[arg(long, short)]
        namespace: Option<String>,
    },
    /// Remove expired entries from every namespace
    Cleanup,
    /// Drop one entry, or a whole namespace when no identifier is given
    Invalidate {
        namespace: String,
        identifier: Option<String>,
    },
    /// Print a cached value
    Get {
        namespace: String,
        identifier: String,
        /// Return the value even if its TTL has elapsed
        #[arg(long)]
        accept_expired: bool,
    },
    /// Store a JSON value
    Set {
        namespace: String,
        identifier: String,
        /// Payload as a JSON document
        json: String,
        /// TTL in milliseconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Sweep expired entries periodically until interrupted
    Watch {
        /// Seconds between sweeps, CACHE_CLEANUP_INTERVAL when omitted
        #[arg(long)]
        interval: Option<u64>,
    },
}

impl Command {
    /// Runs the command and returns the JSON document to print.
    ///
    /// `cleanup_interval` is the sweep period in seconds used by `watch`
    /// when no `--interval` is given.
    pub async fn run(
        &self,
        store: &Arc<CacheStore>,
        cleanup_interval: u64,
    ) -> Result<Value, CliError> {
        let output = match self {
            Command::Status { namespace } => {
                let status = store.status(namespace.as_deref()).await;
                status_report(&status)
            }
            Command::Cleanup => {
                let removed = store.cleanup().await;
                json!({ "removed": removed })
            }
            Command::Invalidate {
                namespace,
                identifier,
            } => {
                store.invalidate(namespace, identifier.as_deref()).await;
                json!({ "invalidated": namespace, "identifier": identifier })
            }
            Command::Get {
                namespace,
                identifier,
                accept_expired,
            } => {
                let options = GetOptions {
                    accept_expired: *accept_expired,
                };
                let value: Option<Value> = store.get_with(namespace, identifier, options).await;
                json!({ "hit": value.is_some(), "data": value })
            }
            Command::Set {
                namespace,
                identifier,
                json,
                ttl,
            } => {
                let data: Value = serde_json::from_str(json)?;
                store
                    .set_with(namespace, identifier, &data, SetOptions { ttl: *ttl })
                    .await;
                json!({ "stored": identifier, "namespace": namespace })
            }
            Command::Watch { interval } => {
                let interval = (*interval).unwrap_or(cleanup_interval).max(1);
                let cleanup_handle = spawn_cleanup_task(store.clone(), interval);
                info!("Watching cache, sweeping every {}s", interval);

                let result = shutdown_signal().await;
                cleanup_handle.abort();
                warn!("Cleanup task aborted");
                result?;
                json!({ "stopped": true, "interval": interval })
            }
        };
        Ok(output)
    }
}

/// Waits for Ctrl+C or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        result = signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping...");
            result
        }
        _ = terminate.recv() => {
            info!("Received SIGTERM, stopping...");
            Ok(())
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    signal::ctrl_c().await?;
    info!("Received Ctrl+C, stopping...");
    Ok(())
}

/// Status as JSON, with entry timestamps also given as RFC 3339 strings.
pub fn status_report(status: &CacheStatus) -> Value {
    let mut report = serde_json::to_value(status).unwrap_or(Value::Null);
    report["stats"]["hitRate"] = json!(status.stats.hit_rate());

    for (name, namespace) in &status.namespaces {
        let entry = &mut report["namespaces"][name.as_str()];
        entry["oldestEntryAt"] = json!(namespace.oldest_entry.and_then(rfc3339));
        entry["newestEntryAt"] = json!(namespace.newest_entry.and_then(rfc3339));
    }
    report
}

fn rfc3339(timestamp_ms: u64) -> Option<String> {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(i64::try_from(timestamp_ms).ok()?)
        .map(|at| at.to_rfc3339())
}
