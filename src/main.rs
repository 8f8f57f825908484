// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! `vss-path-adapter` service entry point.
//!
//! Configuration comes from the environment (see [`AdapterConfig::from_env`]).
//! Logging honours `RUST_LOG` and defaults to `info`. The process runs until
//! Ctrl-C, then stops the adapter and exits.

use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vss_path_adapter::{AdapterConfig, HttpStore, PathAdapter, Result};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "VSS path adapter failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // ── Configuration (fatal on error, before anything starts) ──
    let config = AdapterConfig::from_env()?;
    let table = config.load_table()?;
    for entry in table.entries() {
        info!(source = %entry.source, destination = %entry.destination, "Translation");
    }

    let store = Arc::new(HttpStore::new(&config.store)?);
    let adapter = PathAdapter::new(config, table, store)?;

    // ── Run until interrupted ──
    adapter.start().await?;
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for shutdown signal, stopping");
    }
    info!("Shutdown signal received");

    adapter.stop().await;
    Ok(())
}
