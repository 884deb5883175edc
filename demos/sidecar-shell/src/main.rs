//! Minimal shell lifecycle around the API sidecar
//!
//! Usage: `sidecar-shell [config.json]`
//!
//! Without a config file the sidecar is looked up in `resources/` next to the
//! binary and in `src/pyflask/` under the working directory. Press Ctrl-C to
//! play the part of the last window closing.

use anyhow::{Context, Result};
use sidecar_layer::{Sidecar, SidecarConfig, TerminationStatus};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<SidecarConfig> {
    if let Some(path) = std::env::args().nth(1) {
        return Ok(SidecarConfig::from_json_file(&path)?);
    }

    let exe_dir = std::env::current_exe()
        .context("Failed to locate the running executable")?
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;

    SidecarConfig::builder()
        .resources_dir(exe_dir.join("resources"))
        .dev_script_dir(cwd.join("src").join("pyflask"))
        .build()
        .context("Failed to build default sidecar config")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    let mut sidecar = Sidecar::new(config)?;
    info!(platform = Sidecar::platform_name(), "Shell ready");

    // A shell without its backend is useless, so a launch failure ends startup
    if let Err(e) = sidecar.start_sidecar().await {
        error!(error = %e, fatal = e.is_fatal_to_startup(), "Could not start sidecar");
        std::process::exit(1);
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("All windows closed, stopping sidecar");

    match sidecar.shutdown_sidecar(std::process::id()).await {
        TerminationStatus::Completed => info!("Sidecar stopped"),
        TerminationStatus::NotRunning => info!("Sidecar was not running"),
        TerminationStatus::TimedOut { waited } => {
            warn!(waited_ms = waited.as_millis() as u64, "Sidecar cleanup timed out")
        }
    }

    info!("Quitting");
    Ok(())
}
