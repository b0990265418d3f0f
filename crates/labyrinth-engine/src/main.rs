//! # Labyrinth
//!
//! Loads `labyrinth.toml` (or the path given as the first argument), builds
//! the configured scene on the software audio engine and runs it headless.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use labyrinth_engine::{app, EngineConfig};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("labyrinth=info".parse()?))
        .init();

    info!("Labyrinth starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };

    let summary = app::run(&config)?;
    if summary.engine_failures > 0 {
        warn!("{} engine calls failed during the run", summary.engine_failures);
    }

    info!("Labyrinth shutdown complete");
    Ok(())
}
