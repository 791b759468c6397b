//! Sandpile engine binary.
//!
//! Runs one sandpile experiment: builds the configured simulation, warms
//! it up toward its critical state, harvests avalanche records, and logs a
//! statistics summary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the path given as the first argument, else
//!    `sandpile-config.yaml`, else defaults
//! 2. Initialize structured logging (tracing), `RUST_LOG` first, then
//!    `logging.level`
//! 3. Build the simulation (rule resolved eagerly)
//! 4. Warm up and harvest
//! 5. Log the summary

mod error;
mod harvest;
mod stats;

use std::path::{Path, PathBuf};

use sandpile_core::SandpileConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::stats::AvalancheStats;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "sandpile-config.yaml";

/// Application entry point for the sandpile engine.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or names an
/// invalid simulation.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    let source = source.map_or_else(
        || "defaults".to_owned(),
        |path| path.display().to_string(),
    );
    info!(
        source = source.as_str(),
        size = config.simulation.size,
        rule = config.simulation.rule.as_str(),
        custom_rules = config.rules.len(),
        "Configuration loaded"
    );

    // 3. Build the simulation.
    let mut sim = config.build_simulation().map_err(EngineError::from)?;

    // 4. Warm up and harvest.
    let stats = harvest::harvest(&mut sim, &config.run);

    // 5. Log the summary.
    log_summary(&stats);
    info!(
        seed = sim.seed(),
        mass = sim.grid().total_mass(),
        "sandpile-engine finished"
    );

    Ok(())
}

/// Load configuration from the CLI path, the default file, or defaults.
///
/// Returns the config and the path it came from, if any.
fn load_config() -> Result<(SandpileConfig, Option<PathBuf>), EngineError> {
    if let Some(arg) = std::env::args_os().nth(1) {
        let path = PathBuf::from(arg);
        let config = SandpileConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        let config = SandpileConfig::from_file(default_path)?;
        Ok((config, Some(default_path.to_path_buf())))
    } else {
        Ok((SandpileConfig::default(), None))
    }
}

fn log_summary(stats: &AvalancheStats) {
    info!(
        steps = stats.steps(),
        avalanches = stats.recorded(),
        max_size = stats.max_size(),
        max_duration = stats.max_duration(),
        mean_size = stats.mean_size().unwrap_or(0.0),
        mean_duration = stats.mean_duration().unwrap_or(0.0),
        distinct_sizes = stats.size_frequencies().len(),
        distinct_durations = stats.duration_frequencies().len(),
        "Harvest complete"
    );
}
