//! Configuration loading and typed config structures for sandpile runs.
//!
//! The canonical configuration lives in `sandpile-config.yaml` at the
//! project root. Every field has a default, so an empty file (or no file
//! at all) yields a 50x50 BTW run of 10 000 recorded steps.
//!
//! ```yaml
//! simulation:
//!   size: 50
//!   rule: BTW
//!   seed: 42
//! run:
//!   steps: 10000
//!   warmup_steps: 5000
//!   record_empty: false
//! rules:
//!   DIAGONAL:
//!     threshold: 4
//!     neighbors: [[-1, -1], [-1, 1], [1, -1], [1, 1]]
//! logging:
//!   level: info
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::SandpileError;
use crate::rule::{Offset, RuleRegistry, RuleSpec};
use crate::simulation::Simulation;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level run configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SandpileConfig {
    /// Grid size, rule, and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Warm-up and harvest lengths.
    #[serde(default)]
    pub run: RunConfig,

    /// Custom rules added to the built-in registry, keyed by name.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SandpileConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Built-in rules plus the custom rules from the `rules` section.
    ///
    /// A custom rule that reuses a built-in name is skipped with a warning;
    /// the built-in wins.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::InvalidThreshold`] or
    /// [`SandpileError::EmptyNeighborhood`] for a malformed custom rule.
    pub fn registry(&self) -> Result<RuleRegistry, SandpileError> {
        let mut registry = RuleRegistry::builtin();
        for (name, custom) in &self.rules {
            if registry.contains(name) {
                warn!(rule = name.as_str(), "Custom rule shadows a built-in rule, ignoring");
                continue;
            }
            registry.register(custom.to_spec(name)?)?;
        }
        Ok(registry)
    }

    /// Build the configured simulation, resolving the rule eagerly.
    ///
    /// # Errors
    ///
    /// Returns any [`SandpileError`] from rule validation, rule lookup,
    /// or grid allocation.
    pub fn build_simulation(&self) -> Result<Simulation, SandpileError> {
        let registry = self.registry()?;
        Simulation::with_registry(
            self.simulation.size,
            &self.simulation.rule,
            &registry,
            self.simulation.seed,
        )
    }
}

/// Grid size, rule name, and seed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// Side length of the square grid.
    #[serde(default = "default_size")]
    pub size: usize,

    /// Name of the toppling rule.
    #[serde(default = "default_rule")]
    pub rule: String,

    /// Random seed; drawn at startup when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            rule: default_rule(),
            seed: None,
        }
    }
}

/// Warm-up and harvest lengths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of recorded steps after warm-up.
    #[serde(default = "default_steps")]
    pub steps: u64,

    /// Steps discarded before recording. Defaults to `2 * size * size`.
    #[serde(default)]
    pub warmup_steps: Option<u64>,

    /// Whether steps that triggered no avalanche are recorded as well.
    #[serde(default)]
    pub record_empty: bool,
}

impl RunConfig {
    /// Warm-up length for a grid of side `size`.
    ///
    /// Roughly `size^2` grains bring a grid to its critical state; twice
    /// that is used when no explicit value is configured.
    pub fn warmup_for(&self, size: usize) -> u64 {
        self.warmup_steps.unwrap_or_else(|| {
            let side = u64::try_from(size).unwrap_or(u64::MAX);
            side.saturating_mul(side).saturating_mul(2)
        })
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            warmup_steps: None,
            record_empty: false,
        }
    }
}

/// A custom rule as written in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuleConfig {
    /// Grain count at which a cell topples.
    pub threshold: u32,

    /// Neighbour offsets as `[dx, dy]` pairs.
    pub neighbors: Vec<Offset>,

    /// Whether neighbours are sampled with replacement.
    #[serde(default)]
    pub stochastic: bool,
}

impl RuleConfig {
    /// Validate into a [`RuleSpec`] registered under `name`.
    ///
    /// # Errors
    ///
    /// See [`RuleSpec::custom`].
    pub fn to_spec(&self, name: &str) -> Result<RuleSpec, SandpileError> {
        RuleSpec::custom(name, self.threshold, self.neighbors.clone(), self.stochastic)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_size() -> usize {
    50
}

fn default_rule() -> String {
    crate::rule::BTW.to_owned()
}

const fn default_steps() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_owned()
}
