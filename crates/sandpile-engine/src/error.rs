//! Error types for the sandpile engine binary.
//!
//! [`EngineError`] wraps every failure mode of engine startup so `main`
//! can propagate with `?`.

/// Top-level error for the sandpile engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: sandpile_core::ConfigError,
    },

    /// The configured simulation could not be built.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: sandpile_core::SandpileError,
    },
}
