//! Sandpile cellular automaton for studying self-organized criticality.
//!
//! Grains are dropped onto a square grid. A cell holding at least the
//! rule's threshold topples: it loses `threshold` grains and its
//! neighbours gain grains, possibly tipping them in turn. The cascade
//! triggered by one grain is an avalanche, measured by its size (total
//! topples) and duration (number of synchronous sweeps).
//!
//! # Modules
//!
//! - [`rule`] -- Built-in rules (`BTW`, `MOORE`, `STOCHASTIC`), custom
//!   rules, and the name-keyed [`RuleRegistry`].
//! - [`grid`] -- The occupancy [`Grid`] and its read-only [`GridView`].
//! - [`topple`] -- One synchronous sweep over the grid.
//! - [`simulation`] -- [`Simulation`]: grain injection, relaxation, and
//!   the step that composes them.
//! - [`config`] -- Run configuration loaded from `sandpile-config.yaml`.
//! - [`error`] -- [`SandpileError`].
//!
//! # Example
//!
//! ```
//! use sandpile_core::Simulation;
//!
//! let mut sim = Simulation::new(3, "BTW", Some(7))?;
//! for _ in 0..4 {
//!     sim.add_grain(Some(1), Some(1))?;
//! }
//! let avalanche = sim.relax();
//! assert_eq!((avalanche.size, avalanche.duration), (1, 1));
//! assert_eq!(sim.grid().get(0, 1), Some(1));
//! # Ok::<(), sandpile_core::SandpileError>(())
//! ```

pub mod config;
pub mod error;
pub mod grid;
pub mod rule;
pub mod simulation;
pub mod topple;

// Re-export primary types at crate root.
pub use config::{ConfigError, SandpileConfig};
pub use error::SandpileError;
pub use grid::{Grid, GridView};
pub use rule::{Offset, RuleRegistry, RuleSpec};
pub use simulation::{Avalanche, Simulation};
pub use topple::SweepOutcome;
