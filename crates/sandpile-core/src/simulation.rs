//! A single sandpile simulation instance.
//!
//! [`Simulation`] owns its grid, its resolved rule, and its random stream.
//! Nothing is shared between instances, so separate instances can be
//! driven from separate threads without coordination.
//!
//! # Time
//!
//! One [`Simulation::step`] drops one grain at a random cell and relaxes
//! the grid until it is stable again. The resulting [`Avalanche`] records
//! how many topples happened (size) and over how many sweeps (duration).
//! Warm-up and record-filtering policies belong to the caller.
//!
//! # Determinism
//!
//! The random stream is a [`StdRng`] seeded from an explicit `u64`. Two
//! instances built with the same seed and driven by the same calls
//! produce identical grids and avalanches. When no seed is given one is
//! drawn from the thread RNG and kept, so [`Simulation::seed`] can replay
//! the run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::error::SandpileError;
use crate::grid::{Grid, GridView};
use crate::rule::{self, RuleRegistry, RuleSpec};
use crate::topple::{self, SweepOutcome};

/// Statistics of one relaxation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Avalanche {
    /// Total number of cell topples.
    pub size: u64,
    /// Number of sweeps that toppled at least one cell.
    pub duration: u64,
}

impl Avalanche {
    /// Whether the relaxation found the grid already stable.
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// A sandpile on an `N x N` grid under one toppling rule.
#[derive(Debug, Clone)]
pub struct Simulation {
    grid: Grid,
    rule: RuleSpec,
    rng: StdRng,
    seed: u64,
}

impl Simulation {
    /// Create an empty simulation using one of the built-in rules.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::InvalidSize`] if `size` is zero and
    /// [`SandpileError::UnknownRule`] if `rule_name` is not built in.
    pub fn new(size: usize, rule_name: &str, seed: Option<u64>) -> Result<Self, SandpileError> {
        let grid = Grid::new(size)?;
        let rule = rule::lookup(rule_name)?;
        Ok(Self::assemble(grid, rule, seed))
    }

    /// Create an empty simulation, resolving the rule through `registry`.
    ///
    /// # Errors
    ///
    /// Same as [`Simulation::new`].
    pub fn with_registry(
        size: usize,
        rule_name: &str,
        registry: &RuleRegistry,
        seed: Option<u64>,
    ) -> Result<Self, SandpileError> {
        let grid = Grid::new(size)?;
        let rule = registry.lookup(rule_name)?;
        Ok(Self::assemble(grid, rule, seed))
    }

    /// Create an empty simulation with an already resolved rule.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::InvalidSize`] if `size` is zero.
    pub fn with_rule(size: usize, rule: RuleSpec, seed: Option<u64>) -> Result<Self, SandpileError> {
        let grid = Grid::new(size)?;
        Ok(Self::assemble(grid, rule, seed))
    }

    /// Create a simulation starting from an explicit matrix.
    ///
    /// The matrix is taken as-is, unstable cells included; nothing topples
    /// until [`Simulation::sweep`] or [`Simulation::relax`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::InvalidSize`] or
    /// [`SandpileError::NonSquareGrid`] if `rows` is not a non-empty
    /// square matrix.
    pub fn from_grid(
        rows: Vec<Vec<u32>>,
        rule: RuleSpec,
        seed: Option<u64>,
    ) -> Result<Self, SandpileError> {
        let grid = Grid::from_rows(rows)?;
        Ok(Self::assemble(grid, rule, seed))
    }

    fn assemble(grid: Grid, rule: RuleSpec, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        info!(
            size = grid.size(),
            rule = rule.name(),
            threshold = rule.threshold(),
            stochastic = rule.is_stochastic(),
            seed,
            "Sandpile created"
        );
        if !rule.is_balanced() {
            debug!(
                rule = rule.name(),
                threshold = rule.threshold(),
                neighbors = rule.neighbors().len(),
                "Rule threshold differs from neighbour count"
            );
        }
        Self {
            grid,
            rule,
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Drop one grain.
    ///
    /// With both coordinates given the grain lands on `(x, y)`. If either
    /// is `None`, both are drawn uniformly from `[0, size)` using the
    /// instance's random stream. Returns the cell that received the grain.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::InvalidCoordinate`] if a supplied
    /// coordinate is outside `[0, size)`, even when the other one is
    /// missing. The grid and the random stream are untouched on error.
    pub fn add_grain(
        &mut self,
        x: Option<usize>,
        y: Option<usize>,
    ) -> Result<(usize, usize), SandpileError> {
        let size = self.grid.size();
        if x.is_some_and(|x| x >= size) || y.is_some_and(|y| y >= size) {
            return Err(SandpileError::InvalidCoordinate { x, y, size });
        }
        match (x, y) {
            (Some(x), Some(y)) => {
                self.grid.add_grain(x, y)?;
                Ok((x, y))
            }
            _ => Ok(self.drop_random_grain()),
        }
    }

    /// Drop one grain on `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::InvalidCoordinate`] if the cell is off the grid.
    pub fn add_grain_at(&mut self, x: usize, y: usize) -> Result<(), SandpileError> {
        self.grid.add_grain(x, y)
    }

    /// Drop one grain on a uniformly random cell and return that cell.
    pub fn drop_random_grain(&mut self) -> (usize, usize) {
        self.grid.add_random_grain(&mut self.rng)
    }

    /// Run one synchronous sweep and return its activity (cells toppled).
    /// Zero means the grid was stable.
    pub fn sweep(&mut self) -> u64 {
        self.sweep_outcome().toppled
    }

    /// Run one synchronous sweep and return the full outcome.
    pub fn sweep_outcome(&mut self) -> SweepOutcome {
        let outcome = topple::sweep(&mut self.grid, &self.rule, &mut self.rng);
        trace!(
            toppled = outcome.toppled,
            dissipated = outcome.dissipated,
            "Sweep"
        );
        outcome
    }

    /// Sweep until the grid is stable.
    ///
    /// Returns `(0, 0)` without touching the grid if it is already stable.
    /// Termination relies on the rule losing grains at the boundary; there
    /// is no sweep cap.
    pub fn relax(&mut self) -> Avalanche {
        let mut avalanche = Avalanche::default();
        loop {
            let activity = self.sweep();
            if activity == 0 {
                break;
            }
            avalanche.size = avalanche.size.saturating_add(activity);
            avalanche.duration = avalanche.duration.saturating_add(1);
        }
        if !avalanche.is_empty() {
            debug!(
                size = avalanche.size,
                duration = avalanche.duration,
                "Avalanche"
            );
        }
        avalanche
    }

    /// Drop one random grain and relax.
    pub fn step(&mut self) -> Avalanche {
        self.drop_random_grain();
        self.relax()
    }

    /// Read-only view of the grid.
    pub const fn grid(&self) -> GridView<'_> {
        self.grid.view()
    }

    /// Side length of the grid.
    pub const fn size(&self) -> usize {
        self.grid.size()
    }

    /// The resolved rule.
    pub const fn rule(&self) -> &RuleSpec {
        &self.rule
    }

    /// Toppling threshold of the active rule.
    pub const fn threshold(&self) -> u32 {
        self.rule.threshold()
    }

    /// Name of the active rule.
    pub fn rule_name(&self) -> &str {
        self.rule.name()
    }

    /// Seed of the random stream.
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}
