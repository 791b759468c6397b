//! Synchronous toppling sweeps.
//!
//! A sweep runs in two phases. First the full set of unstable cells
//! (value `>= threshold`) is read from the grid before anything changes.
//! Then every collected cell loses `threshold` grains and its neighbours
//! gain grains according to the rule. A cell pushed over the threshold by
//! this sweep's redistribution waits for the next sweep.
//!
//! Subtractions touch only the collected cells and additions are plain
//! increments, so the order in which collected cells are processed does
//! not change the resulting grid.
//!
//! # Redistribution
//!
//! - Deterministic rules send one grain to every neighbour offset.
//! - Stochastic rules draw `threshold` offsets uniformly with replacement;
//!   a neighbour may receive several grains from one topple, or none.
//!
//! Either way, a grain aimed past the edge of the grid is lost (open
//! boundary). That loss is what lets a cascade end; this module does not
//! cap the number of sweeps.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::grid::Grid;
use crate::rule::RuleSpec;

/// What a single sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepOutcome {
    /// Number of cells that toppled (the sweep's activity).
    pub toppled: u64,
    /// Number of grains sent past the edge of the grid.
    pub dissipated: u64,
}

impl SweepOutcome {
    /// Whether the grid was already stable.
    pub const fn is_quiet(&self) -> bool {
        self.toppled == 0
    }
}

/// Topple every currently unstable cell once.
///
/// `rng` is consulted only by stochastic rules.
pub fn sweep<R: Rng + ?Sized>(grid: &mut Grid, rule: &RuleSpec, rng: &mut R) -> SweepOutcome {
    let threshold = rule.threshold();
    let unstable = grid.unstable_cells(threshold);

    let mut dissipated: u64 = 0;
    for &(x, y) in &unstable {
        grid.remove(x, y, threshold);
        let lost = if rule.is_stochastic() {
            scatter(grid, x, y, rule, rng)
        } else {
            spread(grid, x, y, rule)
        };
        dissipated = dissipated.saturating_add(lost);
    }

    SweepOutcome {
        toppled: u64::try_from(unstable.len()).unwrap_or(u64::MAX),
        dissipated,
    }
}

/// One grain to each neighbour offset. Returns the number lost off-grid.
fn spread(grid: &mut Grid, x: usize, y: usize, rule: &RuleSpec) -> u64 {
    let mut lost: u64 = 0;
    for &offset in rule.neighbors() {
        if !grid.deposit(x, y, offset) {
            lost = lost.saturating_add(1);
        }
    }
    lost
}

/// `threshold` grains to uniformly sampled neighbour offsets. Returns the
/// number lost off-grid.
fn scatter<R: Rng + ?Sized>(
    grid: &mut Grid,
    x: usize,
    y: usize,
    rule: &RuleSpec,
    rng: &mut R,
) -> u64 {
    let mut lost: u64 = 0;
    for _ in 0..rule.threshold() {
        let Some(&offset) = rule.neighbors().choose(rng) else {
            break;
        };
        if !grid.deposit(x, y, offset) {
            lost = lost.saturating_add(1);
        }
    }
    lost
}
