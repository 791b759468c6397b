//! Warm-up and avalanche harvesting.
//!
//! A fresh grid is far from its critical state, so the first steps are
//! run and thrown away. After warm-up every step is counted and, unless
//! it triggered nothing and empty steps are not wanted, recorded.

use sandpile_core::Simulation;
use sandpile_core::config::RunConfig;
use tracing::info;

use crate::stats::AvalancheStats;

/// Steps between progress log lines.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Run warm-up steps and return how many were run.
pub fn warm_up(sim: &mut Simulation, steps: u64) -> u64 {
    info!(steps, size = sim.size(), rule = sim.rule_name(), "Warm-up starting");
    for _ in 0..steps {
        sim.step();
    }
    info!(
        steps,
        mass = sim.grid().total_mass(),
        "Warm-up complete"
    );
    steps
}

/// Warm the simulation up, then record `run.steps` steps.
pub fn harvest(sim: &mut Simulation, run: &RunConfig) -> AvalancheStats {
    warm_up(sim, run.warmup_for(sim.size()));

    let mut stats = AvalancheStats::new();
    for step in 1..=run.steps {
        let avalanche = sim.step();
        if avalanche.is_empty() && !run.record_empty {
            stats.observe();
        } else {
            stats.record(avalanche);
        }
        if step.checked_rem(PROGRESS_INTERVAL) == Some(0) {
            info!(
                step,
                recorded = stats.recorded(),
                max_size = stats.max_size(),
                "Harvest progress"
            );
        }
    }
    stats
}
