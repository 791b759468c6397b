//! Avalanche statistics accumulated over a harvest.
//!
//! [`AvalancheStats`] keeps running totals and extremes plus exact
//! frequency tables (`size -> count`, `duration -> count`). The tables are
//! the raw material for size and duration distributions; binning and
//! plotting are left to whoever consumes them.

use std::collections::BTreeMap;

use sandpile_core::Avalanche;
use serde::Serialize;

/// Running statistics over recorded avalanches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AvalancheStats {
    /// Steps observed, recorded or not.
    steps: u64,
    /// Avalanches recorded.
    recorded: u64,
    /// Sum of recorded sizes.
    total_size: u64,
    /// Largest recorded size.
    max_size: u64,
    /// Sum of recorded durations.
    total_duration: u64,
    /// Longest recorded duration.
    max_duration: u64,
    /// How many recorded avalanches had each size.
    sizes: BTreeMap<u64, u64>,
    /// How many recorded avalanches had each duration.
    durations: BTreeMap<u64, u64>,
}

impl AvalancheStats {
    /// Empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one step without recording its avalanche.
    pub const fn observe(&mut self) {
        self.steps = self.steps.saturating_add(1);
    }

    /// Count one step and record its avalanche.
    pub fn record(&mut self, avalanche: Avalanche) {
        self.observe();
        self.recorded = self.recorded.saturating_add(1);
        self.total_size = self.total_size.saturating_add(avalanche.size);
        self.max_size = self.max_size.max(avalanche.size);
        self.total_duration = self.total_duration.saturating_add(avalanche.duration);
        self.max_duration = self.max_duration.max(avalanche.duration);

        let count = self.sizes.entry(avalanche.size).or_insert(0);
        *count = count.saturating_add(1);
        let count = self.durations.entry(avalanche.duration).or_insert(0);
        *count = count.saturating_add(1);
    }

    /// Steps observed, recorded or not.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Avalanches recorded.
    pub const fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Largest recorded size.
    pub const fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Longest recorded duration.
    pub const fn max_duration(&self) -> u64 {
        self.max_duration
    }

    /// Mean recorded size, or `None` if nothing was recorded.
    pub fn mean_size(&self) -> Option<f64> {
        mean(self.total_size, self.recorded)
    }

    /// Mean recorded duration, or `None` if nothing was recorded.
    pub fn mean_duration(&self) -> Option<f64> {
        mean(self.total_duration, self.recorded)
    }

    /// Recorded size frequencies, ascending by size.
    pub const fn size_frequencies(&self) -> &BTreeMap<u64, u64> {
        &self.sizes
    }

    /// Recorded duration frequencies, ascending by duration.
    pub const fn duration_frequencies(&self) -> &BTreeMap<u64, u64> {
        &self.durations
    }
}

fn mean(total: u64, count: u64) -> Option<f64> {
    if count == 0 {
        return None;
    }
    // Totals are step counts; precision loss only past 2^53.
    #[allow(clippy::cast_precision_loss)]
    let value = total as f64 / count as f64;
    Some(value)
}
