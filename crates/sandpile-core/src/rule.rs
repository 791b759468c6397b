//! Toppling rules and the registry that resolves them by name.
//!
//! A rule fixes three things: the threshold at which a cell becomes
//! unstable, the ordered neighbour offsets that receive grains when it
//! topples, and whether redistribution is deterministic or sampled.
//!
//! | Rule         | Threshold | Neighbours           | Stochastic |
//! |--------------|-----------|----------------------|------------|
//! | `BTW`        | 4         | von Neumann (4)      | no         |
//! | `MOORE`      | 8         | von Neumann + 4 diag | no         |
//! | `STOCHASTIC` | 4         | von Neumann (4)      | yes        |
//!
//! Rules are resolved once, when a simulation is constructed, so a
//! misspelled name fails before any grain is dropped.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SandpileError;

/// A neighbour offset `(dx, dy)` relative to the toppling cell.
pub type Offset = (i32, i32);

/// Name of the Bak-Tang-Wiesenfeld rule.
pub const BTW: &str = "BTW";

/// Name of the eight-neighbour Moore rule.
pub const MOORE: &str = "MOORE";

/// Name of the stochastic von Neumann rule.
pub const STOCHASTIC: &str = "STOCHASTIC";

const VON_NEUMANN_OFFSETS: [Offset; 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

const MOORE_OFFSETS: [Offset; 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

/// A resolved, immutable toppling rule.
///
/// # Threshold and neighbourhood
///
/// Nothing ties `threshold` to the number of neighbour offsets. A
/// deterministic rule always sends exactly one grain to each listed
/// neighbour, whatever the threshold, so a custom rule whose threshold
/// exceeds its neighbour count silently loses the remainder on every
/// topple, and one whose threshold is smaller creates grains. Use
/// [`RuleSpec::is_balanced`] to detect the mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSpec {
    /// Registry name of the rule.
    name: String,
    /// Grain count at which a cell topples.
    threshold: u32,
    /// Ordered neighbour offsets receiving grains.
    neighbors: Vec<Offset>,
    /// Whether grains go to sampled rather than fixed neighbours.
    stochastic: bool,
}

impl RuleSpec {
    /// The classic BTW rule: threshold 4, one grain to each von Neumann neighbour.
    pub fn btw() -> Self {
        Self {
            name: BTW.to_owned(),
            threshold: 4,
            neighbors: VON_NEUMANN_OFFSETS.to_vec(),
            stochastic: false,
        }
    }

    /// The Moore rule: threshold 8, one grain to each of the eight surrounding cells.
    pub fn moore() -> Self {
        Self {
            name: MOORE.to_owned(),
            threshold: 8,
            neighbors: MOORE_OFFSETS.to_vec(),
            stochastic: false,
        }
    }

    /// The stochastic rule: threshold 4, four von Neumann neighbours drawn
    /// uniformly with replacement on every topple.
    pub fn stochastic() -> Self {
        Self {
            name: STOCHASTIC.to_owned(),
            threshold: 4,
            neighbors: VON_NEUMANN_OFFSETS.to_vec(),
            stochastic: true,
        }
    }

    /// Build a custom rule.
    ///
    /// Only a zero threshold and an empty neighbourhood are rejected. The
    /// threshold is deliberately not checked against the neighbour count;
    /// see the type-level documentation.
    pub fn custom(
        name: &str,
        threshold: u32,
        neighbors: Vec<Offset>,
        stochastic: bool,
    ) -> Result<Self, SandpileError> {
        if threshold == 0 {
            return Err(SandpileError::InvalidThreshold {
                name: name.to_owned(),
            });
        }
        if neighbors.is_empty() {
            return Err(SandpileError::EmptyNeighborhood {
                name: name.to_owned(),
            });
        }
        Ok(Self {
            name: name.to_owned(),
            threshold,
            neighbors,
            stochastic,
        })
    }

    /// Registry name of the rule.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grain count at which a cell topples.
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Ordered neighbour offsets.
    pub fn neighbors(&self) -> &[Offset] {
        &self.neighbors
    }

    /// Whether redistribution samples neighbours at random.
    pub const fn is_stochastic(&self) -> bool {
        self.stochastic
    }

    /// Whether an interior topple conserves mass, i.e. the threshold
    /// equals the number of neighbour offsets.
    pub fn is_balanced(&self) -> bool {
        usize::try_from(self.threshold).is_ok_and(|t| t == self.neighbors.len())
    }
}

/// Look up one of the built-in rules by name.
pub fn lookup(name: &str) -> Result<RuleSpec, SandpileError> {
    match name {
        BTW => Ok(RuleSpec::btw()),
        MOORE => Ok(RuleSpec::moore()),
        STOCHASTIC => Ok(RuleSpec::stochastic()),
        _ => Err(SandpileError::UnknownRule {
            name: name.to_owned(),
        }),
    }
}

/// Name-keyed table of rules, seeded with the built-ins.
///
/// Custom rules (typically from the `rules` section of the YAML config)
/// are added with [`RuleRegistry::register`] and may not replace an
/// existing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRegistry {
    rules: BTreeMap<String, RuleSpec>,
}

impl RuleRegistry {
    /// A registry holding only `BTW`, `MOORE`, and `STOCHASTIC`.
    pub fn builtin() -> Self {
        let rules = [RuleSpec::btw(), RuleSpec::moore(), RuleSpec::stochastic()]
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect();
        Self { rules }
    }

    /// Add a rule under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::DuplicateRule`] if the name is taken.
    pub fn register(&mut self, spec: RuleSpec) -> Result<(), SandpileError> {
        if self.rules.contains_key(spec.name()) {
            return Err(SandpileError::DuplicateRule { name: spec.name });
        }
        self.rules.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Resolve a rule by name.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::UnknownRule`] if no rule has this name.
    pub fn lookup(&self, name: &str) -> Result<RuleSpec, SandpileError> {
        self.rules
            .get(name)
            .cloned()
            .ok_or_else(|| SandpileError::UnknownRule {
                name: name.to_owned(),
            })
    }

    /// Whether a rule with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// Registered rule names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
