//! Error types for the `sandpile-core` crate.
//!
//! Every failure here is a programming or configuration error. Nothing is
//! transient, so nothing is retried: the error surfaces immediately and,
//! where the operation mutates state, before any mutation happens.

/// Errors that can occur while building or driving a sandpile simulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandpileError {
    /// The requested rule name is not present in the registry.
    #[error("unknown toppling rule: {name}")]
    UnknownRule {
        /// The name that failed to resolve.
        name: String,
    },

    /// The grid side length must be at least 1.
    #[error("invalid grid size: {size}")]
    InvalidSize {
        /// The rejected side length.
        size: usize,
    },

    /// An explicitly supplied coordinate lies outside `[0, size)`.
    #[error("coordinate ({x:?}, {y:?}) is outside a {size}x{size} grid")]
    InvalidCoordinate {
        /// The supplied row coordinate, if any.
        x: Option<usize>,
        /// The supplied column coordinate, if any.
        y: Option<usize>,
        /// Side length of the grid.
        size: usize,
    },

    /// A custom rule declared a toppling threshold of zero.
    #[error("rule {name} has a zero toppling threshold")]
    InvalidThreshold {
        /// The offending rule.
        name: String,
    },

    /// A custom rule declared no neighbour offsets.
    #[error("rule {name} has no neighbour offsets")]
    EmptyNeighborhood {
        /// The offending rule.
        name: String,
    },

    /// A rule with this name is already registered.
    #[error("rule {name} is already registered")]
    DuplicateRule {
        /// The conflicting rule name.
        name: String,
    },

    /// A seed matrix was not square.
    #[error("grid row {row} has {len} cells, expected {rows}")]
    NonSquareGrid {
        /// Number of rows in the matrix (the expected row length).
        rows: usize,
        /// Index of the first offending row.
        row: usize,
        /// Length of the offending row.
        len: usize,
    },
}
