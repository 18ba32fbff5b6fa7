//! Error types for the disambiguation engine.
//!
//! Only broken call contracts are errors. "No match", "no truth" and
//! "different station" are ordinary outcomes and surface as empty results.

use thiserror::Error;

/// Errors that can occur while disambiguating candidates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DisambiguationError {
    /// The ambiguity solver needs at least two candidates
    #[error("Insufficient candidates: need at least 2, got {found}")]
    InsufficientCandidates { found: usize },

    /// An index does not refer to any supplied candidate
    #[error("Candidate index {index} out of range for {len} candidates")]
    CandidateIndexOutOfRange { index: usize, len: usize },

    /// A configured tolerance is non-finite or not strictly positive
    #[error("Invalid tolerance {name}: {value}")]
    InvalidTolerance { name: &'static str, value: f64 },

    /// A segment claims more hits than its station has layers
    #[error("Segment in station {station} has {hits} hits, station only has {max} layers")]
    HitCountExceedsLayers { station: u8, hits: usize, max: usize },

    /// The exhaustive one-to-one assignment is bounded in size
    #[error("Assignment of size {size} exceeds the maximum of {max}")]
    AssignmentTooLarge { size: usize, max: usize },
}

impl DisambiguationError {
    /// Creates an invalid-tolerance error.
    pub fn invalid_tolerance(name: &'static str, value: f64) -> Self {
        Self::InvalidTolerance { name, value }
    }

    /// Creates an index-out-of-range error.
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::CandidateIndexOutOfRange { index, len }
    }
}
