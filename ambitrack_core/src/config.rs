//! Matching configuration.
//!
//! All tolerances are plain values handed to the engine by the caller.
//! Nothing inside the matcher or the solver hard-codes them.

use serde::{Deserialize, Serialize};

use crate::error::DisambiguationError;

/// Configuration for ghost removal and trajectory matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Maximum |Δx| (exclusive) for two segments to be compatible (default: 0.5 mm)
    pub x_tolerance: f64,

    /// Maximum |Δy| (exclusive) for two segments to be compatible (default: 0.25 mm)
    pub y_tolerance: f64,

    /// Maximum |Δz| (exclusive) for two fitted states to be walked as a match (default: 0.03)
    pub state_match_epsilon: f64,

    /// Upper bound on the hit count of a single-station segment (default: 12)
    pub max_layers_per_station: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            x_tolerance: 0.5,
            y_tolerance: 0.25,
            state_match_epsilon: 0.03,
            max_layers_per_station: 12,
        }
    }
}

impl MatchingConfig {
    /// Checks that every tolerance is finite and strictly positive.
    pub fn validate(&self) -> Result<(), DisambiguationError> {
        for (name, value) in [
            ("x_tolerance", self.x_tolerance),
            ("y_tolerance", self.y_tolerance),
            ("state_match_epsilon", self.state_match_epsilon),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DisambiguationError::invalid_tolerance(name, value));
            }
        }
        Ok(())
    }

    /// The per-axis tolerance box used for segment compatibility.
    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            x: self.x_tolerance,
            y: self.y_tolerance,
        }
    }

    /// Parses a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Independent per-axis tolerances (an axis-aligned box, not a radius).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub x: f64,
    pub y: f64,
}

impl Tolerances {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        MatchingConfig::default().tolerances()
    }
}
