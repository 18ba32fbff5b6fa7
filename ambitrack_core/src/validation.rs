//! Validation Summary - Truth-Tag Aggregation Across Events
//! =========================================================
//!
//! Accumulates per-event engine outputs into the figures an analysis
//! writer reports: ghost rates, duplicate rates, truth coverage and
//! purity.
//!
//! Usage:
//! ```ignore
//! use ambitrack_core::validation::ValidationSummary;
//!
//! let mut summary = ValidationSummary::default();
//! for event in events {
//!     let output = engine.process_event(&event.segments, &event.candidates, &event.truth);
//!     summary.record(&output);
//! }
//! println!("{}", summary.to_json()?);
//! ```

use serde::{Deserialize, Serialize};

use crate::pipeline::EventOutput;

/// Counters accumulated over many events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub events: usize,

    pub segments_in: usize,
    pub ghost_segments: usize,

    pub candidates_in: usize,
    pub candidates_kept: usize,

    /// Kept candidates with a majority truth particle
    pub tagged_candidates: usize,

    /// Kept candidates whose purity is exactly 1
    pub pure_candidates: usize,

    /// Sum of purity over tagged candidates
    pub purity_sum: f64,

    /// Events that produced an ambiguity decision
    pub decisions: usize,

    /// Sum of state-walk match fractions over decided events
    pub match_fraction_sum: f64,
}

impl ValidationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, output: &EventOutput) {
        self.events += 1;
        self.segments_in += output.segments_in;
        self.ghost_segments += output.ghost_marks.len();
        self.candidates_in += output.candidates_in;
        self.candidates_kept += output.candidates.len();

        for tag in output.truth_tags.iter().filter(|t| t.majority.is_some()) {
            self.tagged_candidates += 1;
            self.purity_sum += tag.purity;
            if tag.purity >= 1.0 {
                self.pure_candidates += 1;
            }
        }

        if output.decision.is_some() {
            self.decisions += 1;
            if let Some(walk) = &output.state_match {
                self.match_fraction_sum += walk.match_fraction;
            }
        }
    }

    /// Mean purity of tagged candidates
    pub fn mean_purity(&self) -> f64 {
        if self.tagged_candidates > 0 {
            self.purity_sum / self.tagged_candidates as f64
        } else {
            0.0
        }
    }

    /// Fraction of input segments removed as ghosts
    pub fn ghost_rate(&self) -> f64 {
        if self.segments_in > 0 {
            self.ghost_segments as f64 / self.segments_in as f64
        } else {
            0.0
        }
    }

    /// Fraction of input candidates removed as duplicates
    pub fn duplicate_rate(&self) -> f64 {
        if self.candidates_in > 0 {
            self.candidates_in.saturating_sub(self.candidates_kept) as f64 / self.candidates_in as f64
        } else {
            0.0
        }
    }

    /// Fraction of kept candidates with any truth at all
    pub fn truth_coverage(&self) -> f64 {
        if self.candidates_kept > 0 {
            self.tagged_candidates as f64 / self.candidates_kept as f64
        } else {
            0.0
        }
    }

    pub fn mean_match_fraction(&self) -> f64 {
        if self.decisions > 0 {
            self.match_fraction_sum / self.decisions as f64
        } else {
            0.0
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&serde_json::json!({
            "events": self.events,
            "ghost_rate": self.ghost_rate(),
            "duplicate_rate": self.duplicate_rate(),
            "truth_coverage": self.truth_coverage(),
            "mean_purity": self.mean_purity(),
            "decisions": self.decisions,
            "mean_match_fraction": self.mean_match_fraction(),
            "counters": self,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParticleHitCount, ParticleId};
    use crate::voter::TruthTag;
    use approx::assert_relative_eq;

    fn output(tags: Vec<TruthTag>, ghosts: usize, segments_in: usize) -> EventOutput {
        EventOutput {
            segments: Vec::new(),
            ghost_marks: (0..ghosts)
                .map(|i| crate::ghost::GhostMark {
                    ghost: i + 1,
                    winner: 0,
                    station: 1,
                })
                .collect(),
            candidates: Vec::new(),
            truth_tags: tags,
            decision: None,
            state_match: None,
            segments_in,
            candidates_in: 0,
        }
    }

    fn tag(purity: f64) -> TruthTag {
        TruthTag {
            majority: Some(ParticleHitCount {
                particle: ParticleId(1),
                hit_count: 1,
                energy: 0.1,
            }),
            purity,
            hit_count: 4,
        }
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = ValidationSummary::new();
        assert_eq!(summary.mean_purity(), 0.0);
        assert_eq!(summary.ghost_rate(), 0.0);
        assert_eq!(summary.duplicate_rate(), 0.0);
    }

    #[test]
    fn test_accumulates_purity_and_ghosts() {
        let mut summary = ValidationSummary::new();
        let untagged = TruthTag {
            majority: None,
            purity: 0.0,
            hit_count: 3,
        };
        summary.record(&output(vec![tag(1.0), tag(0.5), untagged], 1, 4));
        summary.record(&output(vec![tag(0.75)], 0, 4));

        assert_eq!(summary.events, 2);
        assert_eq!(summary.tagged_candidates, 3);
        assert_eq!(summary.pure_candidates, 1);
        assert_relative_eq!(summary.mean_purity(), 0.75);
        assert_relative_eq!(summary.ghost_rate(), 0.125);
    }

    #[test]
    fn test_duplicate_rate_never_underflows() {
        let mut inconsistent = output(Vec::new(), 0, 0);
        inconsistent.candidates_in = 1;
        inconsistent.candidates = vec![
            crate::types::TrajectoryCandidate::new(Vec::new(), 1.0, 1),
            crate::types::TrajectoryCandidate::new(Vec::new(), 2.0, 1),
        ];

        let mut summary = ValidationSummary::new();
        summary.record(&inconsistent);
        assert_eq!(summary.duplicate_rate(), 0.0);
    }

    #[test]
    fn test_json_contains_rates() {
        let mut summary = ValidationSummary::new();
        summary.record(&output(vec![tag(1.0)], 0, 1));
        let json = summary.to_json().unwrap();
        assert!(json.contains("\"mean_purity\": 1.0"));
        assert!(json.contains("\"counters\""));
    }
}
