//! JSON exporter for the analysis writer.
//!
//! Exports per-event truth tags and decisions as JSON.

use ambitrack_core::{AmbiguityDecision, EventOutput, GhostMark, ParticleId, StateMatch, TruthTag, ValidationSummary};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::SimError;

/// Engine output for a single event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: usize,

    /// Particles the oracle generated
    pub particles: Vec<ParticleId>,

    pub segments_in: usize,
    pub segments_kept: usize,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ghost_marks: Vec<GhostMark>,

    pub candidates_in: usize,

    /// One tag per kept candidate
    pub truth_tags: Vec<TruthTag>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<AmbiguityDecision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_match: Option<StateMatch>,
}

impl EventRecord {
    pub fn new(event: usize, particles: Vec<ParticleId>, output: &EventOutput) -> Self {
        Self {
            event,
            particles,
            segments_in: output.segments_in,
            segments_kept: output.segments.len(),
            ghost_marks: output.ghost_marks.clone(),
            candidates_in: output.candidates_in,
            truth_tags: output.truth_tags.clone(),
            decision: output.decision,
            state_match: output.state_match,
        }
    }
}

/// Complete scenario export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// All events
    pub events: Vec<EventRecord>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ValidationSummary>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            events: Vec::new(),
            passed: false,
            summary: None,
        }
    }

    pub fn add_event(&mut self, record: EventRecord) {
        self.events.push(record);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, summary: ValidationSummary) {
        self.passed = passed;
        self.summary = Some(summary);
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_serializes_without_empty_fields() {
        let mut export = SimExport::new("clean_tracks", 42);
        export.add_event(EventRecord {
            event: 0,
            particles: vec![ParticleId(1)],
            segments_in: 3,
            segments_kept: 3,
            ghost_marks: Vec::new(),
            candidates_in: 1,
            truth_tags: Vec::new(),
            decision: None,
            state_match: None,
        });
        export.finalize(true, ValidationSummary::default());

        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"scenario\":\"clean_tracks\""));
        assert!(!json.contains("\"ghost_marks\":"));
        assert!(!json.contains("\"decision\":"));
        assert!(!json.contains("\"state_match\":"));

        let back: SimExport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.events.len(), 1);
        assert!(back.passed);
    }
}
