//! Scenario runner - generates events and checks engine invariants on them.

use crate::error::SimError;
use crate::exporter::{EventRecord, SimExport};
use crate::oracle::{SimEvent, TruthOracle, LAYERS_PER_STATION, STATIONS};
use crate::scenarios::ScenarioId;

use ambitrack_core::{
    count_shared_hits, Disambiguator, EventOutput, HitProvenanceIndex, MatchingConfig, ParticleId,
    ValidationSummary,
};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether every event passed all checks
    pub passed: bool,

    /// Events generated
    pub events: usize,

    /// First failure message, if any
    pub failure_reason: Option<String>,

    /// Aggregated engine figures
    pub summary: ValidationSummary,

    /// Per-event records
    pub export: SimExport,
}

/// Runs scenarios against one engine configuration.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Events per scenario
    events: usize,

    engine: Disambiguator,
}

impl ScenarioRunner {
    /// Creates a new scenario runner with the default matching configuration.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            events: 10,
            engine: Disambiguator::default(),
        }
    }

    /// Sets the number of events per scenario.
    pub fn with_events(mut self, events: usize) -> Self {
        self.events = events;
        self
    }

    /// Replaces the matching configuration.
    pub fn with_config(mut self, config: MatchingConfig) -> Result<Self, SimError> {
        self.engine = Disambiguator::new(config)?;
        Ok(self)
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        // Physics seed kept apart from the master seed, as for every subsystem
        let physics_seed = self.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let mut oracle = TruthOracle::new(physics_seed);
        let spec = scenario.event_spec();

        let mut summary = ValidationSummary::new();
        let mut export = SimExport::new(scenario.name(), self.seed);
        let mut failures: Vec<String> = Vec::new();

        for event_idx in 0..self.events {
            let event = oracle.generate_event(&spec);
            self.engine.validate_segments(&event.segments)?;

            let provenance = HitProvenanceIndex::from_deposits(event.deposits.iter().copied());
            let output = self
                .engine
                .process_event(&event.segments, &event.candidates, &provenance);

            for failure in self.check_event(scenario, &event, &output) {
                warn!("  event {}: {}", event_idx, failure);
                failures.push(format!("event {}: {}", event_idx, failure));
            }

            debug!(
                "  event {} | segments {} -> {} | candidates {} -> {} | decision {:?}",
                event_idx,
                output.segments_in,
                output.segments.len(),
                output.candidates_in,
                output.candidates.len(),
                output.decision.map(|d| d.pair()),
            );

            summary.record(&output);
            let particles = event.particles.iter().map(|p| p.id).collect();
            export.add_event(EventRecord::new(event_idx, particles, &output));
        }

        let passed = failures.is_empty();
        export.finalize(passed, summary.clone());

        info!(
            "✓ {} complete: ghost rate {:.3}, duplicate rate {:.3}, mean purity {:.3}",
            scenario.name(),
            summary.ghost_rate(),
            summary.duplicate_rate(),
            summary.mean_purity(),
        );

        Ok(ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            events: self.events,
            failure_reason: failures.into_iter().next(),
            summary,
            export,
        })
    }

    /// Checks one event's output against what the oracle injected.
    fn check_event(
        &self,
        scenario: ScenarioId,
        event: &SimEvent,
        output: &EventOutput,
    ) -> Vec<String> {
        let mut failures = Vec::new();

        if output.ghost_marks.len() != event.expected_ghosts {
            failures.push(format!(
                "removed {} ghost segments, expected {}",
                output.ghost_marks.len(),
                event.expected_ghosts
            ));
        }

        // Ghost removal must be a fixed point
        if self.engine.resolver().resolve(&output.segments) != output.segments {
            failures.push("second ghost pass changed the result".to_string());
        }

        let stations_in: BTreeSet<u8> = event.segments.iter().map(|s| s.station).collect();
        let stations_out: BTreeSet<u8> = output.segments.iter().map(|s| s.station).collect();
        if stations_in != stations_out {
            let emptied: Vec<_> = stations_in.difference(&stations_out).collect();
            failures.push(format!("stations {:?} emptied by ghost removal", emptied));
        }

        let expected_candidates = event.candidates.len() - event.injected_duplicates;
        if output.candidates.len() != expected_candidates {
            failures.push(format!(
                "kept {} candidates, expected {}",
                output.candidates.len(),
                expected_candidates
            ));
        }

        for (i, a) in output.candidates.iter().enumerate() {
            for b in &output.candidates[i + 1..] {
                if count_shared_hits(a, b) != count_shared_hits(b, a) {
                    failures.push(format!("asymmetric shared-hit count for candidate {}", i));
                }
            }
        }

        let generated: BTreeSet<ParticleId> = event.particles.iter().map(|p| p.id).collect();
        let tagged: BTreeSet<ParticleId> = output
            .truth_tags
            .iter()
            .filter_map(|t| t.majority.map(|m| m.particle))
            .collect();
        if tagged != generated {
            failures.push(format!(
                "majority particles {:?} do not match generated {:?}",
                tagged, generated
            ));
        }

        // Noise hits carry no truth, so they only dilute the majority
        let true_hits = STATIONS.len() * LAYERS_PER_STATION as usize;
        let noise_hits = scenario.event_spec().noise_hits_per_candidate;
        let expected_purity = true_hits as f64 / (true_hits + noise_hits) as f64;
        for (i, tag) in output.truth_tags.iter().enumerate() {
            if !(0.0..=1.0).contains(&tag.purity) {
                failures.push(format!("candidate {} purity {} outside [0, 1]", i, tag.purity));
            } else if (tag.purity - expected_purity).abs() > 1e-9 {
                failures.push(format!(
                    "candidate {} purity {:.3}, expected {:.3}",
                    i, tag.purity, expected_purity
                ));
            }
        }

        match (output.candidates.len() >= 2, output.decision) {
            (true, None) => failures.push("no ambiguity decision for 2+ candidates".to_string()),
            (false, Some(_)) => failures.push("decision made with fewer than 2 candidates".to_string()),
            _ => {}
        }
        if scenario == ScenarioId::CrossingPair {
            if let Some(decision) = output.decision {
                if decision.shared_hits != event.shared_hits {
                    failures.push(format!(
                        "decision reports {} shared hits, oracle shared {}",
                        decision.shared_hits, event.shared_hits
                    ));
                }
            }
        }

        failures
    }
}
