//! Per-event disambiguation pipeline.
//!
//! **Stage 1:** Intra-station ghost removal on segments
//! **Stage 2:** Duplicate-candidate removal on trajectories
//! **Stage 3:** Truth tagging of the surviving trajectories (annotation only)
//! **Stage 4:** Pairwise ambiguity decision and state walk diagnostic
//!
//! Every call builds its outputs from scratch; nothing is carried between events.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ambiguity::{solve_ambiguity, PairwiseAmbiguitySolver};
use crate::config::MatchingConfig;
use crate::error::DisambiguationError;
use crate::ghost::{GhostMark, GhostResolver};
use crate::provenance::HitProvenanceIndex;
use crate::state_walk::StateMatch;
use crate::types::{AmbiguityDecision, Segment, TrajectoryCandidate};
use crate::voter::{ParticleHitVoter, TruthTag};

/// Everything the engine returns for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutput {
    /// Segments that survived ghost removal, in input order
    pub segments: Vec<Segment>,

    pub ghost_marks: Vec<GhostMark>,

    /// Candidates that survived duplicate removal, in input order
    pub candidates: Vec<TrajectoryCandidate>,

    /// One tag per entry of `candidates`
    pub truth_tags: Vec<TruthTag>,

    /// Indices into `candidates`; `None` with fewer than two candidates
    pub decision: Option<AmbiguityDecision>,

    /// State walk of the decided pair
    pub state_match: Option<StateMatch>,

    /// Counts before disambiguation
    pub segments_in: usize,
    pub candidates_in: usize,
}

/// Runs the full chain with one validated configuration.
#[derive(Debug, Clone, Default)]
pub struct Disambiguator {
    resolver: GhostResolver,
    solver: PairwiseAmbiguitySolver,
}

impl Disambiguator {
    pub fn new(config: MatchingConfig) -> Result<Self, DisambiguationError> {
        let resolver = GhostResolver::new(config.tolerances());
        let solver = PairwiseAmbiguitySolver::new(config)?;
        Ok(Self { resolver, solver })
    }

    pub fn config(&self) -> &MatchingConfig {
        self.solver.config()
    }

    pub fn resolver(&self) -> &GhostResolver {
        &self.resolver
    }

    pub fn solver(&self) -> &PairwiseAmbiguitySolver {
        &self.solver
    }

    /// Checks every segment against the configured station layer count.
    pub fn validate_segments(&self, segments: &[Segment]) -> Result<(), DisambiguationError> {
        let max = self.config().max_layers_per_station;
        segments.iter().try_for_each(|s| s.validate(max))
    }

    pub fn process_event(
        &self,
        segments: &[Segment],
        candidates: &[TrajectoryCandidate],
        provenance: &HitProvenanceIndex,
    ) -> EventOutput {
        let ghosts = self.resolver.resolve_with_report(segments);
        let kept_candidates = self.resolver.resolve_candidates(candidates);
        let truth_tags = ParticleHitVoter::new(provenance).tag_all(&kept_candidates);

        // Fewer than two candidates is an expected outcome here, not a failure
        let decision = solve_ambiguity(&kept_candidates).ok();
        let state_match = decision
            .as_ref()
            .and_then(|d| self.solver.match_decision(&kept_candidates, d).ok());

        debug!(
            segments_in = segments.len(),
            segments_kept = ghosts.kept.len(),
            candidates_in = candidates.len(),
            candidates_kept = kept_candidates.len(),
            decided = decision.is_some(),
            "event processed"
        );

        EventOutput {
            segments: ghosts.kept,
            ghost_marks: ghosts.marks,
            candidates: kept_candidates,
            truth_tags,
            decision,
            state_match,
            segments_in: segments.len(),
            candidates_in: candidates.len(),
        }
    }
}
