//! AmbiTrack Core - Track-Candidate Disambiguation and Truth Association
//!
//! Takes independently reconstructed trajectory candidates and:
//! 1. **Ghost Problem**: removes near-duplicate segments per station
//! 2. **Shared-Hit Problem**: decides between candidates that reuse hits
//! 3. **Truth Problem**: tags each candidate with its majority truth particle
//!
//! All entry points are synchronous functions over caller-owned inputs.
//! No state survives between events.

pub mod ambiguity;
pub mod config;
pub mod error;
pub mod geometry;
pub mod ghost;
pub mod pipeline;
pub mod provenance;
pub mod state_walk;
pub mod types;
pub mod validation;
pub mod voter;

// Re-export key types for convenience
pub use ambiguity::{count_shared_hits, solve_ambiguity, solve_assignment, PairwiseAmbiguitySolver, SharedHitMatrix};
pub use config::{MatchingConfig, Tolerances};
pub use error::DisambiguationError;
pub use geometry::{compare_quality, positions_compatible, quality_rank};
pub use ghost::{GhostMark, GhostResolution, GhostResolver, SegmentState};
pub use pipeline::{Disambiguator, EventOutput};
pub use provenance::HitProvenanceIndex;
pub use state_walk::{walk_states, StateMatch};
pub use types::{
    AmbiguityDecision, CandidateStatus, DetectorElementId, FittedState, HitCollection, Measurement,
    MeasurementId, ParticleHitCount, ParticleId, Segment, TrajectoryCandidate, TruthDeposit,
};
pub use validation::ValidationSummary;
pub use voter::{ParticleHitVoter, TruthTag};
