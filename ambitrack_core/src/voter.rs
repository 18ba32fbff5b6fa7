//! Majority-vote truth association.
//!
//! Tags candidates with the truth particle that contributed most of their
//! hits. Tags are annotations only; nothing is dropped on low purity.

use serde::{Deserialize, Serialize};

use crate::provenance::HitProvenanceIndex;
use crate::types::{HitCollection, ParticleHitCount};

/// Truth annotation attached to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthTag {
    /// Majority particle, `None` when no hit carries truth
    pub majority: Option<ParticleHitCount>,

    /// Fraction of hits from the majority particle, in [0, 1]
    pub purity: f64,

    /// Hits of the tagged candidate
    pub hit_count: usize,
}

/// Votes over a candidate's hits using a borrowed provenance index.
#[derive(Debug, Clone, Copy)]
pub struct ParticleHitVoter<'a> {
    index: &'a HitProvenanceIndex,
}

impl<'a> ParticleHitVoter<'a> {
    pub fn new(index: &'a HitProvenanceIndex) -> Self {
        Self { index }
    }

    /// All contributing particles of a candidate, most hits first.
    pub fn ranked_particles<C: HitCollection + ?Sized>(&self, candidate: &C) -> Vec<ParticleHitCount> {
        self.index.contributing_particles(candidate.measurements())
    }

    /// The particle with the most hits on `candidate`.
    pub fn majority_particle<C: HitCollection + ?Sized>(&self, candidate: &C) -> Option<ParticleHitCount> {
        self.ranked_particles(candidate).into_iter().next()
    }

    /// Majority hit count over the candidate's hit list length.
    ///
    /// Returns 0.0 for a candidate without hits or without any truth.
    pub fn purity<C: HitCollection + ?Sized>(&self, candidate: &C) -> f64 {
        purity_of(self.majority_particle(candidate).as_ref(), candidate.measurements().len())
    }

    pub fn tag<C: HitCollection + ?Sized>(&self, candidate: &C) -> TruthTag {
        let majority = self.majority_particle(candidate);
        let hit_count = candidate.measurements().len();
        TruthTag {
            majority,
            purity: purity_of(majority.as_ref(), hit_count),
            hit_count,
        }
    }

    pub fn tag_all<C: HitCollection>(&self, candidates: &[C]) -> Vec<TruthTag> {
        candidates.iter().map(|c| self.tag(c)).collect()
    }
}

fn purity_of(majority: Option<&ParticleHitCount>, hits: usize) -> f64 {
    match majority {
        Some(m) if hits > 0 => m.hit_count as f64 / hits as f64,
        _ => 0.0,
    }
}
