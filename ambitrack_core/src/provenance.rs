//! Hit → truth-particle provenance index.
//!
//! Built once per event from the simulation's deposit table and passed by
//! reference into every call that needs truth information.

use std::collections::HashMap;

use crate::types::{Measurement, MeasurementId, ParticleHitCount, ParticleId, TruthDeposit};

/// Caller-owned lookup from measurement to the particles that deposited in it.
#[derive(Debug, Clone, Default)]
pub struct HitProvenanceIndex {
    deposits: HashMap<MeasurementId, Vec<(ParticleId, f64)>>,
}

impl HitProvenanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from deposit records. Order of deposits per hit is kept.
    pub fn from_deposits<I>(deposits: I) -> Self
    where
        I: IntoIterator<Item = TruthDeposit>,
    {
        let mut index = Self::new();
        for deposit in deposits {
            index.insert(deposit);
        }
        index
    }

    pub fn insert(&mut self, deposit: TruthDeposit) {
        self.deposits
            .entry(deposit.measurement)
            .or_default()
            .push((deposit.particle, deposit.energy));
    }

    /// Deposits recorded for one measurement. Empty for noise hits.
    pub fn deposits_for(&self, id: MeasurementId) -> &[(ParticleId, f64)] {
        self.deposits.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_truth(&self, id: MeasurementId) -> bool {
        !self.deposits_for(id).is_empty()
    }

    /// Number of measurements with at least one deposit.
    pub fn len(&self) -> usize {
        self.deposits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty()
    }

    /// Counts, per particle, how many of `hits` it contributed to.
    ///
    /// A particle is counted at most once per hit even when the table holds
    /// several deposits of it in the same hit; their energies are summed.
    /// The result is sorted by descending hit count. Ties keep the order in
    /// which particles were first seen.
    pub fn contributing_particles(&self, hits: &[Measurement]) -> Vec<ParticleHitCount> {
        let mut counts: Vec<ParticleHitCount> = Vec::new();
        let mut slot: HashMap<ParticleId, usize> = HashMap::new();

        for hit in hits {
            let mut seen_in_hit: Vec<ParticleId> = Vec::new();
            for &(particle, energy) in self.deposits_for(hit.id) {
                let idx = *slot.entry(particle).or_insert_with(|| {
                    counts.push(ParticleHitCount {
                        particle,
                        hit_count: 0,
                        energy: 0.0,
                    });
                    counts.len() - 1
                });

                counts[idx].energy += energy;
                if !seen_in_hit.contains(&particle) {
                    seen_in_hit.push(particle);
                    counts[idx].hit_count += 1;
                }
            }
        }

        // Vec::sort_by is stable, so first-seen order survives among ties
        counts.sort_by(|a, b| b.hit_count.cmp(&a.hit_count));
        counts
    }
}
