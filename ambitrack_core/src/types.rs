//! Shared data model: measurements, candidates, segments and truth records.
//!
//! The engine never owns detector hits. It copies the small identifying
//! part of each hit into a [`Measurement`] and works on those.

use nalgebra::{Matrix2, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::DisambiguationError;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Unique identifier of one detector hit within an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeasurementId(pub u64);

/// Identifier of a simulated truth particle (barcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticleId(pub u64);

impl std::fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hit#{}", self.0)
    }
}

impl std::fmt::Display for ParticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "particle#{}", self.0)
    }
}

/// Location of a sensitive element in the tracker hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DetectorElementId {
    pub station: u8,
    pub layer: u8,
    pub row: u8,
    pub module: u8,
    pub sensor: u8,
}

impl DetectorElementId {
    pub fn new(station: u8, layer: u8, row: u8, module: u8, sensor: u8) -> Self {
        Self {
            station,
            layer,
            row,
            module,
            sensor,
        }
    }
}

// ============================================================================
// MEASUREMENT
// ============================================================================

/// One detector hit used as fit input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: MeasurementId,

    pub element: DetectorElementId,

    /// Global position [x, y, z] in mm, z along the beam axis
    pub position: Vector3<f64>,

    /// Opaque handle into the geometry service, never interpreted here
    pub geometry_key: Option<u64>,
}

impl Measurement {
    pub fn new(id: MeasurementId, element: DetectorElementId, position: Vector3<f64>) -> Self {
        Self {
            id,
            element,
            position,
            geometry_key: None,
        }
    }

    #[inline]
    pub fn station(&self) -> u8 {
        self.element.station
    }
}

// ============================================================================
// HIT COLLECTION (common view of segments and trajectories)
// ============================================================================

/// Anything that can report a station, a representative position and a hit list.
pub trait HitCollection {
    /// Station index, or `None` when the hits span more than one station.
    fn station(&self) -> Option<u8>;

    /// Representative global position.
    fn position(&self) -> Vector3<f64>;

    /// Hits in fit order.
    fn measurements(&self) -> &[Measurement];

    /// Number of hits. Defaults to the length of the hit list.
    fn hit_count(&self) -> usize {
        self.measurements().len()
    }

    /// Distinct measurement identifiers used by this collection.
    fn measurement_ids(&self) -> BTreeSet<MeasurementId> {
        self.measurements().iter().map(|m| m.id).collect()
    }
}

/// Ghost flag carried by segments and candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CandidateStatus {
    #[default]
    Active,
    Ghost,
}

// ============================================================================
// FITTED STATE
// ============================================================================

/// A fitted track state at one detection plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedState {
    pub station: u8,

    /// Global position [x, y, z]; z is the longitudinal coordinate
    pub position: Vector3<f64>,

    /// Transverse (x, y) position covariance
    pub covariance: Matrix2<f64>,
}

impl FittedState {
    pub fn new(station: u8, position: Vector3<f64>, covariance: Matrix2<f64>) -> Self {
        Self {
            station,
            position,
            covariance,
        }
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.position.z
    }
}

// ============================================================================
// TRAJECTORY CANDIDATE
// ============================================================================

/// A fitted multi-station trajectory handed over by the upstream fitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryCandidate {
    pub measurements: Vec<Measurement>,

    pub chi2: f64,

    /// Degrees of freedom of the fit
    pub ndf: u32,

    /// Position estimate at the reference surface
    pub reference_position: Vector3<f64>,

    /// Momentum estimate at the reference surface (MeV)
    pub momentum: Vector3<f64>,

    /// Per-plane fitted states, used by the state walk
    pub states: Vec<FittedState>,

    pub status: CandidateStatus,
}

impl TrajectoryCandidate {
    pub fn new(measurements: Vec<Measurement>, chi2: f64, ndf: u32) -> Self {
        let reference_position = measurements
            .first()
            .map(|m| m.position)
            .unwrap_or_else(Vector3::zeros);
        Self {
            measurements,
            chi2,
            ndf,
            reference_position,
            momentum: Vector3::zeros(),
            states: Vec::new(),
            status: CandidateStatus::Active,
        }
    }

    pub fn with_reference(mut self, position: Vector3<f64>, momentum: Vector3<f64>) -> Self {
        self.reference_position = position;
        self.momentum = momentum;
        self
    }

    pub fn with_states(mut self, states: Vec<FittedState>) -> Self {
        self.states = states;
        self
    }

    /// χ² per degree of freedom, or `None` for a fit without degrees of freedom.
    pub fn chi2_per_ndf(&self) -> Option<f64> {
        (self.ndf > 0).then(|| self.chi2 / self.ndf as f64)
    }

    pub fn mark_ghost(&mut self) {
        self.status = CandidateStatus::Ghost;
    }

    pub fn is_ghost(&self) -> bool {
        self.status == CandidateStatus::Ghost
    }
}

impl HitCollection for TrajectoryCandidate {
    fn station(&self) -> Option<u8> {
        single_station(&self.measurements)
    }

    fn position(&self) -> Vector3<f64> {
        self.reference_position
    }

    fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }
}

// ============================================================================
// SEGMENT
// ============================================================================

/// A trajectory piece confined to one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub station: u8,

    /// Representative position [x, y, z] in the station
    pub position: Vector3<f64>,

    pub hit_count: usize,

    pub chi2: f64,

    /// Hits, when known. May be empty for segments built from summary data.
    pub measurements: Vec<Measurement>,

    pub status: CandidateStatus,
}

impl Segment {
    /// Creates a segment from summary values only.
    pub fn new(station: u8, position: Vector3<f64>, hit_count: usize, chi2: f64) -> Self {
        Self {
            station,
            position,
            hit_count,
            chi2,
            measurements: Vec::new(),
            status: CandidateStatus::Active,
        }
    }

    /// Creates a segment from its hits, positioned at their centroid.
    pub fn from_measurements(station: u8, measurements: Vec<Measurement>, chi2: f64) -> Self {
        let position = if measurements.is_empty() {
            Vector3::zeros()
        } else {
            measurements
                .iter()
                .fold(Vector3::zeros(), |acc, m| acc + m.position)
                / measurements.len() as f64
        };
        Self {
            station,
            position,
            hit_count: measurements.len(),
            chi2,
            measurements,
            status: CandidateStatus::Active,
        }
    }

    /// Checks the hit count against the number of layers a station has.
    pub fn validate(&self, max_layers_per_station: usize) -> Result<(), DisambiguationError> {
        if self.hit_count > max_layers_per_station {
            return Err(DisambiguationError::HitCountExceedsLayers {
                station: self.station,
                hits: self.hit_count,
                max: max_layers_per_station,
            });
        }
        Ok(())
    }

    pub fn is_ghost(&self) -> bool {
        self.status == CandidateStatus::Ghost
    }
}

impl HitCollection for Segment {
    fn station(&self) -> Option<u8> {
        Some(self.station)
    }

    fn position(&self) -> Vector3<f64> {
        self.position
    }

    fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    fn hit_count(&self) -> usize {
        self.hit_count
    }
}

fn single_station(measurements: &[Measurement]) -> Option<u8> {
    let first = measurements.first()?.station();
    measurements
        .iter()
        .all(|m| m.station() == first)
        .then_some(first)
}

// ============================================================================
// TRUTH RECORDS
// ============================================================================

/// One entry of the hit → particle table produced by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthDeposit {
    pub measurement: MeasurementId,
    pub particle: ParticleId,
    /// Deposited energy (MeV)
    pub energy: f64,
}

impl TruthDeposit {
    pub fn new(measurement: MeasurementId, particle: ParticleId, energy: f64) -> Self {
        Self {
            measurement,
            particle,
            energy,
        }
    }
}

/// Number of hits (and summed energy) a particle contributed to a hit set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleHitCount {
    pub particle: ParticleId,
    pub hit_count: usize,
    pub energy: f64,
}

/// Outcome of the pairwise ambiguity solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguityDecision {
    pub first: usize,
    pub second: usize,
    pub shared_hits: usize,
}

impl AmbiguityDecision {
    /// The two candidate indices as a tuple.
    pub fn pair(&self) -> (usize, usize) {
        (self.first, self.second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: u64, station: u8, layer: u8, x: f64) -> Measurement {
        Measurement::new(
            MeasurementId(id),
            DetectorElementId::new(station, layer, 0, 0, 0),
            Vector3::new(x, 0.0, 100.0 * station as f64 + layer as f64),
        )
    }

    #[test]
    fn test_segment_from_measurements_uses_centroid() {
        let segment = Segment::from_measurements(1, vec![hit(1, 1, 0, 1.0), hit(2, 1, 1, 3.0)], 0.5);
        assert_eq!(segment.hit_count, 2);
        assert!((segment.position.x - 2.0).abs() < 1e-12);
        assert_eq!(HitCollection::station(&segment), Some(1));
    }

    #[test]
    fn test_segment_layer_bound() {
        let segment = Segment::new(2, Vector3::zeros(), 13, 1.0);
        assert_eq!(
            segment.validate(12),
            Err(DisambiguationError::HitCountExceedsLayers {
                station: 2,
                hits: 13,
                max: 12
            })
        );
        assert!(Segment::new(2, Vector3::zeros(), 12, 1.0).validate(12).is_ok());
    }

    #[test]
    fn test_candidate_station_spans() {
        let single = TrajectoryCandidate::new(vec![hit(1, 2, 0, 0.0), hit(2, 2, 1, 0.0)], 1.0, 1);
        assert_eq!(single.station(), Some(2));

        let multi = TrajectoryCandidate::new(vec![hit(1, 1, 0, 0.0), hit(2, 2, 0, 0.0)], 1.0, 1);
        assert_eq!(multi.station(), None);

        let empty = TrajectoryCandidate::new(Vec::new(), 0.0, 0);
        assert_eq!(empty.station(), None);
        assert_eq!(empty.chi2_per_ndf(), None);
    }

    #[test]
    fn test_measurement_ids_are_distinct() {
        let candidate = TrajectoryCandidate::new(vec![hit(7, 1, 0, 0.0), hit(7, 1, 0, 0.0)], 0.0, 0);
        assert_eq!(candidate.hit_count(), 2);
        assert_eq!(candidate.measurement_ids().len(), 1);
    }
}
