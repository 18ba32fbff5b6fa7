//! Ground truth oracle for synthetic events.
//!
//! The oracle owns the "true" particles of an event and produces everything
//! the engine would receive from upstream:
//! - Smeared hits on every layer a particle crosses
//! - The hit → particle deposit table
//! - Per-station segments and full trajectory candidates
//! - Injected ghosts, duplicates, shared hits and noise on request

use ambitrack_core::{
    DetectorElementId, FittedState, Measurement, MeasurementId, ParticleId, Segment,
    TrajectoryCandidate, TruthDeposit,
};
use nalgebra::{Matrix2, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Longitudinal position of each station's first layer (mm).
pub const STATION_Z: [f64; 3] = [0.0, 1000.0, 2000.0];

/// Layer spacing inside a station (mm).
pub const LAYER_PITCH: f64 = 50.0;

pub const LAYERS_PER_STATION: u8 = 3;

/// Station indices as they appear in detector element ids.
pub const STATIONS: [u8; 3] = [1, 2, 3];

/// A simulated straight-line particle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthParticle {
    pub id: ParticleId,

    /// Position at z = 0 [x, y, 0] in mm
    pub origin: Vector3<f64>,

    /// Slopes dx/dz and dy/dz
    pub slope: [f64; 2],

    /// Momentum magnitude (MeV)
    pub momentum: f64,
}

impl TruthParticle {
    /// True position at longitudinal coordinate z.
    pub fn position_at(&self, z: f64) -> Vector3<f64> {
        Vector3::new(
            self.origin.x + self.slope[0] * z,
            self.origin.y + self.slope[1] * z,
            z,
        )
    }

    pub fn momentum_vector(&self) -> Vector3<f64> {
        Vector3::new(self.slope[0], self.slope[1], 1.0).normalize() * self.momentum
    }
}

/// Knobs for event generation.
#[derive(Debug, Clone)]
pub struct EventSpec {
    pub particles: usize,

    /// Ghost segments injected next to each true segment
    pub ghosts_per_segment: usize,

    /// Duplicate candidates injected per true trajectory
    pub duplicates_per_candidate: usize,

    /// Unmatched noise hits appended to each candidate
    pub noise_hits_per_candidate: usize,

    /// Make the first two particles cross inside the middle station and share its hits
    pub crossing_pair: bool,
}

impl Default for EventSpec {
    fn default() -> Self {
        Self {
            particles: 3,
            ghosts_per_segment: 0,
            duplicates_per_candidate: 0,
            noise_hits_per_candidate: 0,
            crossing_pair: false,
        }
    }
}

/// Everything generated for one event.
#[derive(Debug, Clone)]
pub struct SimEvent {
    pub particles: Vec<TruthParticle>,
    pub segments: Vec<Segment>,
    pub candidates: Vec<TrajectoryCandidate>,
    pub deposits: Vec<TruthDeposit>,

    /// Ghost segments injected by the oracle
    pub injected_ghosts: usize,

    /// Duplicate candidates injected by the oracle
    pub injected_duplicates: usize,

    /// Hits owned by both particles of a crossing pair
    pub shared_hits: usize,

    /// Ghost segments the engine should remove: every injected ghost, plus
    /// one of the two identical crossing segments
    pub expected_ghosts: usize,
}

/// The Oracle - maintains ground truth and generates detector responses.
pub struct TruthOracle {
    rng: ChaCha8Rng,

    /// Hit smearing standard deviation (mm)
    hit_noise_std: f64,

    next_hit_id: u64,
    next_particle_id: u64,
}

impl TruthOracle {
    /// Creates an oracle; the same seed always yields the same events.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            hit_noise_std: 0.02,
            next_hit_id: 0,
            next_particle_id: 1,
        }
    }

    /// Sets the hit smearing standard deviation (mm).
    pub fn set_hit_noise(&mut self, std_dev: f64) {
        self.hit_noise_std = if std_dev.is_finite() { std_dev.abs() } else { 0.0 };
    }

    fn next_hit(&mut self) -> MeasurementId {
        let id = MeasurementId(self.next_hit_id);
        self.next_hit_id += 1;
        id
    }

    /// Spawns `count` particles, spread far apart in x so their segments never overlap.
    fn spawn_particles(&mut self, count: usize) -> Vec<TruthParticle> {
        (0..count)
            .map(|i| {
                let id = ParticleId(self.next_particle_id);
                self.next_particle_id += 1;
                TruthParticle {
                    id,
                    origin: Vector3::new(
                        -60.0 + 30.0 * i as f64 + self.rng.gen_range(-2.0..2.0),
                        self.rng.gen_range(-40.0..40.0),
                        0.0,
                    ),
                    slope: [
                        self.rng.gen_range(-0.002..0.002),
                        self.rng.gen_range(-0.001..0.001),
                    ],
                    momentum: self.rng.gen_range(1.0e5..1.0e6),
                }
            })
            .collect()
    }

    /// Bends the second particle onto the first one's path through the middle station.
    fn force_crossing(particles: &mut [TruthParticle]) {
        if particles.len() < 2 {
            return;
        }
        let z = STATION_Z[1] + LAYER_PITCH;
        let target = particles[0].position_at(z);
        let other = &mut particles[1];
        other.slope[0] = (target.x - other.origin.x) / z;
        other.slope[1] = (target.y - other.origin.y) / z;
    }

    /// Adds Gaussian noise to the transverse coordinates.
    fn smear(&mut self, truth: Vector3<f64>) -> Vector3<f64> {
        let dx: f64 = StandardNormal.sample(&mut self.rng);
        let dy: f64 = StandardNormal.sample(&mut self.rng);
        Vector3::new(
            truth.x + dx * self.hit_noise_std,
            truth.y + dy * self.hit_noise_std,
            truth.z,
        )
    }

    fn energy(&mut self) -> f64 {
        self.rng.gen_range(0.05..0.15)
    }

    /// Generates one event according to `spec`.
    pub fn generate_event(&mut self, spec: &EventSpec) -> SimEvent {
        let mut particles = self.spawn_particles(spec.particles);
        if spec.crossing_pair {
            Self::force_crossing(&mut particles);
        }

        let mut deposits = Vec::new();
        let mut segments = Vec::new();
        let mut candidates = Vec::new();
        let mut injected_ghosts = 0;
        let mut injected_duplicates = 0;
        let mut shared_hits = 0;

        // Middle-station hits of the first particle, reused by the second on a crossing
        let mut crossing_hits: Vec<Measurement> = Vec::new();

        for (p_idx, particle) in particles.iter().enumerate() {
            let mut track_hits = Vec::new();
            let mut states = Vec::new();

            for (s_idx, &station) in STATIONS.iter().enumerate() {
                let share = spec.crossing_pair && p_idx == 1 && s_idx == 1;
                let mut station_hits = Vec::new();

                for layer in 0..LAYERS_PER_STATION {
                    let z = STATION_Z[s_idx] + LAYER_PITCH * layer as f64;
                    let truth = particle.position_at(z);

                    let hit = if share {
                        shared_hits += 1;
                        crossing_hits[layer as usize]
                    } else {
                        let position = self.smear(truth);
                        Measurement::new(self.next_hit(), element_for(station, layer, &position), position)
                    };
                    let energy = self.energy();
                    deposits.push(TruthDeposit::new(hit.id, particle.id, energy));

                    if spec.crossing_pair && p_idx == 0 && s_idx == 1 {
                        crossing_hits.push(hit);
                    }

                    let variance = self.hit_noise_std.powi(2).max(1e-6);
                    states.push(FittedState::new(station, hit.position, Matrix2::identity() * variance));
                    station_hits.push(hit);
                }

                let chi2 = self.rng.gen_range(0.5..3.0);
                let segment = Segment::from_measurements(station, station_hits.clone(), chi2);
                for g in 0..spec.ghosts_per_segment {
                    segments.push(ghost_of(&segment, g));
                    injected_ghosts += 1;
                }
                // The true segment goes last so ghosts are displaced by a later winner
                segments.push(segment);
                track_hits.extend(station_hits);
            }

            for _ in 0..spec.noise_hits_per_candidate {
                let z = STATION_Z[2] + LAYER_PITCH * LAYERS_PER_STATION as f64;
                let position = Vector3::new(
                    self.rng.gen_range(-100.0..100.0),
                    self.rng.gen_range(-100.0..100.0),
                    z,
                );
                let noise = Measurement::new(self.next_hit(), element_for(3, LAYERS_PER_STATION - 1, &position), position);
                track_hits.push(noise);
            }

            let ndf = (2 * track_hits.len()).saturating_sub(4) as u32;
            let chi2 = self.rng.gen_range(0.5..2.0) * ndf as f64;
            let candidate = TrajectoryCandidate::new(track_hits, chi2, ndf)
                .with_reference(particle.position_at(0.0), particle.momentum_vector())
                .with_states(states);

            let duplicates: Vec<TrajectoryCandidate> = (0..spec.duplicates_per_candidate)
                .map(|d| {
                    let mut duplicate = candidate.clone();
                    duplicate.chi2 = candidate.chi2 * 1.5 + 1.0 + d as f64;
                    duplicate
                })
                .collect();
            injected_duplicates += duplicates.len();
            candidates.push(candidate);
            candidates.extend(duplicates);
        }

        let expected_ghosts = injected_ghosts + usize::from(shared_hits > 0);
        SimEvent {
            expected_ghosts,
            particles,
            segments,
            candidates,
            deposits,
            injected_ghosts,
            injected_duplicates,
            shared_hits,
        }
    }
}

/// A strictly worse copy of `segment`, displaced well inside the default tolerance box.
fn ghost_of(segment: &Segment, nth: usize) -> Segment {
    let shift = 0.05 * (nth + 1) as f64;
    let mut measurements = segment.measurements.clone();
    measurements.pop();
    Segment {
        station: segment.station,
        position: segment.position + Vector3::new(shift, shift / 4.0, 0.0),
        hit_count: measurements.len(),
        chi2: segment.chi2 * 2.0 + 1.0,
        measurements,
        status: segment.status,
    }
}

/// Maps a hit position onto a (row, module, sensor) address in a 4×2×2 layout.
fn element_for(station: u8, layer: u8, position: &Vector3<f64>) -> DetectorElementId {
    let row = ((position.y + 120.0) / 60.0).clamp(0.0, 3.0) as u8;
    let module = u8::from(position.x > 0.0);
    let sensor = u8::from(position.y.rem_euclid(60.0) >= 30.0);
    DetectorElementId::new(station, layer, row, module, sensor)
}
