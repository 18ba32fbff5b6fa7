//! Synthetic-event scenarios.

use crate::oracle::EventSpec;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: well separated tracks, nothing to remove
    CleanTracks,

    /// SIM-002: every segment shadowed by ghosts, every trajectory duplicated
    GhostStorm,

    /// SIM-003: two tracks crossing in the middle station, sharing its hits
    CrossingPair,

    /// SIM-004: trajectories polluted with hits that carry no truth
    NoiseFlood,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::CleanTracks,
            ScenarioId::GhostStorm,
            ScenarioId::CrossingPair,
            ScenarioId::NoiseFlood,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::CleanTracks => "clean_tracks",
            ScenarioId::GhostStorm => "ghost_storm",
            ScenarioId::CrossingPair => "crossing_pair",
            ScenarioId::NoiseFlood => "noise_flood",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::CleanTracks => "3 separated tracks, expect no removals and purity 1",
            ScenarioId::GhostStorm => "4 tracks, 2 ghosts per segment, 2 duplicates per trajectory",
            ScenarioId::CrossingPair => "2 tracks sharing all middle-station hits",
            ScenarioId::NoiseFlood => "3 tracks with 3 truthless hits each, expect purity 0.75",
        }
    }

    /// Event generation parameters for this scenario.
    pub fn event_spec(&self) -> EventSpec {
        match self {
            ScenarioId::CleanTracks => EventSpec::default(),
            ScenarioId::GhostStorm => EventSpec {
                particles: 4,
                ghosts_per_segment: 2,
                duplicates_per_candidate: 2,
                ..Default::default()
            },
            ScenarioId::CrossingPair => EventSpec {
                particles: 2,
                crossing_pair: true,
                ..Default::default()
            },
            ScenarioId::NoiseFlood => EventSpec {
                noise_hits_per_candidate: 3,
                ..Default::default()
            },
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clean_tracks" | "cleantracks" | "sim-001" => Ok(ScenarioId::CleanTracks),
            "ghost_storm" | "ghoststorm" | "sim-002" => Ok(ScenarioId::GhostStorm),
            "crossing_pair" | "crossingpair" | "sim-003" => Ok(ScenarioId::CrossingPair),
            "noise_flood" | "noiseflood" | "sim-004" => Ok(ScenarioId::NoiseFlood),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
