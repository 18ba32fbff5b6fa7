//! The "GHOST" Resolver - intra-station duplicate removal
//!
//! Segments are grouped by station. Inside a group every unordered pair is
//! visited once (i < j, input order). When a pair is geometrically
//! compatible and one segment is strictly better, the other one becomes a
//! ghost and takes no further part in the scan.
//!
//! Per-segment lifecycle: Unprocessed → Compared → {Kept | MarkedGhost}

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::config::Tolerances;
use crate::geometry::{chi2_ascending, compare_quality, positions_compatible};
use crate::types::{CandidateStatus, HitCollection, Segment, TrajectoryCandidate};

/// Where a segment stands in the ghost scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Unprocessed,
    Compared,
    Kept,
    MarkedGhost,
}

/// Records which segment displaced which. Indices refer to the input slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GhostMark {
    pub ghost: usize,
    pub winner: usize,
    pub station: u8,
}

/// Result of a ghost scan with its audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct GhostResolution {
    /// Surviving segments, in input order
    pub kept: Vec<Segment>,

    /// One entry per removed segment, in the order they were marked
    pub marks: Vec<GhostMark>,
}

/// Removes near-duplicate segments within each station.
#[derive(Debug, Clone, Copy, Default)]
pub struct GhostResolver {
    tolerances: Tolerances,
}

impl GhostResolver {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    pub fn tolerances(&self) -> Tolerances {
        self.tolerances
    }

    /// Runs the scan and returns the final state of every input segment.
    pub fn classify(&self, segments: &[Segment]) -> (Vec<SegmentState>, Vec<GhostMark>) {
        // A ghost flag set by the caller is final
        let mut states: Vec<SegmentState> = segments
            .iter()
            .map(|s| {
                if s.is_ghost() {
                    SegmentState::MarkedGhost
                } else {
                    SegmentState::Unprocessed
                }
            })
            .collect();
        let mut marks = Vec::new();

        for (station, members) in group_by_station(segments) {
            if members.len() < 2 {
                for &idx in &members {
                    if states[idx] != SegmentState::MarkedGhost {
                        states[idx] = SegmentState::Kept;
                    }
                }
                continue;
            }

            for (pos, &i) in members.iter().enumerate() {
                for &j in &members[pos + 1..] {
                    if states[i] == SegmentState::MarkedGhost {
                        break;
                    }
                    if states[j] == SegmentState::MarkedGhost {
                        continue;
                    }
                    states[i] = SegmentState::Compared;
                    states[j] = SegmentState::Compared;

                    let (a, b) = (&segments[i], &segments[j]);
                    if !positions_compatible(a, b, &self.tolerances) {
                        continue;
                    }

                    let (winner, ghost) = match compare_quality(a, b) {
                        Ordering::Greater => (i, j),
                        Ordering::Less => (j, i),
                        // Equal quality: no strictly better competitor, keep both
                        Ordering::Equal => {
                            trace!(station, i, j, "compatible segments of equal quality");
                            continue;
                        }
                    };

                    states[ghost] = SegmentState::MarkedGhost;
                    debug!(
                        station,
                        ghost,
                        winner,
                        ghost_hits = segments[ghost].hit_count,
                        winner_hits = segments[winner].hit_count,
                        "segment marked as ghost"
                    );
                    marks.push(GhostMark {
                        ghost,
                        winner,
                        station,
                    });
                }
            }

            for &idx in &members {
                if states[idx] != SegmentState::MarkedGhost {
                    states[idx] = SegmentState::Kept;
                }
            }
        }

        (states, marks)
    }

    /// Returns the segments that were never marked as ghosts, in input order.
    pub fn resolve(&self, segments: &[Segment]) -> Vec<Segment> {
        self.resolve_with_report(segments).kept
    }

    pub fn resolve_with_report(&self, segments: &[Segment]) -> GhostResolution {
        let (states, marks) = self.classify(segments);
        let kept = segments
            .iter()
            .zip(&states)
            .filter(|(_, state)| **state == SegmentState::Kept)
            .map(|(segment, _)| segment.clone())
            .collect();
        GhostResolution { kept, marks }
    }

    /// Flags ghosts in place instead of removing them. Existing ghost flags stay set.
    pub fn mark_in_place(&self, segments: &mut [Segment]) -> Vec<GhostMark> {
        let (states, marks) = self.classify(segments);
        for (segment, state) in segments.iter_mut().zip(states) {
            if state == SegmentState::MarkedGhost {
                segment.status = CandidateStatus::Ghost;
            }
        }
        marks
    }

    /// Drops candidates already flagged as ghosts and collapses candidates
    /// built from exactly the same hits, keeping the smaller χ² (the earlier
    /// one on ties). Survivors keep their input order.
    pub fn resolve_candidates(&self, candidates: &[TrajectoryCandidate]) -> Vec<TrajectoryCandidate> {
        let ids: Vec<_> = candidates.iter().map(|c| c.measurement_ids()).collect();
        let mut ghost: Vec<bool> = candidates.iter().map(TrajectoryCandidate::is_ghost).collect();

        for i in 0..candidates.len() {
            for j in i + 1..candidates.len() {
                if ghost[i] {
                    break;
                }
                if ghost[j] || ids[i] != ids[j] {
                    continue;
                }
                let loser = if chi2_ascending(candidates[j].chi2, candidates[i].chi2) == Ordering::Less {
                    i
                } else {
                    j
                };
                debug!(loser, hits = ids[loser].len(), "duplicate candidate marked as ghost");
                ghost[loser] = true;
            }
        }

        candidates
            .iter()
            .zip(ghost)
            .filter(|(_, is_ghost)| !is_ghost)
            .map(|(candidate, _)| candidate.clone())
            .collect()
    }
}

/// Input indices per station, each group in input order.
fn group_by_station(segments: &[Segment]) -> BTreeMap<u8, Vec<usize>> {
    let mut groups: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (idx, segment) in segments.iter().enumerate() {
        groups.entry(segment.station).or_default().push(idx);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use proptest::prelude::*;

    fn segment(station: u8, x: f64, hits: usize, chi2: f64) -> Segment {
        Segment::new(station, Vector3::new(x, 0.0, 0.0), hits, chi2)
    }

    fn resolver() -> GhostResolver {
        GhostResolver::new(Tolerances::new(0.5, 0.25))
    }

    #[test]
    fn test_hit_count_beats_chi2() {
        let segments = vec![
            segment(2, 0.0, 8, 4.0),
            segment(2, 0.1, 6, 2.0),
            segment(2, 5.0, 7, 1.0),
            segment(2, -5.0, 5, 1.0),
        ];

        let resolution = resolver().resolve_with_report(&segments);
        assert_eq!(resolution.kept.len(), 3);
        assert_eq!(resolution.kept[0], segments[0]);
        assert!(!resolution.kept.contains(&segments[1]));
        assert_eq!(
            resolution.marks,
            vec![GhostMark {
                ghost: 1,
                winner: 0,
                station: 2
            }]
        );
    }

    #[test]
    fn test_small_groups_untouched() {
        let resolver = resolver();
        assert!(resolver.resolve(&[]).is_empty());

        let single = vec![segment(1, 0.0, 3, 1.0)];
        assert_eq!(resolver.resolve(&single), single);
    }

    #[test]
    fn test_stations_are_independent() {
        let segments = vec![segment(1, 0.0, 8, 1.0), segment(2, 0.0, 3, 1.0)];
        assert_eq!(resolver().resolve(&segments), segments);
    }

    #[test]
    fn test_ghost_cannot_remove_others() {
        // 0 beats 1; 1 would beat 2 but is already a ghost; 0 and 2 are too far apart
        let segments = vec![
            segment(1, 0.0, 9, 1.0),
            segment(1, 0.4, 8, 1.0),
            segment(1, 0.8, 7, 1.0),
        ];

        let kept = resolver().resolve(&segments);
        assert_eq!(kept, vec![segments[0].clone(), segments[2].clone()]);
    }

    #[test]
    fn test_later_winner_displaces_earlier() {
        let segments = vec![segment(3, 0.0, 4, 1.0), segment(3, 0.2, 6, 1.0)];

        let resolution = resolver().resolve_with_report(&segments);
        assert_eq!(resolution.kept, vec![segments[1].clone()]);
        assert_eq!(resolution.marks[0].winner, 1);
    }

    #[test]
    fn test_equal_quality_keeps_both() {
        let segments = vec![segment(1, 0.0, 5, 2.0), segment(1, 0.1, 5, 2.0)];
        assert_eq!(resolver().resolve(&segments).len(), 2);
    }

    #[test]
    fn test_mark_in_place_sets_status() {
        let mut segments = vec![segment(1, 0.0, 5, 2.0), segment(1, 0.1, 4, 2.0)];
        let marks = resolver().mark_in_place(&mut segments);

        assert_eq!(marks.len(), 1);
        assert!(!segments[0].is_ghost());
        assert!(segments[1].is_ghost());
    }

    #[test]
    fn test_classify_final_states() {
        let segments = vec![segment(1, 0.0, 5, 2.0), segment(1, 0.1, 4, 2.0), segment(2, 0.0, 4, 2.0)];
        let (states, _) = resolver().classify(&segments);
        assert_eq!(
            states,
            vec![SegmentState::Kept, SegmentState::MarkedGhost, SegmentState::Kept]
        );
    }

    #[test]
    fn test_preflagged_ghost_stays_out() {
        let mut flagged = segment(1, 0.0, 9, 1.0);
        flagged.status = CandidateStatus::Ghost;
        let mut segments = vec![flagged, segment(1, 0.1, 5, 1.0)];

        let resolution = resolver().resolve_with_report(&segments);
        assert_eq!(resolution.kept, vec![segments[1].clone()]);
        assert!(resolution.marks.is_empty());

        let marks = resolver().mark_in_place(&mut segments);
        assert!(marks.is_empty());
        assert!(segments[0].is_ghost());
        assert!(!segments[1].is_ghost());
    }

    #[test]
    fn test_preflagged_ghost_alone_in_station() {
        let mut flagged = segment(2, 0.0, 4, 1.0);
        flagged.status = CandidateStatus::Ghost;
        let (states, _) = resolver().classify(&[flagged]);
        assert_eq!(states, vec![SegmentState::MarkedGhost]);
    }

    #[test]
    fn test_duplicate_candidates_collapse() {
        use crate::types::{DetectorElementId, Measurement, MeasurementId};

        let hits: Vec<Measurement> = (0..4)
            .map(|i| Measurement::new(MeasurementId(i), DetectorElementId::new(1, i as u8, 0, 0, 0), Vector3::zeros()))
            .collect();
        let mut flagged = TrajectoryCandidate::new(hits[..2].to_vec(), 1.0, 1);
        flagged.mark_ghost();
        let candidates = vec![
            TrajectoryCandidate::new(hits.clone(), 5.0, 4),
            TrajectoryCandidate::new(hits[2..].to_vec(), 1.0, 1),
            TrajectoryCandidate::new(hits.iter().rev().copied().collect(), 3.0, 4),
            flagged,
        ];

        let kept = resolver().resolve_candidates(&candidates);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].chi2, 1.0);
        assert_eq!(kept[1].chi2, 3.0);
    }

    fn arb_segment() -> impl Strategy<Value = Segment> {
        (0u8..3, -1.5f64..1.5, -0.6f64..0.6, 1usize..12, 0.0f64..20.0).prop_map(
            |(station, x, y, hits, chi2)| Segment::new(station, Vector3::new(x, y, 0.0), hits, chi2),
        )
    }

    proptest! {
        #[test]
        fn resolve_is_idempotent(segments in prop::collection::vec(arb_segment(), 0..24)) {
            let resolver = resolver();
            let once = resolver.resolve(&segments);
            let twice = resolver.resolve(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn resolve_is_subset_and_never_empties_a_station(
            segments in prop::collection::vec(arb_segment(), 0..24),
        ) {
            let kept = resolver().resolve(&segments);
            prop_assert!(kept.len() <= segments.len());
            for segment in &kept {
                prop_assert!(segments.contains(segment));
            }
            for station in 0u8..3 {
                let before = segments.iter().filter(|s| s.station == station).count();
                let after = kept.iter().filter(|s| s.station == station).count();
                if before > 0 {
                    prop_assert!(after > 0);
                }
                if before <= 1 {
                    prop_assert_eq!(before, after);
                }
            }
        }
    }
}
