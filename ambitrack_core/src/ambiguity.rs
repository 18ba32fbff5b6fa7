//! Pairwise ambiguity resolution between fitted trajectories.
//!
//! Two candidates that were found independently but reuse the same hits
//! are likely mis-associated. The solver prefers the pairing with the least
//! hit reuse.

use nalgebra::DMatrix;
use std::collections::BTreeSet;
use tracing::debug;

use crate::config::MatchingConfig;
use crate::error::DisambiguationError;
use crate::state_walk::{walk_states, StateMatch};
use crate::types::{AmbiguityDecision, HitCollection, MeasurementId, TrajectoryCandidate};

/// Largest side accepted by the exhaustive one-to-one assignment.
pub const MAX_ASSIGNMENT_SIZE: usize = 8;

/// Number of distinct measurements used by both `a` and `b`.
///
/// Symmetric by construction: the smaller id set is scanned against the larger.
pub fn count_shared_hits<A, B>(a: &A, b: &B) -> usize
where
    A: HitCollection + ?Sized,
    B: HitCollection + ?Sized,
{
    shared_between(&a.measurement_ids(), &b.measurement_ids())
}

fn shared_between(a: &BTreeSet<MeasurementId>, b: &BTreeSet<MeasurementId>) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|id| large.contains(id)).count()
}

/// Symmetric matrix of shared-hit counts. The diagonal holds each
/// candidate's own distinct hit count.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedHitMatrix {
    counts: DMatrix<usize>,
}

impl SharedHitMatrix {
    pub fn build<C: HitCollection>(candidates: &[C]) -> Self {
        let ids: Vec<BTreeSet<MeasurementId>> =
            candidates.iter().map(|c| c.measurement_ids()).collect();
        let n = ids.len();
        let counts = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                ids[i].len()
            } else {
                shared_between(&ids[i], &ids[j])
            }
        });
        Self { counts }
    }

    pub fn len(&self) -> usize {
        self.counts.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize, j: usize) -> Option<usize> {
        (i < self.len() && j < self.len()).then(|| self.counts[(i, j)])
    }

    /// Unordered pairs (i < j) in scan order with their shared-hit counts.
    pub fn pairs(&self) -> impl Iterator<Item = AmbiguityDecision> + '_ {
        let n = self.len();
        (0..n).flat_map(move |i| {
            (i + 1..n).map(move |j| AmbiguityDecision {
                first: i,
                second: j,
                shared_hits: self.counts[(i, j)],
            })
        })
    }
}

/// Picks the pair of candidates sharing the fewest hits.
///
/// Ties go to the pair met first when scanning i < j in input order.
pub fn solve_ambiguity<C: HitCollection>(
    candidates: &[C],
) -> Result<AmbiguityDecision, DisambiguationError> {
    if candidates.len() < 2 {
        return Err(DisambiguationError::InsufficientCandidates {
            found: candidates.len(),
        });
    }

    let matrix = SharedHitMatrix::build(candidates);
    let mut best: Option<AmbiguityDecision> = None;
    for pair in matrix.pairs() {
        if best.map_or(true, |b| pair.shared_hits < b.shared_hits) {
            best = Some(pair);
        }
    }

    let decision = best.ok_or(DisambiguationError::InsufficientCandidates {
        found: candidates.len(),
    })?;
    debug!(
        first = decision.first,
        second = decision.second,
        shared_hits = decision.shared_hits,
        "ambiguity resolved"
    );
    Ok(decision)
}

/// One-to-one pairing of `left` with `right` that minimises the total number
/// of shared hits.
///
/// Every candidate of the smaller side is paired with a distinct candidate
/// of the other side. Decisions are returned with `first` indexing `left`
/// and `second` indexing `right`, sorted by `first`. Among equal totals the
/// lexicographically first pairing wins. An empty side yields no decisions.
pub fn solve_assignment<L, R>(
    left: &[L],
    right: &[R],
) -> Result<Vec<AmbiguityDecision>, DisambiguationError>
where
    L: HitCollection,
    R: HitCollection,
{
    let size = left.len().max(right.len());
    if size > MAX_ASSIGNMENT_SIZE {
        return Err(DisambiguationError::AssignmentTooLarge {
            size,
            max: MAX_ASSIGNMENT_SIZE,
        });
    }
    if left.is_empty() || right.is_empty() {
        return Ok(Vec::new());
    }

    let left_ids: Vec<_> = left.iter().map(|c| c.measurement_ids()).collect();
    let right_ids: Vec<_> = right.iter().map(|c| c.measurement_ids()).collect();
    let cost = DMatrix::from_fn(left.len(), right.len(), |i, j| {
        shared_between(&left_ids[i], &right_ids[j])
    });

    // Search over the smaller side so every row gets a distinct column
    let transposed = left.len() > right.len();
    let cost = if transposed { cost.transpose() } else { cost };

    let mut search = AssignmentSearch {
        cost: &cost,
        used: vec![false; cost.ncols()],
        current: Vec::with_capacity(cost.nrows()),
        best: None,
    };
    search.descend(0, 0);

    let (total, rows) = search
        .best
        .ok_or(DisambiguationError::InsufficientCandidates { found: 0 })?;
    debug!(total_shared_hits = total, pairs = rows.len(), "assignment resolved");

    let mut decisions: Vec<AmbiguityDecision> = rows
        .iter()
        .enumerate()
        .map(|(row, &col)| {
            let (first, second) = if transposed { (col, row) } else { (row, col) };
            AmbiguityDecision {
                first,
                second,
                shared_hits: cost[(row, col)],
            }
        })
        .collect();
    decisions.sort_by_key(|d| d.first);
    Ok(decisions)
}

struct AssignmentSearch<'m> {
    cost: &'m DMatrix<usize>,
    used: Vec<bool>,
    current: Vec<usize>,
    best: Option<(usize, Vec<usize>)>,
}

impl AssignmentSearch<'_> {
    fn descend(&mut self, row: usize, total: usize) {
        if let Some((best_total, _)) = &self.best {
            // Costs are non-negative, so a tie here can never become a strict improvement
            if total >= *best_total {
                return;
            }
        }
        if row == self.cost.nrows() {
            self.best = Some((total, self.current.clone()));
            return;
        }
        for col in 0..self.cost.ncols() {
            if self.used[col] {
                continue;
            }
            self.used[col] = true;
            self.current.push(col);
            self.descend(row + 1, total + self.cost[(row, col)]);
            self.current.pop();
            self.used[col] = false;
        }
    }
}

/// Shared-hit and state-matching queries with configured tolerances.
#[derive(Debug, Clone, Default)]
pub struct PairwiseAmbiguitySolver {
    config: MatchingConfig,
}

impl PairwiseAmbiguitySolver {
    pub fn new(config: MatchingConfig) -> Result<Self, DisambiguationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn count_shared_hits(&self, a: &TrajectoryCandidate, b: &TrajectoryCandidate) -> usize {
        count_shared_hits(a, b)
    }

    pub fn solve_ambiguity(
        &self,
        candidates: &[TrajectoryCandidate],
    ) -> Result<AmbiguityDecision, DisambiguationError> {
        solve_ambiguity(candidates)
    }

    pub fn solve_assignment(
        &self,
        left: &[TrajectoryCandidate],
        right: &[TrajectoryCandidate],
    ) -> Result<Vec<AmbiguityDecision>, DisambiguationError> {
        solve_assignment(left, right)
    }

    /// Walks the fitted states of two trajectories known to correspond.
    pub fn match_states(&self, a: &TrajectoryCandidate, b: &TrajectoryCandidate) -> StateMatch {
        walk_states(&a.states, &b.states, self.config.state_match_epsilon)
    }

    /// Walks the states of `decision`'s two candidates, checking both indices.
    pub fn match_decision(
        &self,
        candidates: &[TrajectoryCandidate],
        decision: &AmbiguityDecision,
    ) -> Result<StateMatch, DisambiguationError> {
        let a = candidates
            .get(decision.first)
            .ok_or(DisambiguationError::out_of_range(decision.first, candidates.len()))?;
        let b = candidates
            .get(decision.second)
            .ok_or(DisambiguationError::out_of_range(decision.second, candidates.len()))?;
        Ok(self.match_states(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DetectorElementId, Measurement};
    use nalgebra::Vector3;
    use proptest::prelude::*;

    fn candidate(ids: &[u64]) -> TrajectoryCandidate {
        let hits = ids
            .iter()
            .map(|&id| {
                Measurement::new(
                    MeasurementId(id),
                    DetectorElementId::new((id % 3) as u8 + 1, 0, 0, 0, 0),
                    Vector3::zeros(),
                )
            })
            .collect();
        TrajectoryCandidate::new(hits, 1.0, 1)
    }

    #[test]
    fn test_count_shared_hits() {
        let a = candidate(&[1, 2, 3, 4]);
        let b = candidate(&[3, 4, 5]);
        assert_eq!(count_shared_hits(&a, &b), 2);
        assert_eq!(count_shared_hits(&b, &a), 2);
        assert_eq!(count_shared_hits(&a, &candidate(&[])), 0);
    }

    #[test]
    fn test_duplicate_hits_do_not_break_symmetry() {
        let a = candidate(&[1, 1, 2]);
        let b = candidate(&[1, 3]);
        assert_eq!(count_shared_hits(&a, &b), 1);
        assert_eq!(count_shared_hits(&b, &a), 1);
    }

    #[test]
    fn test_minimum_pair_selected() {
        // Shared counts: (0,1)=5, (0,2)=1, (1,2)=8
        let candidates = vec![
            candidate(&[1, 2, 3, 4, 5, 6]),
            candidate(&[1, 2, 3, 4, 5, 20, 21, 22, 23, 24, 25, 26, 27]),
            candidate(&[6, 20, 21, 22, 23, 24, 25, 26, 27]),
        ];

        let matrix = SharedHitMatrix::build(&candidates);
        assert_eq!(matrix.get(0, 1), Some(5));
        assert_eq!(matrix.get(0, 2), Some(1));
        assert_eq!(matrix.get(1, 2), Some(8));

        let decision = solve_ambiguity(&candidates).unwrap();
        assert_eq!(decision.pair(), (0, 2));
        assert_eq!(decision.shared_hits, 1);
    }

    #[test]
    fn test_ties_go_to_first_pair() {
        let candidates = vec![candidate(&[1]), candidate(&[2]), candidate(&[3])];
        assert_eq!(solve_ambiguity(&candidates).unwrap().pair(), (0, 1));
    }

    #[test]
    fn test_insufficient_candidates() {
        assert_eq!(
            solve_ambiguity(&[candidate(&[1])]),
            Err(DisambiguationError::InsufficientCandidates { found: 1 })
        );
        let none: Vec<TrajectoryCandidate> = Vec::new();
        assert!(solve_ambiguity(&none).is_err());
    }

    #[test]
    fn test_matrix_diagonal_and_bounds() {
        let matrix = SharedHitMatrix::build(&[candidate(&[1, 2, 2]), candidate(&[2])]);
        assert_eq!(matrix.get(0, 0), Some(2));
        assert_eq!(matrix.get(0, 1), matrix.get(1, 0));
        assert_eq!(matrix.get(2, 0), None);
        assert_eq!(matrix.pairs().count(), 1);
    }

    #[test]
    fn test_assignment_minimises_total() {
        // Pairing 0-0 / 1-1 costs 0 + 1, the crossed pairing costs 4 + 4
        let left = vec![candidate(&[1, 2, 3, 4]), candidate(&[5, 6, 7, 8])];
        let right = vec![candidate(&[5, 6, 7, 8, 9]), candidate(&[1, 2, 3, 4, 8])];

        let decisions = solve_assignment(&left, &right).unwrap();
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].pair(), (0, 0));
        assert_eq!(decisions[1].pair(), (1, 1));
        assert_eq!(decisions[0].shared_hits + decisions[1].shared_hits, 1);
    }

    #[test]
    fn test_assignment_uneven_sides() {
        let left = vec![candidate(&[1, 2]), candidate(&[3, 4]), candidate(&[10])];
        let right = vec![candidate(&[1, 2, 3, 4])];

        let decisions = solve_assignment(&left, &right).unwrap();
        assert_eq!(decisions, vec![AmbiguityDecision { first: 2, second: 0, shared_hits: 0 }]);
    }

    #[test]
    fn test_assignment_bounds() {
        let many: Vec<_> = (0..9).map(|i| candidate(&[i])).collect();
        assert_eq!(
            solve_assignment(&many, &many[..1]),
            Err(DisambiguationError::AssignmentTooLarge { size: 9, max: 8 })
        );
        let none: Vec<TrajectoryCandidate> = Vec::new();
        assert!(solve_assignment(&none, &many[..2]).unwrap().is_empty());
    }

    #[test]
    fn test_match_decision_checks_indices() {
        let solver = PairwiseAmbiguitySolver::default();
        let candidates = vec![candidate(&[1]), candidate(&[2])];
        let bad = AmbiguityDecision { first: 0, second: 5, shared_hits: 0 };
        assert_eq!(
            solver.match_decision(&candidates, &bad),
            Err(DisambiguationError::CandidateIndexOutOfRange { index: 5, len: 2 })
        );
    }

    proptest! {
        #[test]
        fn shared_hits_are_symmetric(
            a in prop::collection::vec(0u64..40, 0..20),
            b in prop::collection::vec(0u64..40, 0..20),
        ) {
            let (a, b) = (candidate(&a), candidate(&b));
            prop_assert_eq!(count_shared_hits(&a, &b), count_shared_hits(&b, &a));
        }
    }
}
