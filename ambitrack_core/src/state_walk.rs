//! State-by-state walk along two corresponding trajectories.
//!
//! Both state lists are ordered by their longitudinal coordinate and walked
//! in parallel like a merge. States whose z differ by less than the
//! matching epsilon pair up; everything else is stepped over.

use serde::{Deserialize, Serialize};

use crate::types::FittedState;

/// Diagnostic outcome of a state walk. Never used to filter candidates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateMatch {
    /// Number of state pairs that matched in z
    pub matched: usize,

    /// States in the shorter of the two trajectories
    pub compared: usize,

    /// Sum over matched pairs of Δ² / (σ²_a + σ²_b), per transverse axis
    pub residual: f64,

    /// matched / compared, in [0, 1]; 0 when either trajectory has no states
    pub match_fraction: f64,
}

impl StateMatch {
    /// Mean residual per matched pair, `None` without matches.
    pub fn mean_residual(&self) -> Option<f64> {
        (self.matched > 0).then(|| self.residual / self.matched as f64)
    }
}

/// Walks `a` and `b` in z order and accumulates matched-state residuals.
pub fn walk_states(a: &[FittedState], b: &[FittedState], epsilon: f64) -> StateMatch {
    let a = sorted_by_z(a);
    let b = sorted_by_z(b);
    let compared = a.len().min(b.len());

    let (mut i, mut j) = (0, 0);
    let mut matched = 0;
    let mut residual = 0.0;

    while i < a.len() && j < b.len() {
        let (sa, sb) = (&a[i], &b[j]);
        if (sa.z() - sb.z()).abs() < epsilon {
            matched += 1;
            residual += pair_residual(sa, sb);
            i += 1;
            j += 1;
        } else if sa.z() < sb.z() {
            i += 1;
        } else {
            j += 1;
        }
    }

    let match_fraction = if compared > 0 {
        (matched as f64 / compared as f64).min(1.0)
    } else {
        0.0
    };

    StateMatch {
        matched,
        compared,
        residual,
        match_fraction,
    }
}

fn sorted_by_z(states: &[FittedState]) -> Vec<FittedState> {
    let mut sorted = states.to_vec();
    sorted.sort_by(|x, y| x.z().total_cmp(&y.z()));
    sorted
}

/// Variance-normalised squared transverse distance of two states.
/// An axis whose summed variance is not positive contributes nothing.
fn pair_residual(a: &FittedState, b: &FittedState) -> f64 {
    let mut sum = 0.0;
    for axis in 0..2 {
        let variance = a.covariance[(axis, axis)] + b.covariance[(axis, axis)];
        if variance > 0.0 {
            let delta = a.position[axis] - b.position[axis];
            sum += delta * delta / variance;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix2, Vector3};

    fn state(x: f64, z: f64, variance: f64) -> FittedState {
        FittedState::new(1, Vector3::new(x, 0.0, z), Matrix2::identity() * variance)
    }

    #[test]
    fn test_identical_trajectories_match_fully() {
        let states = vec![state(0.0, 0.0, 1.0), state(0.0, 1.0, 1.0), state(0.0, 2.0, 1.0)];
        let result = walk_states(&states, &states, 0.03);

        assert_eq!(result.matched, 3);
        assert_eq!(result.compared, 3);
        assert_relative_eq!(result.match_fraction, 1.0);
        assert_relative_eq!(result.residual, 0.0);
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let a = vec![state(0.0, 2.0, 1.0), state(0.0, 0.0, 1.0)];
        let b = vec![state(0.0, 0.0, 1.0), state(0.0, 2.0, 1.0)];
        assert_eq!(walk_states(&a, &b, 0.03).matched, 2);
    }

    #[test]
    fn test_unmatched_states_are_skipped() {
        let a = vec![state(0.0, 0.0, 1.0), state(0.0, 1.0, 1.0), state(0.0, 2.0, 1.0), state(0.0, 3.0, 1.0)];
        let b = vec![state(0.0, 0.5, 1.0), state(0.0, 1.01, 1.0), state(0.0, 3.0, 1.0)];

        let result = walk_states(&a, &b, 0.03);
        assert_eq!(result.matched, 2);
        assert_eq!(result.compared, 3);
        assert_relative_eq!(result.match_fraction, 2.0 / 3.0);
    }

    #[test]
    fn test_epsilon_is_exclusive() {
        let a = vec![state(0.0, 0.0, 1.0)];
        let b = vec![state(0.0, 0.5, 1.0)];
        assert_eq!(walk_states(&a, &b, 0.5).matched, 0);
        assert_eq!(walk_states(&a, &b, 0.5001).matched, 1);
    }

    #[test]
    fn test_residual_normalised_by_summed_variance() {
        let a = vec![state(1.0, 0.0, 0.5)];
        let b = vec![state(-1.0, 0.0, 1.5)];

        let result = walk_states(&a, &b, 0.03);
        // Δx = 2, σ² = 0.5 + 1.5, Δy = 0
        assert_relative_eq!(result.residual, 2.0);
        assert_relative_eq!(result.mean_residual().unwrap(), 2.0);
    }

    #[test]
    fn test_zero_variance_axis_is_skipped() {
        let a = vec![state(1.0, 0.0, 0.0)];
        let b = vec![state(-1.0, 0.0, 0.0)];
        let result = walk_states(&a, &b, 0.03);
        assert_eq!(result.matched, 1);
        assert_eq!(result.residual, 0.0);
    }

    #[test]
    fn test_empty_trajectory_gives_zero_fraction() {
        let a = vec![state(0.0, 0.0, 1.0)];
        let result = walk_states(&a, &[], 0.03);
        assert_eq!(result.compared, 0);
        assert_eq!(result.match_fraction, 0.0);
        assert!(result.mean_residual().is_none());
    }
}
