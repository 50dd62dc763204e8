//! Hungarian algorithm for optimal track-to-region assignment

use ndarray::ArrayView2;
use pathfinding::prelude::{kuhn_munkres_min, Matrix};

/// Fixed-point scale applied to `f32` costs before the integer solver
const COST_SCALE: f32 = 1000.0;

/// Exact minimum-cost assignment solver
///
/// Rows are tracks, columns are regions. The rectangular matrix is padded
/// square with entries just above the largest observed cost so that every
/// real pairing is preferred over a virtual one; rows that end up on a
/// virtual column come back unassigned.
pub struct HungarianSolver;

impl HungarianSolver {
    /// Solve the assignment problem for an N x M cost matrix
    ///
    /// `max_cost` must be an upper bound on every finite entry (the cost
    /// builder tracks it while filling the matrix). Gating is NOT applied
    /// here; the caller filters the returned assignment against its
    /// threshold.
    pub fn solve(cost: ArrayView2<f32>, max_cost: f32) -> Vec<Option<usize>> {
        let num_tracks = cost.nrows();
        let num_regions = cost.ncols();
        if num_tracks == 0 {
            return Vec::new();
        }
        if num_regions == 0 {
            return vec![None; num_tracks];
        }

        let size = num_tracks.max(num_regions);
        let padding = scale(max_cost) + 1;

        let mut weights = Matrix::new(size, size, padding);
        for i in 0..num_tracks {
            for j in 0..num_regions {
                let entry = cost[[i, j]];
                weights[(i, j)] = if entry.is_finite() { scale(entry).min(padding) } else { padding };
            }
        }

        let (_total, assigned) = kuhn_munkres_min(&weights);

        (0..num_tracks)
            .map(|i| {
                let j = assigned[i];
                (j < num_regions).then_some(j)
            })
            .collect()
    }
}

fn scale(cost: f32) -> i64 {
    (cost * COST_SCALE).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// Total cost of an assignment, counting only assigned rows
    fn total_cost(cost: &ndarray::Array2<f32>, assignment: &[Option<usize>]) -> f32 {
        assignment
            .iter()
            .enumerate()
            .filter_map(|(i, j)| j.map(|j| cost[[i, j]]))
            .sum()
    }

    /// Brute-force minimum over all injective assignments covering
    /// min(N, M) pairs
    fn brute_force_min(cost: &ndarray::Array2<f32>) -> f32 {
        fn recurse(cost: &ndarray::Array2<f32>, row: usize, used: &mut Vec<bool>, acc: f32, best: &mut f32) {
            if row == cost.nrows() {
                if acc < *best {
                    *best = acc;
                }
                return;
            }
            let assignable = cost.ncols().min(cost.nrows());
            let assigned_so_far = used.iter().filter(|&&u| u).count();
            // Option to leave this row out only when enough columns remain
            if cost.nrows() > cost.ncols() && cost.nrows() - row - 1 >= assignable - assigned_so_far {
                recurse(cost, row + 1, used, acc, best);
            }
            for col in 0..cost.ncols() {
                if !used[col] {
                    used[col] = true;
                    recurse(cost, row + 1, used, acc + cost[[row, col]], best);
                    used[col] = false;
                }
            }
        }

        let mut best = f32::INFINITY;
        let mut used = vec![false; cost.ncols()];
        recurse(cost, 0, &mut used, 0.0, &mut best);
        best
    }

    #[test]
    fn test_simple_diagonal() {
        let cost = array![[0.1, 0.9], [0.9, 0.1]];
        let assignment = HungarianSolver::solve(cost.view(), 0.9);
        assert_eq!(assignment, vec![Some(0), Some(1)]);
    }

    #[test]
    fn test_crossed_assignment() {
        let cost = array![[0.9, 0.1], [0.1, 0.9]];
        let assignment = HungarianSolver::solve(cost.view(), 0.9);
        assert_eq!(assignment, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_more_tracks_than_regions() {
        let cost = array![[0.5], [0.1], [0.3]];
        let assignment = HungarianSolver::solve(cost.view(), 0.5);

        let assigned: Vec<_> = assignment.iter().flatten().collect();
        assert_eq!(assigned, vec![&0]);
        assert_eq!(assignment[1], Some(0));
    }

    #[test]
    fn test_more_regions_than_tracks() {
        let cost = array![[0.7, 0.2, 0.4]];
        let assignment = HungarianSolver::solve(cost.view(), 0.7);
        assert_eq!(assignment, vec![Some(1)]);
    }

    #[test]
    fn test_empty_inputs() {
        let empty_rows = ndarray::Array2::<f32>::zeros((0, 3));
        assert!(HungarianSolver::solve(empty_rows.view(), 1.0).is_empty());

        let empty_cols = ndarray::Array2::<f32>::zeros((2, 0));
        assert_eq!(HungarianSolver::solve(empty_cols.view(), 1.0), vec![None, None]);
    }

    #[test]
    fn test_optimality_against_brute_force() {
        let matrices = [
            array![[0.11, 0.54, 0.73], [0.62, 0.21, 0.35], [0.47, 0.88, 0.09]],
            array![[0.91, 0.14, 0.26, 0.58], [0.33, 0.72, 0.45, 0.19], [0.67, 0.29, 0.81, 0.52]],
            array![[0.41, 0.23], [0.17, 0.66], [0.39, 0.08], [0.75, 0.31]],
        ];

        for cost in matrices {
            let max_cost = cost.iter().cloned().fold(0.0f32, f32::max);
            let assignment = HungarianSolver::solve(cost.view(), max_cost);
            let solver_total = total_cost(&cost, &assignment);
            let best = brute_force_min(&cost);
            assert!(
                (solver_total - best).abs() < 1e-3,
                "solver found {solver_total}, brute force {best} for {cost:?}"
            );
        }
    }

    #[test]
    fn test_injectivity() {
        let cost = array![
            [0.1, 0.1, 0.1],
            [0.1, 0.1, 0.1],
            [0.1, 0.1, 0.1],
        ];
        let assignment = HungarianSolver::solve(cost.view(), 0.1);

        let mut seen = std::collections::HashSet::new();
        for j in assignment.iter().flatten() {
            assert!(seen.insert(*j), "region {j} assigned twice");
        }
        assert_eq!(seen.len(), 3);
    }
}
