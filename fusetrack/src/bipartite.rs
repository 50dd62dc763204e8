//! Maximum matching on the gated bipartite graph
//!
//! Alternative to the Hungarian solver for sparse gated problems: only pairs
//! whose cost already passes the gate become edges, then an augmenting-path
//! maximum matching assigns as many tracks as possible, preferring cheaper
//! edges first.

use ndarray::ArrayView2;

/// Bipartite-graph assignment solver with a cost cap
pub struct BipartSolver;

impl BipartSolver {
    /// Solve the gated assignment problem for an N x M cost matrix
    ///
    /// Edges exist only where `cost[i, j] <= gate`. Each track's candidate
    /// regions are tried cheapest-first and tracks are processed in row
    /// order, which breaks ties by lowest cost, then by row index.
    pub fn solve(cost: ArrayView2<f32>, gate: f32) -> Vec<Option<usize>> {
        let num_tracks = cost.nrows();
        let num_regions = cost.ncols();

        // Per-track adjacency, cheapest edges first
        let mut adjacency: Vec<Vec<usize>> = Vec::with_capacity(num_tracks);
        for i in 0..num_tracks {
            let mut edges: Vec<usize> = (0..num_regions)
                .filter(|&j| cost[[i, j]].is_finite() && cost[[i, j]] <= gate)
                .collect();
            edges.sort_by(|&a, &b| {
                cost[[i, a]]
                    .partial_cmp(&cost[[i, b]])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
            adjacency.push(edges);
        }

        let mut region_of_track: Vec<Option<usize>> = vec![None; num_tracks];
        let mut track_of_region: Vec<Option<usize>> = vec![None; num_regions];

        for i in 0..num_tracks {
            let mut visited = vec![false; num_regions];
            augment(i, &adjacency, &mut visited, &mut region_of_track, &mut track_of_region);
        }

        region_of_track
    }
}

/// Kuhn's augmenting path step: try to match track `i`, displacing earlier
/// matches onto their next-best regions when that frees an edge
fn augment(
    i: usize,
    adjacency: &[Vec<usize>],
    visited: &mut [bool],
    region_of_track: &mut [Option<usize>],
    track_of_region: &mut [Option<usize>],
) -> bool {
    for &j in &adjacency[i] {
        if visited[j] {
            continue;
        }
        visited[j] = true;

        let free = match track_of_region[j] {
            None => true,
            Some(owner) => augment(owner, adjacency, visited, region_of_track, track_of_region),
        };
        if free {
            region_of_track[i] = Some(j);
            track_of_region[j] = Some(i);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_respects_gate() {
        let cost = array![[0.2, 5.0], [5.0, 5.0]];
        let assignment = BipartSolver::solve(cost.view(), 1.0);
        assert_eq!(assignment, vec![Some(0), None]);
    }

    #[test]
    fn test_prefers_cheapest_edge() {
        let cost = array![[0.8, 0.1, 0.5]];
        let assignment = BipartSolver::solve(cost.view(), 1.0);
        assert_eq!(assignment, vec![Some(1)]);
    }

    #[test]
    fn test_augmenting_path_maximizes_matching() {
        // Track 0 grabs region 0 first (its cheapest), but track 1 can only
        // use region 0; the augmenting path moves track 0 to region 1
        let cost = array![[0.1, 0.2], [0.3, 9.0]];
        let assignment = BipartSolver::solve(cost.view(), 1.0);
        assert_eq!(assignment, vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_row_order_tie_break() {
        // Both tracks want the single region equally; the earlier row wins
        let cost = array![[0.4], [0.4]];
        let assignment = BipartSolver::solve(cost.view(), 1.0);
        assert_eq!(assignment, vec![Some(0), None]);
    }

    #[test]
    fn test_fully_gated_matrix() {
        let cost = array![[3.0, 4.0], [5.0, 6.0]];
        let assignment = BipartSolver::solve(cost.view(), 1.0);
        assert_eq!(assignment, vec![None, None]);
    }

    #[test]
    fn test_empty_matrix() {
        let cost = ndarray::Array2::<f32>::zeros((0, 0));
        assert!(BipartSolver::solve(cost.view(), 1.0).is_empty());
    }

    #[test]
    fn test_injectivity_dense() {
        let cost = array![
            [0.1, 0.2, 0.3, 0.4],
            [0.2, 0.1, 0.4, 0.3],
            [0.3, 0.4, 0.1, 0.2],
            [0.4, 0.3, 0.2, 0.1],
        ];
        let assignment = BipartSolver::solve(cost.view(), 1.0);

        let mut seen = std::collections::HashSet::new();
        for j in assignment.iter().flatten() {
            assert!(seen.insert(*j));
        }
        assert_eq!(seen.len(), 4);
    }
}
