use serde::{Deserialize, Serialize};

use super::similarity::SimilarityGraph;

/// Power-iteration parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankOptions {
    /// Probability of following an edge rather than teleporting
    pub damping: f64,
    /// Per-node convergence tolerance; iteration stops when the L1 change drops below `n * tolerance`
    pub tolerance: f64,
    /// Iteration cap
    pub max_iterations: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// Salience score per sentence index, summing to 1.0
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankScore {
    scores: Vec<f64>,
    iterations: usize,
    converged: bool,
}

impl RankScore {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        Self {
            scores,
            iterations: 0,
            converged: true,
        }
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.scores.get(index).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

/// Score every node of the graph with weighted PageRank.
///
/// Outgoing weights are normalised per node; a node with no incident weight
/// spreads its mass uniformly, as does the teleport term. Hitting the
/// iteration cap is not an error, the last iterate is returned.
pub fn rank(graph: &SimilarityGraph, options: &RankOptions) -> RankScore {
    let n = graph.len();
    if n == 0 {
        return RankScore {
            scores: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let uniform = 1.0 / n as f64;
    let strength: Vec<f64> = (0..n).map(|i| graph.strength(i)).collect();
    let mut current = vec![uniform; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < options.max_iterations {
        iterations += 1;

        let dangling_mass: f64 = current
            .iter()
            .zip(&strength)
            .filter(|(_, s)| **s == 0.0)
            .map(|(x, _)| x)
            .sum();

        let next: Vec<f64> = (0..n)
            .map(|j| {
                let inflow: f64 = (0..n)
                    .filter(|&i| strength[i] > 0.0)
                    .map(|i| current[i] * graph.weight(i, j) / strength[i])
                    .sum();
                options.damping * (inflow + dangling_mass * uniform)
                    + (1.0 - options.damping) * uniform
            })
            .collect();

        let change: f64 = next.iter().zip(&current).map(|(a, b)| (a - b).abs()).sum();
        current = next;

        if change < n as f64 * options.tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::warn!(
            nodes = n,
            iterations,
            "ranking did not converge; using last iterate"
        );
    }

    let total: f64 = current.iter().sum();
    if total > 0.0 {
        current.iter_mut().for_each(|x| *x /= total);
    }

    RankScore {
        scores: current,
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sums_to_one(scores: &RankScore) {
        let total: f64 = scores.as_slice().iter().sum();
        assert!((total - 1.0).abs() < 1e-6, "sum was {}", total);
    }

    #[test]
    fn test_empty_graph() {
        let graph = SimilarityGraph::from_upper_triangle(0, vec![]).unwrap();
        let scores = rank(&graph, &RankOptions::default());
        assert!(scores.is_empty());
    }

    #[test]
    fn test_isolated_nodes_get_uniform_share() {
        let graph = SimilarityGraph::from_upper_triangle(4, vec![0.0; 6]).unwrap();
        let scores = rank(&graph, &RankOptions::default());
        assert_eq!(scores.len(), 4);
        for score in scores.as_slice() {
            assert!((score - 0.25).abs() < 1e-12);
        }
        assert!(scores.converged());
    }

    #[test]
    fn test_hub_ranks_highest() {
        // Node 0 connects to everyone, the rest only to node 0
        let graph = SimilarityGraph::from_upper_triangle(
            4,
            vec![0.8, 0.8, 0.8, 0.0, 0.0, 0.0],
        )
        .unwrap();
        let scores = rank(&graph, &RankOptions::default());
        let hub = scores.get(0).unwrap();
        for leaf in 1..4 {
            assert!(hub > scores.get(leaf).unwrap());
        }
        assert_sums_to_one(&scores);
    }

    #[test]
    fn test_mixed_isolated_and_connected() {
        let graph = SimilarityGraph::from_upper_triangle(
            3,
            vec![0.5, 0.0, 0.0],
        )
        .unwrap();
        let scores = rank(&graph, &RankOptions::default());
        assert_sums_to_one(&scores);
        assert!(scores.get(2).unwrap() > 0.0);
        assert!((scores.get(0).unwrap() - scores.get(1).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_rank_is_deterministic() {
        let graph = SimilarityGraph::from_upper_triangle(
            5,
            vec![0.1, 0.4, 0.0, 0.7, 0.3, 0.2, 0.0, 0.9, 0.5, 0.6],
        )
        .unwrap();
        let first = rank(&graph, &RankOptions::default());
        let second = rank(&graph, &RankOptions::default());
        assert_eq!(first, second);
        assert_sums_to_one(&first);
    }

    #[test]
    fn test_iteration_cap_still_normalises() {
        let graph = SimilarityGraph::from_upper_triangle(
            3,
            vec![0.9, 0.1, 0.4],
        )
        .unwrap();
        let options = RankOptions {
            max_iterations: 1,
            tolerance: 1e-15,
            ..RankOptions::default()
        };
        let scores = rank(&graph, &options);
        assert_eq!(scores.iterations(), 1);
        assert_sums_to_one(&scores);
    }
}
