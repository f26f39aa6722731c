//! Orient phase: Gödel-style solvability checks, problem decomposition, and
//! knowledge-gap identification against the substrate's current graph.
//!
//! "Gödel-style" here means the orchestrator only ever claims to resolve
//! what it can ground in the graph: solvability, sub-problem difficulty, and
//! knowledge gaps are all read off the seeds' actual neighborhoods, never
//! guessed from the query's intent.

use super::observe::{Observation, Seed};
use crate::hash::Hash32;
use crate::search::Edge;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Neighbor expansion in [`decompose_problem`] stops at this many hops from
/// the seed.
const DECOMPOSE_MAX_DEPTH: usize = 3;
/// At each hop, only the top-rated neighbors (by ELO) are followed.
const DECOMPOSE_MAX_BREADTH: usize = 4;

#[derive(Debug, Clone)]
pub struct SubProblem {
    pub description: String,
    pub seed: Hash32,
    pub difficulty: f64,
}

#[derive(Debug, Clone)]
pub struct KnowledgeGap {
    pub concept: Hash32,
    pub rating: f64,
    pub observations: u64,
}

/// A problem is solvable within this substrate only if a majority of the
/// resolved seeds have at least one edge with ELO > 1500 and obs > 10: the
/// orchestrator needs strong existing structure to ground a search from, not
/// just a name it happens to recognize.
pub fn is_solvable(observation: &Observation, neighbors: impl Fn(&Hash32) -> Vec<Edge>) -> bool {
    if observation.seeds.is_empty() {
        return false;
    }
    let qualifying = observation
        .seeds
        .iter()
        .filter(|seed| neighbors(&seed.composition_id).iter().any(|e| e.elo > 1500.0 && e.observations > 10))
        .count();
    qualifying * 2 > observation.seeds.len()
}

/// One sub-problem per seed, via bounded-depth recursive neighbor expansion
/// prioritized by rating: from each seed, follow the top
/// [`DECOMPOSE_MAX_BREADTH`] highest-ELO neighbors, then theirs in turn, up
/// to [`DECOMPOSE_MAX_DEPTH`] hops. Difficulty falls as the reachable
/// neighborhood grows (more existing structure to search through), floored
/// and ceiled to `[0, 10]`.
pub fn decompose_problem(seeds: &[Seed], neighbors: impl Fn(&Hash32) -> Vec<Edge>) -> Vec<SubProblem> {
    seeds
        .iter()
        .map(|seed| {
            let mut visited = HashSet::new();
            visited.insert(seed.composition_id);
            let reached = expand_recursive(seed.composition_id, &neighbors, DECOMPOSE_MAX_DEPTH, &mut visited);
            let difficulty = (10.0 / (1.0 + reached as f64)).clamp(0.0, 10.0);
            SubProblem { description: seed.text.clone(), seed: seed.composition_id, difficulty }
        })
        .collect()
}

/// Expands outward from `node`, highest ELO first, recording each newly
/// visited node and returning how many were reached. Depth counts down;
/// breadth at each hop is capped at [`DECOMPOSE_MAX_BREADTH`].
fn expand_recursive(node: Hash32, neighbors: &impl Fn(&Hash32) -> Vec<Edge>, depth_remaining: usize, visited: &mut HashSet<Hash32>) -> usize {
    if depth_remaining == 0 {
        return 0;
    }
    let mut edges = neighbors(&node);
    edges.sort_by(|a, b| b.elo.partial_cmp(&a.elo).unwrap_or(Ordering::Equal));

    let mut reached = 0;
    for edge in edges.into_iter().take(DECOMPOSE_MAX_BREADTH) {
        if visited.insert(edge.target) {
            reached += 1;
            reached += expand_recursive(edge.target, neighbors, depth_remaining - 1, visited);
        }
    }
    reached
}

/// Related concepts in the resolved seeds' neighborhoods that are only
/// weakly attested: `rating < 1200` or `obs < 5`. These are things the
/// substrate has touched but can't yet vouch for.
pub fn identify_knowledge_gaps(observation: &Observation, neighbors: impl Fn(&Hash32) -> Vec<Edge>) -> Vec<KnowledgeGap> {
    let mut seen = HashSet::new();
    let mut gaps = Vec::new();
    for seed in &observation.seeds {
        for edge in neighbors(&seed.composition_id) {
            if (edge.elo < 1200.0 || edge.observations < 5) && seen.insert(edge.target) {
                gaps.push(KnowledgeGap { concept: edge.target, rating: edge.elo, observations: edge.observations });
            }
        }
    }
    gaps
}

/// Facts the substrate already knows about `seed`: its direct neighbors
/// whose relation ELO already clears `min_elo`, needing no search.
pub fn query_known_facts(seed: &Hash32, strong_neighbors: impl Fn(&Hash32) -> Vec<(Hash32, f64)>, min_elo: f64) -> Vec<(Hash32, f64)> {
    strong_neighbors(seed).into_iter().filter(|(_, elo)| *elo >= min_elo).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn seed(n: u8, text: &str) -> Seed {
        Seed { composition_id: [n; 32], position: [1.0, 0.0, 0.0, 0.0], text: text.to_string() }
    }

    fn edge(n: u8, elo: f64, observations: u64) -> Edge {
        Edge { target: [n; 32], elo, observations }
    }

    #[test]
    fn is_solvable_requires_empty_seeds_to_fail() {
        assert!(!is_solvable(&Observation { content_words: vec!["x".to_string()], seeds: vec![] }, |_| Vec::new()));
    }

    #[test]
    fn is_solvable_requires_a_majority_of_seeds_with_a_strong_edge() {
        let obs = Observation { content_words: vec![], seeds: vec![seed(1, "cat"), seed(2, "dog"), seed(3, "bird")] };
        let strong: HashMap<Hash32, Vec<Edge>> = HashMap::from([
            ([1u8; 32], vec![edge(9, 1800.0, 50)]),
            ([2u8; 32], vec![edge(9, 1900.0, 20)]),
            ([3u8; 32], vec![edge(9, 900.0, 2)]),
        ]);
        assert!(is_solvable(&obs, |id| strong.get(id).cloned().unwrap_or_default()));
    }

    #[test]
    fn is_solvable_fails_when_only_a_minority_of_seeds_qualify() {
        let obs = Observation { content_words: vec![], seeds: vec![seed(1, "cat"), seed(2, "dog"), seed(3, "bird")] };
        let strong: HashMap<Hash32, Vec<Edge>> = HashMap::from([([1u8; 32], vec![edge(9, 1800.0, 50)])]);
        assert!(!is_solvable(&obs, |id| strong.get(id).cloned().unwrap_or_default()));
    }

    #[test]
    fn is_solvable_rejects_edges_that_miss_either_threshold() {
        let obs = Observation { content_words: vec![], seeds: vec![seed(1, "cat")] };
        // High ELO but too few observations, and high observations but too low ELO: neither qualifies.
        let strong: HashMap<Hash32, Vec<Edge>> = HashMap::from([([1u8; 32], vec![edge(9, 1800.0, 3), edge(8, 1000.0, 200)])]);
        assert!(!is_solvable(&obs, |id| strong.get(id).cloned().unwrap_or_default()));
    }

    #[test]
    fn decompose_problem_lowers_difficulty_for_crowded_neighborhoods() {
        let seeds = vec![seed(1, "cat"), seed(2, "dog")];
        let graph: HashMap<Hash32, Vec<Edge>> = HashMap::from([
            ([2u8; 32], vec![edge(10, 1500.0, 20), edge(11, 1400.0, 20), edge(12, 1300.0, 20), edge(13, 1200.0, 20)]),
        ]);
        let subs = decompose_problem(&seeds, |id| graph.get(id).cloned().unwrap_or_default());
        assert!(subs[0].difficulty > subs[1].difficulty);
    }

    #[test]
    fn decompose_problem_follows_neighbors_beyond_one_hop() {
        let seeds = vec![seed(1, "cat")];
        let graph: HashMap<Hash32, Vec<Edge>> =
            HashMap::from([([1u8; 32], vec![edge(2, 1900.0, 20)]), ([2u8; 32], vec![edge(3, 1800.0, 20)])]);
        let subs = decompose_problem(&seeds, |id| graph.get(id).cloned().unwrap_or_default());
        // Two hops reached (node 2, then node 3 via node 2), so difficulty should reflect both.
        assert!((subs[0].difficulty - 10.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn identify_knowledge_gaps_surfaces_weakly_rated_neighbors() {
        let obs = Observation { content_words: vec![], seeds: vec![seed(1, "cat")] };
        let graph: HashMap<Hash32, Vec<Edge>> =
            HashMap::from([([1u8; 32], vec![edge(2, 1800.0, 50), edge(3, 900.0, 50), edge(4, 1500.0, 2)])]);
        let gaps = identify_knowledge_gaps(&obs, |id| graph.get(id).cloned().unwrap_or_default());
        assert_eq!(gaps.len(), 2);
        assert!(gaps.iter().any(|g| g.concept == [3u8; 32]));
        assert!(gaps.iter().any(|g| g.concept == [4u8; 32]));
    }

    #[test]
    fn query_known_facts_filters_below_min_elo() {
        let facts = query_known_facts(&[1u8; 32], |_| vec![([2u8; 32], 1800.0), ([3u8; 32], 900.0)], 1200.0);
        assert_eq!(facts, vec![([2u8; 32], 1800.0)]);
    }
}
