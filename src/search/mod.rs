//! A* search over the relation graph (§4.7): a binary-heap open set keyed
//! by `f = g + w_h * h`, with an ELO/observation-weighted edge cost and a
//! geodesic admissible heuristic.

pub mod heuristic;

pub use heuristic::{edge_cost, heuristic, UNKNOWN_POSITION_HEURISTIC};

use crate::config::SearchConfig;
use crate::geometry::S3Point;
use crate::hash::{to_hex, Hash32};
use crate::monitoring::metrics;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// One outgoing edge from a node, as the caller's graph-access function
/// hands them back.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub target: Hash32,
    pub elo: f64,
    pub observations: u64,
}

#[derive(Debug, Clone, Copy)]
struct NodeState {
    g_cost: f64,
    incoming_edge_elo: f64,
    incoming_edge_obs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry {
    f: f64,
    node: Hash32,
}

impl Eq for OpenEntry {}
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so `BinaryHeap` (a max-heap) pops the lowest `f` first.
        other.f.partial_cmp(&self.f).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct PathResult {
    pub path: Vec<Hash32>,
    pub total_cost: f64,
    pub avg_elo: f64,
    pub total_observations: u64,
}

/// Find a shortest-cost path from `start` to `goal` via repeated calls to
/// `neighbors` (the caller's relation-sequence join, already resolved into
/// `Edge`s) and `position` (composition id → S³ position, used for the
/// heuristic; `None` falls back to the worst-case heuristic value).
///
/// Neighbors are filtered by `cfg.min_elo`/`cfg.min_observations` before
/// expansion. Search gives up (returns `None`) after `cfg.max_expansions`
/// nodes have been popped from the open set without reaching the goal.
/// `cfg.heuristic_weight == 0.0` degrades this to Dijkstra.
pub fn search(
    start: Hash32,
    start_position: Option<S3Point>,
    goal: Hash32,
    goal_position: S3Point,
    cfg: &SearchConfig,
    neighbors: impl Fn(&Hash32) -> Vec<Edge>,
    position: impl Fn(&Hash32) -> Option<S3Point>,
) -> Option<PathResult> {
    search_multi_goal(start, start_position, &[(goal, goal_position)], cfg, neighbors, position)
}

/// Multi-goal variant: terminates as soon as any goal is reached, using the
/// minimum heuristic distance across all goals. Used by the reasoning
/// orchestrator's Reflexion recovery, which searches from one seed toward
/// several candidate goals at once.
pub fn search_multi_goal(
    start: Hash32,
    start_position: Option<S3Point>,
    goals: &[(Hash32, S3Point)],
    cfg: &SearchConfig,
    neighbors: impl Fn(&Hash32) -> Vec<Edge>,
    position: impl Fn(&Hash32) -> Option<S3Point>,
) -> Option<PathResult> {
    if goals.is_empty() {
        return None;
    }

    let span = crate::monitoring::logging::spans::search(&to_hex(&start), &to_hex(&goals[0].0));
    let _guard = span.enter();

    let mut states: HashMap<Hash32, NodeState> = HashMap::new();
    let mut parents: HashMap<Hash32, Hash32> = HashMap::new();
    let mut open = BinaryHeap::new();

    states.insert(start, NodeState { g_cost: 0.0, incoming_edge_elo: 0.0, incoming_edge_obs: 0 });
    open.push(OpenEntry { f: h_to_any_goal(start_position, goals), node: start });

    let goal_set: HashMap<Hash32, S3Point> = goals.iter().cloned().collect();
    let mut expansions = 0usize;

    while let Some(OpenEntry { node, .. }) = open.pop() {
        if goal_set.contains_key(&node) {
            let result = reconstruct(node, &states, &parents);
            metrics::SEARCH_EXPANSIONS.with_label_values(&["found"]).observe(expansions as f64);
            metrics::SEARCH_PATH_COST.with_label_values(&["found"]).observe(result.total_cost);
            return Some(result);
        }
        expansions += 1;
        if expansions > cfg.max_expansions {
            metrics::SEARCH_EXPANSIONS.with_label_values(&["exhausted_budget"]).observe(expansions as f64);
            return None;
        }

        let g = states[&node].g_cost;
        for edge in neighbors(&node) {
            if edge.elo < cfg.min_elo || edge.observations < cfg.min_observations {
                continue;
            }
            let cost = edge_cost(edge.elo, edge.observations);
            let tentative_g = g + cost;
            let better = states.get(&edge.target).map(|s| tentative_g < s.g_cost).unwrap_or(true);
            if better {
                states.insert(
                    edge.target,
                    NodeState { g_cost: tentative_g, incoming_edge_elo: edge.elo, incoming_edge_obs: edge.observations },
                );
                parents.insert(edge.target, node);
                let h = h_to_any_goal(position(&edge.target), goals);
                open.push(OpenEntry { f: tentative_g + cfg.heuristic_weight * h, node: edge.target });
            }
        }
    }
    metrics::SEARCH_EXPANSIONS.with_label_values(&["exhausted_budget"]).observe(expansions as f64);
    None
}

fn h_to_any_goal(position: Option<S3Point>, goals: &[(Hash32, S3Point)]) -> f64 {
    match position {
        None => UNKNOWN_POSITION_HEURISTIC,
        Some(p) => goals.iter().map(|(_, gp)| heuristic(&p, gp)).fold(f64::INFINITY, f64::min),
    }
}

fn reconstruct(goal: Hash32, states: &HashMap<Hash32, NodeState>, parents: &HashMap<Hash32, Hash32>) -> PathResult {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&parent) = parents.get(&current) {
        path.push(parent);
        current = parent;
    }
    path.reverse();

    let mut elo_sum = 0.0;
    let mut elo_count = 0u64;
    let mut total_observations = 0u64;
    for node in &path[1..] {
        let s = &states[node];
        elo_sum += s.incoming_edge_elo;
        elo_count += 1;
        total_observations += s.incoming_edge_obs;
    }
    let avg_elo = if elo_count > 0 { elo_sum / elo_count as f64 } else { 0.0 };

    PathResult { total_cost: states[&goal].g_cost, avg_elo, total_observations, path }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> Hash32 {
        [n; 32]
    }

    #[test]
    fn finds_direct_path_between_adjacent_nodes() {
        let cfg = SearchConfig::default();
        let graph: HashMap<Hash32, Vec<Edge>> =
            HashMap::from([(id(1), vec![Edge { target: id(2), elo: 1800.0, observations: 50 }])]);
        let result = search(
            id(1),
            Some([1.0, 0.0, 0.0, 0.0]),
            id(2),
            [0.0, 1.0, 0.0, 0.0],
            &cfg,
            |n| graph.get(n).cloned().unwrap_or_default(),
            |_| None,
        );
        let result = result.unwrap();
        assert_eq!(result.path, vec![id(1), id(2)]);
    }

    #[test]
    fn prefers_cheaper_high_elo_path_over_low_elo_shortcut() {
        let cfg = SearchConfig { min_elo: 0.0, min_observations: 0, ..SearchConfig::default() };
        let graph: HashMap<Hash32, Vec<Edge>> = HashMap::from([
            (id(1), vec![Edge { target: id(2), elo: 850.0, observations: 1 }, Edge { target: id(3), elo: 1900.0, observations: 500 }]),
            (id(3), vec![Edge { target: id(2), elo: 1900.0, observations: 500 }]),
        ]);
        let result = search(
            id(1),
            None,
            id(2),
            [0.0, 0.0, 1.0, 0.0],
            &cfg,
            |n| graph.get(n).cloned().unwrap_or_default(),
            |_| None,
        )
        .unwrap();
        assert_eq!(result.path, vec![id(1), id(3), id(2)]);
    }

    #[test]
    fn unreachable_goal_returns_none() {
        let cfg = SearchConfig::default();
        let graph: HashMap<Hash32, Vec<Edge>> = HashMap::new();
        let result = search(id(1), None, id(9), [0.0, 0.0, 0.0, 1.0], &cfg, |n| graph.get(n).cloned().unwrap_or_default(), |_| None);
        assert!(result.is_none());
    }

    #[test]
    fn min_elo_filter_excludes_weak_edges() {
        let cfg = SearchConfig { min_elo: 1500.0, min_observations: 0, ..SearchConfig::default() };
        let graph: HashMap<Hash32, Vec<Edge>> = HashMap::from([(id(1), vec![Edge { target: id(2), elo: 900.0, observations: 10 }])]);
        let result = search(id(1), None, id(2), [0.0, 1.0, 0.0, 0.0], &cfg, |n| graph.get(n).cloned().unwrap_or_default(), |_| None);
        assert!(result.is_none());
    }

    #[test]
    fn multi_goal_stops_at_whichever_goal_is_reached_first() {
        let cfg = SearchConfig { min_elo: 0.0, min_observations: 0, ..SearchConfig::default() };
        let graph: HashMap<Hash32, Vec<Edge>> =
            HashMap::from([(id(1), vec![Edge { target: id(2), elo: 1800.0, observations: 50 }])]);
        let result = search_multi_goal(
            id(1),
            None,
            &[(id(2), [0.0, 1.0, 0.0, 0.0]), (id(3), [0.0, 0.0, 1.0, 0.0])],
            &cfg,
            |n| graph.get(n).cloned().unwrap_or_default(),
            |_| None,
        )
        .unwrap();
        assert_eq!(result.path, vec![id(1), id(2)]);
    }
}
