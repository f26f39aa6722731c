//! Act phase: Tree-of-Thought beam search over intentions. Each beam
//! pursues the same intentions in a different rotation and chains one A*
//! call per intention, so beams that start from a different "first move"
//! can land on different overall hypotheses even over the same graph.

use super::decide::Intention;
use crate::config::SearchConfig;
use crate::geometry::S3Point;
use crate::hash::Hash32;
use crate::search::{search_multi_goal, Edge, PathResult};

#[derive(Debug, Clone)]
pub struct Hypothesis {
    pub paths: Vec<PathResult>,
    pub intentions_resolved: usize,
}

/// Run `beam_width` beams (at least 1), each a rotation of `intentions`'
/// order, chaining an A* search per intention from its seed toward its
/// goal. A beam that fails a search simply skips that intention; its
/// hypothesis is whatever it managed to resolve.
pub fn act(
    intentions: &[Intention],
    beam_width: usize,
    cfg: &SearchConfig,
    neighbors: &impl Fn(&Hash32) -> Vec<Edge>,
    position: &impl Fn(&Hash32) -> Option<S3Point>,
) -> Vec<Hypothesis> {
    if intentions.is_empty() {
        return Vec::new();
    }
    (0..beam_width.max(1))
        .map(|beam| {
            let rotation = rotate(intentions, beam);
            let mut paths = Vec::new();
            for intention in &rotation {
                if let Some(path) =
                    search_multi_goal(intention.seed, position(&intention.seed), &[(intention.goal, intention.goal_position)], cfg, neighbors, position)
                {
                    paths.push(path);
                }
            }
            let intentions_resolved = paths.len();
            Hypothesis { paths, intentions_resolved }
        })
        .collect()
}

fn rotate(intentions: &[Intention], offset: usize) -> Vec<Intention> {
    if intentions.is_empty() {
        return Vec::new();
    }
    let offset = offset % intentions.len();
    intentions[offset..].iter().chain(intentions[..offset].iter()).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash32;
    use std::collections::HashMap;

    fn id(n: u8) -> Hash32 {
        [n; 32]
    }

    fn intention(seed: u8, goal: u8) -> Intention {
        Intention {
            kind: super::super::decide::IntentionKind::Bridge,
            seed: id(seed),
            goal: id(goal),
            goal_position: [0.0, 1.0, 0.0, 0.0],
            priority: 0.8,
        }
    }

    #[test]
    fn no_intentions_yields_no_hypotheses() {
        let cfg = SearchConfig::default();
        let graph: HashMap<Hash32, Vec<Edge>> = HashMap::new();
        let hyps = act(&[], 3, &cfg, &|n| graph.get(n).cloned().unwrap_or_default(), &|_| None);
        assert!(hyps.is_empty());
    }

    #[test]
    fn each_beam_resolves_a_reachable_intention() {
        let cfg = SearchConfig { min_elo: 0.0, min_observations: 0, ..SearchConfig::default() };
        let graph: HashMap<Hash32, Vec<Edge>> = HashMap::from([(id(1), vec![Edge { target: id(2), elo: 1800.0, observations: 50 }])]);
        let intentions = vec![intention(1, 2)];
        let hyps = act(&intentions, 2, &cfg, &|n| graph.get(n).cloned().unwrap_or_default(), &|_| None);
        assert_eq!(hyps.len(), 2);
        assert_eq!(hyps[0].intentions_resolved, 1);
    }

    #[test]
    fn unreachable_intentions_are_skipped_not_fatal() {
        let cfg = SearchConfig::default();
        let graph: HashMap<Hash32, Vec<Edge>> = HashMap::new();
        let intentions = vec![intention(1, 2)];
        let hyps = act(&intentions, 1, &cfg, &|n| graph.get(n).cloned().unwrap_or_default(), &|_| None);
        assert_eq!(hyps[0].intentions_resolved, 0);
        assert!(hyps[0].paths.is_empty());
    }

    #[test]
    fn rotation_reorders_but_preserves_all_intentions() {
        let intentions = vec![intention(1, 2), intention(3, 4), intention(5, 6)];
        let rotated = rotate(&intentions, 1);
        assert_eq!(rotated[0].seed, id(3));
        assert_eq!(rotated.len(), intentions.len());
    }
}
