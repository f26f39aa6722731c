//! Decide phase: turn sub-problems and known facts into a priority-ordered
//! list of intentions to pursue in the Act phase.

use super::orient::SubProblem;
use crate::geometry::S3Point;
use crate::hash::Hash32;
use std::collections::HashMap;

const MAX_INTENTIONS: usize = 8;
const BRIDGE_PRIORITY: f64 = 0.8;
const KNOWN_FACT_PRIORITY: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum IntentionKind {
    /// Connect two seeds mentioned in the same prompt: the standard case of
    /// "how does A relate to B".
    Bridge,
    /// Explore outward from one seed, weighted by how hard that seed's own
    /// sub-problem looked during Orient.
    SubProblem { difficulty: f64 },
    /// Already known above the confidence floor; surfaced as a low-priority
    /// confirmation rather than a search target.
    KnownFact,
}

#[derive(Debug, Clone)]
pub struct Intention {
    pub kind: IntentionKind,
    pub seed: Hash32,
    pub goal: Hash32,
    pub goal_position: S3Point,
    pub priority: f64,
}

/// Build intentions from every distinct pair of sub-problem seeds (as both
/// a bridge and a per-seed sub-problem search, since they capture different
/// motivations for the same search) plus one per already-known fact.
/// Sorted by priority descending, capped at [`MAX_INTENTIONS`].
pub fn decide(sub_problems: &[SubProblem], seeds_by_composition: &HashMap<Hash32, S3Point>, known_facts: &[(Hash32, Hash32, f64)]) -> Vec<Intention> {
    let mut intentions = Vec::new();

    for (i, from) in sub_problems.iter().enumerate() {
        for (j, to) in sub_problems.iter().enumerate() {
            if i == j {
                continue;
            }
            let Some(&goal_position) = seeds_by_composition.get(&to.seed) else { continue };

            intentions.push(Intention { kind: IntentionKind::Bridge, seed: from.seed, goal: to.seed, goal_position, priority: BRIDGE_PRIORITY });
            intentions.push(Intention {
                kind: IntentionKind::SubProblem { difficulty: from.difficulty },
                seed: from.seed,
                goal: to.seed,
                goal_position,
                priority: (1.0 - from.difficulty / 10.0).clamp(0.0, 1.0),
            });
        }
    }

    for &(seed, target, elo) in known_facts {
        if let Some(&goal_position) = seeds_by_composition.get(&target) {
            intentions.push(Intention {
                kind: IntentionKind::KnownFact,
                seed,
                goal: target,
                goal_position,
                priority: KNOWN_FACT_PRIORITY * (elo / 2000.0).clamp(0.0, 1.0),
            });
        }
    }

    intentions.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
    intentions.truncate(MAX_INTENTIONS);
    intentions
}
