//! Reflect phase: Reflexion-style quality scoring over a hypothesis, with
//! progressively relaxed re-search rounds when quality falls short.

use super::act::Hypothesis;
use super::decide::Intention;
use crate::config::{ReasoningConfig, SearchConfig};
use crate::geometry::S3Point;
use crate::hash::Hash32;
use crate::monitoring::metrics;
use crate::search::{search_multi_goal, Edge, PathResult};

/// `Q = 0.5*resolution_rate + 0.3*mean_elo/2000 + 0.2*min(1, |paths|/|intentions|)`.
pub fn score(hypothesis: &Hypothesis, intentions_len: usize) -> f64 {
    if intentions_len == 0 {
        return 0.0;
    }
    let resolution_rate = hypothesis.intentions_resolved as f64 / intentions_len as f64;
    let mean_elo = if hypothesis.paths.is_empty() {
        0.0
    } else {
        hypothesis.paths.iter().map(|p| p.avg_elo).sum::<f64>() / hypothesis.paths.len() as f64
    };
    let coverage = (hypothesis.paths.len() as f64 / intentions_len as f64).min(1.0);
    0.5 * resolution_rate + 0.3 * (mean_elo / 2000.0).clamp(0.0, 1.0) + 0.2 * coverage
}

/// The highest-scoring hypothesis across a beam.
pub fn best(hypotheses: &[Hypothesis], intentions_len: usize) -> Option<Hypothesis> {
    hypotheses
        .iter()
        .max_by(|a, b| score(a, intentions_len).partial_cmp(&score(b, intentions_len)).unwrap_or(std::cmp::Ordering::Equal))
        .cloned()
}

/// If the best hypothesis still falls short, retry with progressively
/// relaxed edge filters (halving `min_elo`, decrementing `min_observations`)
/// up to `cfg.max_reflexion_rounds` times, searching from every intention's
/// seed toward every intention's goal at once (multi-goal) so a single
/// relaxed pass can recover several failed intentions together. Stops at
/// the first round that recovers anything.
pub fn relax_and_retry(
    intentions: &[Intention],
    cfg: &ReasoningConfig,
    base_search_cfg: &SearchConfig,
    neighbors: impl Fn(&Hash32) -> Vec<Edge>,
    position: impl Fn(&Hash32) -> Option<S3Point>,
) -> Vec<PathResult> {
    if intentions.is_empty() {
        return Vec::new();
    }
    let mut relaxed = base_search_cfg.clone();
    let goals: Vec<(Hash32, S3Point)> = intentions.iter().map(|i| (i.goal, i.goal_position)).collect();
    let mut recovered = Vec::new();

    for round in 0..cfg.max_reflexion_rounds {
        relaxed.min_elo = (relaxed.min_elo * 0.5).max(0.0);
        relaxed.min_observations = relaxed.min_observations.saturating_sub(1);
        for intention in intentions {
            if let Some(path) = search_multi_goal(intention.seed, position(&intention.seed), &goals, &relaxed, &neighbors, &position) {
                recovered.push(path);
            }
        }
        if !recovered.is_empty() {
            tracing::debug!(round, recovered = recovered.len(), "reflexion recovered paths after relaxing search constraints");
            metrics::REASONING_REFLEXION_ROUNDS.with_label_values(&["recovered"]).observe((round + 1) as f64);
            break;
        }
    }
    if recovered.is_empty() {
        metrics::REASONING_REFLEXION_ROUNDS.with_label_values(&["exhausted"]).observe(cfg.max_reflexion_rounds as f64);
    }
    recovered
}
