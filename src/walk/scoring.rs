//! The walk engine's per-candidate scoring formula and softmax-with-
//! temperature sampling.

use super::candidates::Candidate;
use crate::config::WalkConfig;
use crate::hash::Hash32;
use rand::Rng;
use std::collections::{HashSet, VecDeque};

/// Inputs the scoring formula needs beyond the candidate's own features:
/// how many times it's been visited this walk, whether it was visited
/// recently, whether it's one of the prompt's other seed tokens, and the
/// walk's current energy level.
pub struct ScoringContext<'a> {
    pub visit_counts: &'a std::collections::HashMap<Hash32, u32>,
    pub recent: &'a VecDeque<Hash32>,
    pub context_seeds: &'a HashSet<Hash32>,
    pub current_energy: f64,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Score one candidate under the walk's weighted formula, then apply the
/// pre-softmax sharpening exponent.
pub fn score_candidate(candidate: &Candidate, cfg: &WalkConfig, ctx: &ScoringContext) -> f64 {
    let mut score = cfg.w_model * candidate.elo_score
        + cfg.w_text * candidate.obs_score
        + cfg.w_rel * sigmoid(candidate.rel_strength / 50.0);

    score += if candidate.is_stop_word { score.min(0.02) } else { 0.05 };

    if ctx.context_seeds.contains(&candidate.composition_id) {
        score += 0.3;
    }

    let visits = ctx.visit_counts.get(&candidate.composition_id).copied().unwrap_or(0);
    score -= cfg.w_repeat * visits as f64;

    if ctx.recent.contains(&candidate.composition_id) {
        score -= cfg.w_novelty;
    }

    score += cfg.w_energy * ctx.current_energy;

    score.max(0.0).powf(0.75)
}

/// Keep the top-K candidates by score, descending.
pub fn top_k(mut scored: Vec<(Candidate, f64)>, k: usize) -> Vec<(Candidate, f64)> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

/// `T = clamp(base_temp - energy_alpha * energy, min_temp, base_temp)`.
pub fn temperature(cfg: &WalkConfig, energy: f64) -> f64 {
    (cfg.base_temp - cfg.energy_alpha * energy).clamp(cfg.min_temp, cfg.base_temp)
}

/// Softmax the given scores with temperature `t`, sample one index from the
/// resulting categorical distribution via `rng`. Returns `None` for an
/// empty input.
pub fn sample_softmax<R: Rng + ?Sized>(scores: &[f64], temperature: f64, rng: &mut R) -> Option<usize> {
    if scores.is_empty() {
        return None;
    }
    let t = temperature.max(1e-6);
    let max_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = scores.iter().map(|s| ((s - max_score) / t).exp()).collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Some(0);
    }
    let mut draw = rng.gen_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        if draw < *w {
            return Some(i);
        }
        draw -= w;
    }
    Some(weights.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn candidate(id: u8, elo_score: f64, obs_score: f64, is_stop_word: bool) -> Candidate {
        Candidate {
            composition_id: [id; 32],
            text: "x".into(),
            total_obs: 1,
            max_rating: 1000.0,
            is_stop_word,
            elo_score,
            obs_score,
            rel_strength: 0.0,
        }
    }

    #[test]
    fn higher_elo_score_yields_higher_walk_score() {
        let cfg = WalkConfig::default();
        let visits = std::collections::HashMap::new();
        let recent = VecDeque::new();
        let seeds = HashSet::new();
        let ctx = ScoringContext { visit_counts: &visits, recent: &recent, context_seeds: &seeds, current_energy: 1.0 };
        let low = score_candidate(&candidate(1, 0.1, 0.5, false), &cfg, &ctx);
        let high = score_candidate(&candidate(2, 0.9, 0.5, false), &cfg, &ctx);
        assert!(high > low);
    }

    #[test]
    fn repeat_visits_lower_score() {
        let cfg = WalkConfig::default();
        let mut visits = std::collections::HashMap::new();
        visits.insert([1u8; 32], 5);
        let recent = VecDeque::new();
        let seeds = HashSet::new();
        let ctx_visited = ScoringContext { visit_counts: &visits, recent: &recent, context_seeds: &seeds, current_energy: 1.0 };
        let ctx_fresh = ScoringContext { visit_counts: &std::collections::HashMap::new(), recent: &recent, context_seeds: &seeds, current_energy: 1.0 };
        let visited_score = score_candidate(&candidate(1, 0.5, 0.5, false), &cfg, &ctx_visited);
        let fresh_score = score_candidate(&candidate(1, 0.5, 0.5, false), &cfg, &ctx_fresh);
        assert!(visited_score < fresh_score);
    }

    #[test]
    fn temperature_drops_with_energy_but_stays_above_min() {
        let cfg = WalkConfig::default();
        let t = temperature(&cfg, 100.0);
        assert!(t >= cfg.min_temp);
    }

    #[test]
    fn sample_softmax_is_deterministic_for_a_seeded_rng() {
        let mut rng = StdRng::seed_from_u64(7);
        let scores = vec![0.1, 0.9, 0.2];
        let idx = sample_softmax(&scores, 1.0, &mut rng).unwrap();
        assert!(idx < scores.len());
    }

    #[test]
    fn sample_softmax_empty_is_none() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample_softmax(&[], 1.0, &mut rng).is_none());
    }
}
