//! The generative walk engine (§4.6): candidate generation, weighted
//! scoring, softmax-with-temperature sampling, and state/energy tracking.

pub mod assemble;
pub mod candidates;
pub mod scoring;

pub use assemble::assemble_text;
pub use candidates::{prepare_candidates, Candidate, RawEdge};
pub use scoring::{sample_softmax, score_candidate, temperature, top_k, ScoringContext};

use crate::config::WalkConfig;
use crate::geometry::S3Point;
use crate::hash::Hash32;
use crate::monitoring::metrics;
use rand::Rng;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq)]
pub enum WalkOutcome {
    Continue,
    OutOfEnergy,
    Trapped,
    GoalReached,
}

/// Full mutable state of one walk in progress.
#[derive(Debug, Clone)]
pub struct WalkState {
    pub current_composition: Hash32,
    pub current_position: S3Point,
    pub current_energy: f64,
    pub trajectory: Vec<Hash32>,
    pub visit_counts: HashMap<Hash32, u32>,
    pub recent: VecDeque<Hash32>,
    pub goal_composition: Option<Hash32>,
    pub goal_position: Option<S3Point>,
    pub context_seeds: HashSet<Hash32>,
}

impl WalkState {
    pub fn new(start: Hash32, start_position: S3Point, energy: f64) -> Self {
        Self {
            current_composition: start,
            current_position: start_position,
            current_energy: energy,
            trajectory: vec![start],
            visit_counts: HashMap::from([(start, 1)]),
            recent: VecDeque::new(),
            goal_composition: None,
            goal_position: None,
            context_seeds: HashSet::new(),
        }
    }

    fn push_recent(&mut self, composition_id: Hash32, window: usize) {
        self.recent.push_back(composition_id);
        while self.recent.len() > window {
            self.recent.pop_front();
        }
    }
}

/// One walk step: build candidates from `raw_edges` (already fetched by the
/// caller from the relation graph), score and sample one, then update
/// `state` in place. `position_lookup` resolves a chosen composition's
/// current S³ position, used to advance `current_position` and to check
/// goal arrival.
pub fn step<R: Rng + ?Sized>(
    state: &mut WalkState,
    raw_edges: Vec<RawEdge>,
    cfg: &WalkConfig,
    position_lookup: impl Fn(&Hash32) -> Option<S3Point>,
    rng: &mut R,
) -> WalkOutcome {
    if state.current_energy <= 0.0 {
        record_terminal(&WalkOutcome::OutOfEnergy, state.current_energy);
        return WalkOutcome::OutOfEnergy;
    }

    let candidates = prepare_candidates(raw_edges);
    if candidates.is_empty() {
        record_terminal(&WalkOutcome::Trapped, state.current_energy);
        return WalkOutcome::Trapped;
    }

    let ctx = ScoringContext {
        visit_counts: &state.visit_counts,
        recent: &state.recent,
        context_seeds: &state.context_seeds,
        current_energy: state.current_energy,
    };
    let scored: Vec<(Candidate, f64)> = candidates
        .into_iter()
        .map(|c| {
            let s = score_candidate(&c, cfg, &ctx);
            (c, s)
        })
        .collect();
    let top = top_k(scored, cfg.top_k);

    let t = temperature(cfg, state.current_energy);
    let scores: Vec<f64> = top.iter().map(|(_, s)| *s).collect();
    let chosen_index = match sample_softmax(&scores, t, rng) {
        Some(i) => i,
        None => {
            record_terminal(&WalkOutcome::Trapped, state.current_energy);
            return WalkOutcome::Trapped;
        }
    };
    let chosen = &top[chosen_index].0;
    let chosen_id = chosen.composition_id;

    state.trajectory.push(chosen_id);
    *state.visit_counts.entry(chosen_id).or_insert(0) += 1;
    state.push_recent(chosen_id, cfg.recent_window);
    state.current_energy -= cfg.energy_decay;
    state.current_composition = chosen_id;
    if let Some(pos) = position_lookup(&chosen_id) {
        state.current_position = pos;
    }

    if state.current_energy <= 0.0 {
        record_terminal(&WalkOutcome::OutOfEnergy, state.current_energy);
        return WalkOutcome::OutOfEnergy;
    }
    if let Some(goal) = state.goal_composition {
        if goal == chosen_id {
            record_terminal(&WalkOutcome::GoalReached, state.current_energy);
            return WalkOutcome::GoalReached;
        }
    }
    WalkOutcome::Continue
}

fn record_terminal(outcome: &WalkOutcome, energy_remaining: f64) {
    let label = match outcome {
        WalkOutcome::Continue => return,
        WalkOutcome::OutOfEnergy => "OutOfEnergy",
        WalkOutcome::Trapped => "Trapped",
        WalkOutcome::GoalReached => "GoalReached",
    };
    metrics::WALK_STEPS_TOTAL.with_label_values(&[label]).inc();
    metrics::WALK_ENERGY_REMAINING.with_label_values(&[label]).set(energy_remaining.max(0.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn edge(id: u8, text: &str) -> RawEdge {
        RawEdge { composition_id: [id; 32], text: text.to_string(), observations: 3, rating: 1200.0 }
    }

    #[test]
    fn step_with_no_edges_is_trapped() {
        let mut state = WalkState::new([0u8; 32], [1.0, 0.0, 0.0, 0.0], 1.0);
        let cfg = WalkConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = step(&mut state, Vec::new(), &cfg, |_| None, &mut rng);
        assert_eq!(outcome, WalkOutcome::Trapped);
    }

    #[test]
    fn step_with_zero_energy_is_out_of_energy_before_sampling() {
        let mut state = WalkState::new([0u8; 32], [1.0, 0.0, 0.0, 0.0], 0.0);
        let cfg = WalkConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = step(&mut state, vec![edge(1, "cat")], &cfg, |_| None, &mut rng);
        assert_eq!(outcome, WalkOutcome::OutOfEnergy);
    }

    #[test]
    fn step_updates_trajectory_and_visit_counts() {
        let mut state = WalkState::new([0u8; 32], [1.0, 0.0, 0.0, 0.0], 1.0);
        let cfg = WalkConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = step(&mut state, vec![edge(1, "cat"), edge(2, "dog")], &cfg, |_| None, &mut rng);
        assert_eq!(outcome, WalkOutcome::Continue);
        assert_eq!(state.trajectory.len(), 2);
    }

    #[test]
    fn reaching_the_goal_composition_ends_the_walk() {
        let mut state = WalkState::new([0u8; 32], [1.0, 0.0, 0.0, 0.0], 1.0);
        state.goal_composition = Some([1u8; 32]);
        let cfg = WalkConfig { top_k: 1, ..WalkConfig::default() };
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = step(&mut state, vec![edge(1, "cat")], &cfg, |_| None, &mut rng);
        assert_eq!(outcome, WalkOutcome::GoalReached);
    }
}
