//! The OODA-style reasoning orchestrator (§4.9): observe the prompt, orient
//! against the known graph, decide which intentions to pursue, act via
//! Tree-of-Thought beam search, and reflect on the resulting hypothesis
//! before assembling a response.

pub mod act;
pub mod decide;
pub mod observe;
pub mod orient;
pub mod reflect;

pub use act::{act, Hypothesis};
pub use decide::{decide, Intention, IntentionKind};
pub use observe::{observe, Observation, Seed};
pub use orient::{decompose_problem, identify_knowledge_gaps, is_solvable, query_known_facts, KnowledgeGap, SubProblem};

use crate::config::{ReasoningConfig, SearchConfig};
use crate::geometry::S3Point;
use crate::hash::Hash32;
use crate::monitoring::{logging::spans, metrics};
use crate::search::{Edge, PathResult};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ReasoningResult {
    pub response: String,
    pub quality: f64,
    pub paths: Vec<PathResult>,
    pub knowledge_gaps: Vec<KnowledgeGap>,
    pub trace: Option<Vec<String>>,
}

/// Dependencies the orchestrator needs from the graph store, grouped so the
/// `run` signature stays readable. All callbacks are synchronous; callers
/// backed by Postgres resolve them ahead of time into in-memory maps rather
/// than threading `async` through five phases of orchestration logic.
pub struct GraphAccess<'a> {
    pub resolve: &'a dyn Fn(&str) -> Option<(Hash32, S3Point)>,
    pub strong_neighbors: &'a dyn Fn(&Hash32) -> Vec<(Hash32, f64)>,
    pub neighbors: &'a dyn Fn(&Hash32) -> Vec<Edge>,
    pub position: &'a dyn Fn(&Hash32) -> Option<S3Point>,
    pub text_of: &'a dyn Fn(&Hash32) -> Option<String>,
}

/// Run the full five-phase pipeline for one prompt. `history` is prior
/// turns, oldest first; only the last 3 are observed.
pub fn run(prompt: &str, history: &[String], cfg: &ReasoningConfig, search_cfg: &SearchConfig, graph: &GraphAccess) -> ReasoningResult {
    let mut trace = Vec::new();

    let observation = {
        let span = spans::reasoning_phase("observe");
        let _guard = span.enter();
        observe(prompt, history, graph.resolve)
    };
    trace.push(format!("observed {} content words, {} resolved", observation.content_words.len(), observation.seeds.len()));

    if !is_solvable(&observation, graph.neighbors) {
        metrics::REASONING_REQUESTS_TOTAL.with_label_values(&["degraded"]).inc();
        return ReasoningResult {
            response: "I don't have anything in the substrate to reason from yet.".to_string(),
            quality: 0.0,
            paths: Vec::new(),
            knowledge_gaps: identify_knowledge_gaps(&observation, graph.neighbors),
            trace: finish_trace(cfg, trace),
        };
    }

    let (knowledge_gaps, sub_problems) = {
        let span = spans::reasoning_phase("orient");
        let _guard = span.enter();
        let knowledge_gaps = identify_knowledge_gaps(&observation, graph.neighbors);
        let sub_problems = decompose_problem(&observation.seeds, graph.neighbors);
        (knowledge_gaps, sub_problems)
    };
    trace.push(format!("decomposed into {} sub-problems, {} knowledge gaps", sub_problems.len(), knowledge_gaps.len()));

    let seeds_by_composition: HashMap<Hash32, S3Point> = observation.seeds.iter().map(|s| (s.composition_id, s.position)).collect();
    let known_facts: Vec<(Hash32, Hash32, f64)> = observation
        .seeds
        .iter()
        .flat_map(|s| {
            let seed = s.composition_id;
            query_known_facts(&s.composition_id, graph.strong_neighbors, search_cfg.min_elo).into_iter().map(move |(target, elo)| (seed, target, elo))
        })
        .collect();

    let intentions = {
        let span = spans::reasoning_phase("decide");
        let _guard = span.enter();
        decide::decide(&sub_problems, &seeds_by_composition, &known_facts)
    };
    trace.push(format!("decided on {} intentions", intentions.len()));

    if let Some(answer) = quick_answer(&intentions, graph.text_of) {
        metrics::REASONING_REQUESTS_TOTAL.with_label_values(&["resolved"]).inc();
        metrics::REASONING_QUALITY.with_label_values(&["initial"]).observe(1.0);
        return ReasoningResult { response: answer, quality: 1.0, paths: Vec::new(), knowledge_gaps, trace: finish_trace(cfg, trace) };
    }

    let hypotheses = {
        let span = spans::reasoning_phase("act");
        let _guard = span.enter();
        act::act(&intentions, cfg.beam_width, search_cfg, graph.neighbors, graph.position)
    };

    let span = spans::reasoning_phase("reflect");
    let _guard = span.enter();
    let mut best_hypothesis = reflect::best(&hypotheses, intentions.len());
    let mut quality = best_hypothesis.as_ref().map(|h| reflect::score(h, intentions.len())).unwrap_or(0.0);
    metrics::REASONING_QUALITY.with_label_values(&["initial"]).observe(quality);

    if quality < cfg.min_path_quality {
        trace.push(format!("quality {quality:.2} below {:.2}; relaxing search", cfg.min_path_quality));
        let recovered = reflect::relax_and_retry(&intentions, cfg, search_cfg, graph.neighbors, graph.position);
        if !recovered.is_empty() {
            let recovered_hypothesis = Hypothesis { intentions_resolved: recovered.len(), paths: recovered };
            let recovered_quality = reflect::score(&recovered_hypothesis, intentions.len());
            if recovered_quality > quality {
                quality = recovered_quality;
                best_hypothesis = Some(recovered_hypothesis);
            }
        }
        metrics::REASONING_QUALITY.with_label_values(&["post_reflexion"]).observe(quality);
    }
    drop(_guard);

    let paths = best_hypothesis.map(|h| h.paths).unwrap_or_default();
    let response = assemble_response(&paths, cfg.max_response_words, graph.text_of);

    let outcome = if quality >= cfg.min_path_quality { "resolved" } else { "degraded" };
    metrics::REASONING_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();

    ReasoningResult { response, quality, paths, knowledge_gaps, trace: finish_trace(cfg, trace) }
}

fn finish_trace(cfg: &ReasoningConfig, trace: Vec<String>) -> Option<Vec<String>> {
    if cfg.include_reasoning_trace {
        Some(trace)
    } else {
        None
    }
}

/// Fast path: if every intention is already a known fact (no bridge or
/// sub-problem needed search at all), answer directly from them without
/// invoking A*.
fn quick_answer(intentions: &[Intention], text_of: &dyn Fn(&Hash32) -> Option<String>) -> Option<String> {
    if intentions.is_empty() || !intentions.iter().all(|i| i.kind == IntentionKind::KnownFact) {
        return None;
    }
    let words: Vec<String> = intentions.iter().filter_map(|i| text_of(&i.goal)).collect();
    if words.is_empty() {
        return None;
    }
    Some(crate::walk::assemble_text(&words))
}

/// Unique token texts across all resolved paths, in path order, case-folded
/// deduplication, capped at `max_words`, assembled into prose.
fn assemble_response(paths: &[PathResult], max_words: usize, text_of: &dyn Fn(&Hash32) -> Option<String>) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut words = Vec::new();
    'paths: for path in paths {
        for id in &path.path {
            if let Some(text) = text_of(id) {
                let lower = text.to_lowercase();
                if seen.insert(lower) {
                    words.push(text);
                    if words.len() >= max_words {
                        break 'paths;
                    }
                }
            }
        }
    }
    if words.is_empty() {
        return "I couldn't find a path through the substrate for that.".to_string();
    }
    crate::walk::assemble_text(&words)
}

/// Streaming variant: runs the same pipeline, then delivers the response's
/// words one at a time via `on_token` instead of returning it all at once.
/// Used by interactive callers (e.g. a chat UI) that want to render
/// incrementally.
pub fn run_streaming(
    prompt: &str,
    history: &[String],
    cfg: &ReasoningConfig,
    search_cfg: &SearchConfig,
    graph: &GraphAccess,
    mut on_token: impl FnMut(&str),
) -> ReasoningResult {
    let result = run(prompt, history, cfg, search_cfg, graph);
    for word in result.response.split_whitespace() {
        on_token(word);
    }
    result
}
