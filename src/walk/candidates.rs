//! Candidate generation for a single walk step: aggregate raw relation rows
//! reachable from the current composition, drop artifact tokens, and
//! compute the per-candidate features the scoring formula needs.

use crate::hash::Hash32;
use std::collections::HashMap;

/// One relation-sequence join row: a composition reachable from the current
/// one via some relation, with that relation's observation count and rating.
/// Before aggregation there may be several of these per target (multiple
/// relations landing on the same composition).
#[derive(Debug, Clone)]
pub struct RawEdge {
    pub composition_id: Hash32,
    pub text: String,
    pub observations: u64,
    pub rating: f64,
}

/// A target composition with its aggregated graph features, ready to score.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub composition_id: Hash32,
    pub text: String,
    pub total_obs: u64,
    pub max_rating: f64,
    pub is_stop_word: bool,
    pub elo_score: f64,
    pub obs_score: f64,
    /// Deviation of this candidate's rating from the baseline ELO (1000),
    /// fed into the scoring formula's `sigmoid(rel_strength / 50)` term.
    pub rel_strength: f64,
}

const ARTIFACT_EXACT: &[&str] = &["[PAD]", "[CLS]", "[SEP]", "[MASK]", "[UNK]"];

const FUNCTION_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "of", "to", "in", "on", "at", "for", "with", "by",
    "from", "as", "is", "are", "was", "were", "be", "been", "being", "this", "that", "these",
    "those", "it", "its", "he", "she", "they", "we", "you", "i", "not", "no", "so", "if", "than",
    "then", "there", "here", "what", "which", "who", "whom", "when", "where", "why", "how",
];

fn is_artifact_token(text: &str) -> bool {
    if ARTIFACT_EXACT.contains(&text) {
        return true;
    }
    if text.starts_with("[unused") && text.ends_with(']') {
        return true;
    }
    if let Some(rest) = text.strip_prefix("##") {
        let _ = rest;
        return true;
    }
    if let Some(rest) = text.strip_prefix('#') {
        if !rest.chars().next().map(char::is_alphabetic).unwrap_or(false) {
            return true;
        }
    }
    false
}

pub(crate) fn is_stop_word(text: &str) -> bool {
    FUNCTION_WORDS.contains(&text.to_lowercase().as_str())
}

/// Aggregate raw edges per target (`sum observations, take max rating`),
/// drop artifact tokens, and compute `elo_score`/`obs_score` from the
/// surviving set's local min/max. Returns an empty vector if everything was
/// filtered out or the input was empty — the walk engine treats that as
/// `Trapped`.
pub fn prepare_candidates(raw: Vec<RawEdge>) -> Vec<Candidate> {
    let mut aggregated: HashMap<Hash32, (String, u64, f64)> = HashMap::new();
    for edge in raw {
        if is_artifact_token(&edge.text) {
            continue;
        }
        let entry = aggregated.entry(edge.composition_id).or_insert((edge.text.clone(), 0, f64::MIN));
        entry.1 += edge.observations;
        entry.2 = entry.2.max(edge.rating);
    }

    let surviving: Vec<(Hash32, String, u64, f64)> = aggregated
        .into_iter()
        .filter(|(_, (_, obs, _))| *obs >= 1)
        .map(|(id, (text, obs, rating))| (id, text, obs, rating))
        .collect();

    if surviving.is_empty() {
        return Vec::new();
    }

    let min_rating = surviving.iter().map(|(_, _, _, r)| *r).fold(f64::INFINITY, f64::min);
    let max_rating = surviving.iter().map(|(_, _, _, r)| *r).fold(f64::NEG_INFINITY, f64::max);
    let max_total_obs = surviving.iter().map(|(_, _, obs, _)| *obs).max().unwrap_or(1).max(1);
    let rating_span = (max_rating - min_rating).max(1e-9);

    surviving
        .into_iter()
        .map(|(composition_id, text, total_obs, max_rating_for_target)| Candidate {
            is_stop_word: is_stop_word(&text),
            elo_score: (max_rating_for_target - min_rating) / rating_span,
            obs_score: total_obs as f64 / max_total_obs as f64,
            rel_strength: max_rating_for_target - 1000.0,
            composition_id,
            text,
            total_obs,
            max_rating: max_rating_for_target,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: u8, text: &str, obs: u64, rating: f64) -> RawEdge {
        RawEdge { composition_id: [id; 32], text: text.to_string(), observations: obs, rating }
    }

    #[test]
    fn aggregates_sum_observations_and_take_max_rating() {
        let raw = vec![edge(1, "cat", 2, 1000.0), edge(1, "cat", 3, 1400.0)];
        let candidates = prepare_candidates(raw);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].total_obs, 5);
        assert_eq!(candidates[0].max_rating, 1400.0);
    }

    #[test]
    fn drops_artifact_tokens() {
        let raw = vec![edge(1, "[PAD]", 5, 1000.0), edge(2, "##ing", 5, 1000.0), edge(3, "cat", 5, 1000.0)];
        let candidates = prepare_candidates(raw);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "cat");
    }

    #[test]
    fn flags_stop_words() {
        let raw = vec![edge(1, "the", 1, 1000.0), edge(2, "cat", 1, 1000.0)];
        let candidates = prepare_candidates(raw);
        let the = candidates.iter().find(|c| c.text == "the").unwrap();
        let cat = candidates.iter().find(|c| c.text == "cat").unwrap();
        assert!(the.is_stop_word);
        assert!(!cat.is_stop_word);
    }

    #[test]
    fn empty_input_yields_empty_candidates() {
        assert!(prepare_candidates(Vec::new()).is_empty());
    }
}
