//! Observe phase: extract content words from the prompt and recent turns,
//! then resolve each to a known composition via the caller's lookup.

use crate::geometry::S3Point;
use crate::hash::Hash32;
use crate::walk::candidates::is_stop_word;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone)]
pub struct Seed {
    pub composition_id: Hash32,
    pub position: S3Point,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Observation {
    pub content_words: Vec<String>,
    pub seeds: Vec<Seed>,
}

/// Tokenize `prompt` plus up to the last 3 turns of `history` (most recent
/// first), keep content words (contain an alphanumeric character, not a
/// stop word), dedup case-insensitively, then resolve each via `resolve`.
/// Words the substrate has never seen are dropped from `seeds` but kept in
/// `content_words` for reporting how much of the prompt resolved at all.
pub fn observe(prompt: &str, history: &[String], resolve: impl Fn(&str) -> Option<(Hash32, S3Point)>) -> Observation {
    let mut text = prompt.to_string();
    for turn in history.iter().rev().take(3) {
        text.push(' ');
        text.push_str(turn);
    }

    let mut seen = std::collections::HashSet::new();
    let mut content_words = Vec::new();
    for word in text.unicode_words() {
        let lower = word.to_lowercase();
        if !word.chars().any(|c| c.is_alphanumeric()) || is_stop_word(&lower) {
            continue;
        }
        if seen.insert(lower.clone()) {
            content_words.push(lower);
        }
    }

    let seeds = content_words
        .iter()
        .filter_map(|w| resolve(w).map(|(composition_id, position)| Seed { composition_id, position, text: w.clone() }))
        .collect();

    Observation { content_words, seeds }
}
