//! The entity types of the semantic substrate: content-addressed atoms,
//! compositions, relations, and the evidence trail that backs each
//! relation's ELO rating.

use crate::geometry::S3Point;
use crate::hash::Hash32;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The minimum semantic unit: a Unicode codepoint projected to S³. Created
/// once during Unicode seeding; immutable; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    pub id: Hash32,
    pub codepoint: u32,
    pub s3_position: S3Point,
    pub hilbert_index: u128,
}

/// A point (and optionally a trajectory) on S³ shared by every composition
/// or relation centered there. Deduplicated by hash; immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Physicality {
    pub id: Hash32,
    pub centroid: S3Point,
    pub hilbert_index: u128,
    pub trajectory: Option<Vec<S3Point>>,
}

/// One run of repeated atoms inside a composition's run-length encoding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AtomRun {
    pub atom_id: Hash32,
    pub run_length: u32,
}

/// An ordered run-length-encoded sequence of atoms: a token, word, or
/// phrase. Immutable; deduplicated by sequence hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composition {
    pub id: Hash32,
    pub physicality_id: Hash32,
    pub atoms: Vec<AtomRun>,
}

/// An unordered pair of compositions with an ELO rating and evidence.
/// Identity is immutable once created; the rating mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: Hash32,
    pub physicality_id: Hash32,
    /// Canonical order: byte-lex sort of the two composition ids.
    pub composition_lo: Hash32,
    pub composition_hi: Hash32,
}

/// One side of a relation's composition pair, with an ordinal distinguishing
/// the two (0 = lo, 1 = hi) and an observation-weighted occurrence count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationSequence {
    pub relation_id: Hash32,
    pub composition_id: Hash32,
    pub ordinal: u8,
    pub occurrences: u64,
}

/// A relation's mutable confidence state. One row per relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationRating {
    pub relation_id: Hash32,
    pub elo: f64,
    pub observations: u64,
    pub k_factor: f64,
    pub modified_at: DateTime<Utc>,
}

impl RelationRating {
    /// Apply an ELO delta scaled by `k_factor`, bumping the observation
    /// count. `rating.observations` must remain `>=` the count of evidence
    /// rows for this relation; callers append the evidence row first.
    pub fn apply_delta(&mut self, delta: f64, now: DateTime<Utc>) {
        self.elo += self.k_factor * delta;
        self.observations += 1;
        self.modified_at = now;
    }
}

/// An append-only record of an observation from a model or text corpus that
/// supports or contradicts a relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEvidence {
    pub id: Hash32,
    pub source_content_id: Uuid,
    pub relation_id: Hash32,
    pub is_positive: bool,
    pub strength: f64,
    pub weight: f64,
    pub validated_at: DateTime<Utc>,
}

/// A single ingested artifact (a document, a model checkpoint, a reasoning
/// query) that evidence rows point back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub content_type: String,
    pub size: u64,
    pub mime: Option<String>,
    pub source_uri: Option<String>,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Content {
    pub fn new(content_type: impl Into<String>, size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: None,
            user_id: None,
            content_type: content_type.into(),
            size,
            mime: None,
            source_uri: None,
            language: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_rating_delta_is_monotone_on_observations() {
        let mut rating = RelationRating {
            relation_id: [0u8; 32],
            elo: 1000.0,
            observations: 5,
            k_factor: 32.0,
            modified_at: Utc::now(),
        };
        rating.apply_delta(0.5, Utc::now());
        assert_eq!(rating.observations, 6);
        assert!(rating.elo > 1000.0);
    }

    #[test]
    fn content_new_stamps_a_fresh_id() {
        let a = Content::new("query", 0);
        let b = Content::new("query", 0);
        assert_ne!(a.id, b.id);
    }
}
