//! Text ingestion: tokenizes a document into word-compositions, seeds the
//! atoms backing each token, and wires adjacent tokens together as relations
//! with a single unit of text-co-occurrence evidence.

use crate::geometry::{centroid, hilbert4d_encode_s3, normalize, S3Point};
use crate::hash::{byte_lex_sort, tagged_hash, tagged_hash_many, Hash32, Tag};
use crate::model::{
    Atom, AtomRun, Composition, Content, Physicality, Relation, RelationEvidence, RelationRating,
    RelationSequence,
};
use chrono::Utc;
use unicode_segmentation::UnicodeSegmentation;

use super::seed::atom_from_codepoint;
use super::writer::ThreadLocalRecords;

/// Base ELO assigned to a relation minted from raw text co-occurrence.
/// Deliberately conservative: model-extracted edges start as high as 2000
/// (§4.5); text-only co-occurrence carries far weaker evidence per event,
/// so it starts near the middle of the ELO range and accrues rating through
/// repeated observation like any other edge.
const TEXT_COOCCURRENCE_BASE_ELO: f64 = 1000.0;
const TEXT_COOCCURRENCE_K_FACTOR: f64 = 32.0;

/// Tokenize `text`, seed every atom/composition/physicality it touches, and
/// link each adjacent pair of content-word tokens with a relation backed by
/// one evidence row. Returns the [`Content`] record for the ingested
/// artifact alongside the accumulated records, ready for
/// [`super::writer::MerkleDagWriter::flush`].
pub fn ingest_text(content_type: impl Into<String>, text: &str) -> (Content, ThreadLocalRecords) {
    let content = Content::new(content_type, text.len() as u64);
    let mut records = ThreadLocalRecords::new();

    let tokens: Vec<&str> = text
        .unicode_words()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .collect();

    let mut composition_ids: Vec<Hash32> = Vec::with_capacity(tokens.len());
    for token in &tokens {
        let (composition, physicality, atoms) = build_composition(token);
        for atom in atoms {
            records.register_atom(atom);
        }
        records.register_physicality(physicality);
        composition_ids.push(composition.id);
        records.register_composition(composition);
    }

    let now = Utc::now();
    for window in composition_ids.windows(2) {
        let (a, b) = (window[0], window[1]);
        if a == b {
            continue;
        }
        link_adjacent(&mut records, &content, a, b, now);
    }

    (content, records)
}

/// Deterministically recompute a token's composition id and centroid
/// without touching the store: composition identity is a pure function of
/// its text (via its run-length-encoded atoms), so a caller that only needs
/// to resolve "what composition does this word mean" never needs a reverse
/// text index.
pub fn resolve_text_composition(token: &str) -> (Hash32, S3Point) {
    let (composition, physicality, _) = build_composition(token);
    (composition.id, physicality.centroid)
}

/// Build a composition (and its backing physicality and atom set) for a
/// single token, run-length encoding consecutive repeated codepoints.
fn build_composition(token: &str) -> (Composition, Physicality, Vec<Atom>) {
    let mut runs: Vec<AtomRun> = Vec::new();
    let mut atoms: Vec<Atom> = Vec::new();
    let mut seen_codepoints: std::collections::HashSet<u32> = std::collections::HashSet::new();

    for ch in token.chars() {
        let codepoint = ch as u32;
        let atom = atom_from_codepoint(codepoint);
        if seen_codepoints.insert(codepoint) {
            atoms.push(atom.clone());
        }
        match runs.last_mut() {
            Some(run) if run.atom_id == atom.id => run.run_length += 1,
            _ => runs.push(AtomRun { atom_id: atom.id, run_length: 1 }),
        }
    }

    let expanded_positions: Vec<S3Point> = runs
        .iter()
        .flat_map(|run| {
            let pos = atoms.iter().find(|a| a.id == run.atom_id).expect("atom registered above").s3_position;
            std::iter::repeat(pos).take(run.run_length as usize)
        })
        .collect();
    let centroid_point = centroid(&expanded_positions);
    let hilbert_index = hilbert4d_encode_s3(&centroid_point, 32);
    let physicality_id = tagged_hash(Tag::Physicality, &pack_point(&centroid_point));

    let seq_payload: Vec<u8> = runs
        .iter()
        .flat_map(|r| {
            let mut bytes = r.atom_id.to_vec();
            bytes.extend_from_slice(&r.run_length.to_be_bytes());
            bytes
        })
        .collect();
    let sequence_hash = tagged_hash(Tag::CompositionSequence, &seq_payload);
    let composition_id = tagged_hash_many(Tag::Composition, [physicality_id.as_slice(), sequence_hash.as_slice()]);

    let physicality = Physicality { id: physicality_id, centroid: centroid_point, hilbert_index, trajectory: None };
    let composition = Composition { id: composition_id, physicality_id, atoms: runs };
    (composition, physicality, atoms)
}

/// Register a relation (and its sequence/rating/evidence rows) between two
/// adjacent compositions observed once in this document.
fn link_adjacent(
    records: &mut ThreadLocalRecords,
    content: &Content,
    comp_a: Hash32,
    comp_b: Hash32,
    now: chrono::DateTime<Utc>,
) {
    let (lo, hi) = byte_lex_sort(comp_a, comp_b);
    let relation_id = tagged_hash_many(Tag::Relation, [lo.as_slice(), hi.as_slice()]);

    // Physicality position for a text relation is unknown without the
    // compositions' own centroids in hand; callers that need geometry for
    // relations look them up via composition_lo/hi at query time, so the
    // relation physicality here is derived from the same hash, not stored
    // geometry: a deterministic stand-in centroid seeded from the relation
    // id itself, normalized onto S³.
    let relation_physicality = relation_physicality_from_id(relation_id);
    records.register_physicality(relation_physicality.clone());

    let relation = Relation { id: relation_id, physicality_id: relation_physicality.id, composition_lo: lo, composition_hi: hi };
    records.register_relation(relation);

    records.relation_sequences.push(RelationSequence { relation_id, composition_id: lo, ordinal: 0, occurrences: 1 });
    records.relation_sequences.push(RelationSequence { relation_id, composition_id: hi, ordinal: 1, occurrences: 1 });

    records.relation_ratings.push(RelationRating {
        relation_id,
        elo: TEXT_COOCCURRENCE_BASE_ELO,
        observations: 1,
        k_factor: TEXT_COOCCURRENCE_K_FACTOR,
        modified_at: now,
    });

    records.relation_evidence.push(RelationEvidence {
        id: blake3::hash(&[relation_id.as_slice(), &content.id.as_bytes()[..]].concat()).into(),
        source_content_id: content.id,
        relation_id,
        is_positive: true,
        strength: 1.0,
        weight: 1.0,
        validated_at: now,
    });
}

/// A relation has no atoms of its own to average; its physicality is a
/// deterministic point derived from the relation id, keeping every
/// relation's geometry stable and reproducible without needing the
/// compositions' positions in hand at link time.
fn relation_physicality_from_id(relation_id: Hash32) -> Physicality {
    let seed = tagged_hash(Tag::Physicality, &relation_id);
    let centroid_point = normalize(hash_to_point(&seed));
    let hilbert_index = hilbert4d_encode_s3(&centroid_point, 32);
    Physicality { id: seed, centroid: centroid_point, hilbert_index, trajectory: None }
}

fn hash_to_point(hash: &Hash32) -> S3Point {
    let mut out = [0f64; 4];
    for (i, chunk) in hash.chunks_exact(8).take(4).enumerate() {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        let u = u64::from_be_bytes(buf) as f64 / u64::MAX as f64;
        out[i] = u * 2.0 - 1.0;
    }
    out
}

fn pack_point(p: &S3Point) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, coord) in p.iter().enumerate() {
        out[i * 8..i * 8 + 8].copy_from_slice(&coord.to_be_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_text_produces_one_composition_per_distinct_token() {
        let (_, records) = ingest_text("document", "the cat sat");
        assert_eq!(records.compositions.len(), 3);
    }

    #[test]
    fn ingest_text_dedups_repeated_tokens() {
        let (_, records) = ingest_text("document", "the cat and the dog");
        // "the" appears twice but is one composition.
        let distinct: std::collections::HashSet<_> = records.compositions.iter().map(|c| c.id).collect();
        assert_eq!(distinct.len(), records.compositions.len());
        assert!(records.compositions.len() < 5);
    }

    #[test]
    fn adjacent_tokens_are_linked_by_exactly_one_relation() {
        let (_, records) = ingest_text("document", "cat sat");
        assert_eq!(records.relations.len(), 1);
        assert_eq!(records.relation_sequences.len(), 2);
        assert_eq!(records.relation_evidence.len(), 1);
    }

    #[test]
    fn single_token_document_has_no_relations() {
        let (_, records) = ingest_text("document", "hello");
        assert!(records.relations.is_empty());
        assert_eq!(records.compositions.len(), 1);
    }

    #[test]
    fn composition_physicality_centroid_is_unit() {
        let (_, records) = ingest_text("document", "hello");
        let phys = &records.physicalities[0];
        assert!((phys.centroid.iter().map(|x| x * x).sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
