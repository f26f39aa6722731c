//! Orchestrates a single layer's extraction: project (the caller's job) →
//! quality gate → blocked GEMM neighbor search → edge emission, per the
//! per-kind threshold/ELO policy in [`quality`].

use super::gemm::blocked_neighbors;
use super::quality::{relu_inplace, row_normalize, score_layer_quality, LayerKind};
use crate::config::ExtractorConfig;
use crate::geometry::{normalize, S3Point};
use crate::hash::{byte_lex_sort, tagged_hash, tagged_hash_many, Hash32, Tag};
use crate::ingest::ThreadLocalRecords;
use crate::model::{Content, Physicality, Relation, RelationEvidence, RelationRating, RelationSequence};
use crate::monitoring::{logging::spans, metrics};
use chrono::Utc;
use ndarray::Array2;

/// Default ELO learning rate for model-extracted edges. Text co-occurrence
/// uses a separate, smaller-confidence constant (`ingest::text`); model
/// extraction starts with a stronger prior because the evidence (a learned
/// weight matrix) is far less noisy than a single sentence.
const MODEL_EVIDENCE_K_FACTOR: f64 = 48.0;

/// A vocabulary row: the composition it represents and that composition's
/// physicality centroid, needed to place a freshly minted relation.
#[derive(Debug, Clone)]
pub struct VocabEntry {
    pub composition_id: Hash32,
    pub centroid: S3Point,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractStats {
    pub layer_quality: f32,
    pub skipped_low_quality: bool,
    pub edges_emitted: usize,
    pub pairs_missing_vocab: usize,
}

/// Extract edges from one already-projected layer matrix (one row per
/// vocabulary entry). FFN matrices get ReLU applied before normalization;
/// every kind gets row-normalized before scoring and search.
pub fn extract_layer(
    mut matrix: Array2<f32>,
    kind: LayerKind,
    layer_index: usize,
    vocab: &[VocabEntry],
    cfg: &ExtractorConfig,
    content: &Content,
) -> (ThreadLocalRecords, ExtractStats) {
    let kind_label = kind.as_str();
    let span = spans::extract_layer(kind_label, layer_index);
    let _guard = span.enter();

    let mut stats = ExtractStats::default();
    let mut records = ThreadLocalRecords::new();

    if matrix.nrows() == 0 {
        metrics::EXTRACTOR_LAYERS_PROCESSED.with_label_values(&[kind_label, "empty"]).inc();
        return (records, stats);
    }

    if kind == LayerKind::Ffn {
        relu_inplace(&mut matrix);
    }
    row_normalize(&mut matrix);

    let quality = score_layer_quality(&matrix, 512);
    stats.layer_quality = quality;
    metrics::EXTRACTOR_LAYER_QUALITY.with_label_values(&[kind_label]).observe(quality as f64);
    if quality < kind.quality_floor() {
        stats.skipped_low_quality = true;
        metrics::EXTRACTOR_LAYERS_PROCESSED.with_label_values(&[kind_label, "collapsed"]).inc();
        return (records, stats);
    }

    let threshold = kind.edge_threshold(cfg.embedding_similarity_threshold);
    let candidates = blocked_neighbors(&matrix, cfg.block_size, threshold, cfg.max_neighbors_per_token);
    let now = Utc::now();

    for candidate in candidates {
        let (Some(source), Some(target)) = (vocab.get(candidate.source), vocab.get(candidate.target)) else {
            stats.pairs_missing_vocab += 1;
            continue;
        };

        let (lo, hi) = byte_lex_sort(source.composition_id, target.composition_id);
        let relation_id = tagged_hash_many(Tag::Relation, [lo.as_slice(), hi.as_slice()]);

        let midpoint = normalize([
            (source.centroid[0] + target.centroid[0]) / 2.0,
            (source.centroid[1] + target.centroid[1]) / 2.0,
            (source.centroid[2] + target.centroid[2]) / 2.0,
            (source.centroid[3] + target.centroid[3]) / 2.0,
        ]);
        let physicality_id = tagged_hash(Tag::Physicality, &pack_point(&midpoint));
        let hilbert_index = crate::geometry::hilbert4d_encode_s3(&midpoint, 32);
        records.register_physicality(Physicality { id: physicality_id, centroid: midpoint, hilbert_index, trajectory: None });
        records.register_relation(Relation { id: relation_id, physicality_id, composition_lo: lo, composition_hi: hi });

        records.relation_sequences.push(RelationSequence { relation_id, composition_id: lo, ordinal: 0, occurrences: 1 });
        records.relation_sequences.push(RelationSequence { relation_id, composition_id: hi, ordinal: 1, occurrences: 1 });

        let elo = kind.elo_for_similarity(candidate.similarity, threshold);
        records.relation_ratings.push(RelationRating {
            relation_id,
            elo,
            observations: 1,
            k_factor: MODEL_EVIDENCE_K_FACTOR,
            modified_at: now,
        });

        // Suffix the evidence id with the layer index so evidence minted by
        // different layers of the same model for the same relation doesn't
        // collide under the append-only evidence table.
        let layer_index_bytes = layer_index.to_be_bytes();
        let evidence_id: Hash32 = blake3::hash(
            &[relation_id.as_slice(), &content.id.as_bytes()[..], &layer_index_bytes[..]].concat(),
        )
        .into();
        records.relation_evidence.push(RelationEvidence {
            id: evidence_id,
            source_content_id: content.id,
            relation_id,
            is_positive: true,
            strength: candidate.similarity.clamp(-1.0, 1.0) as f64,
            weight: 1.0,
            validated_at: now,
        });
        stats.edges_emitted += 1;
    }

    metrics::EXTRACTOR_LAYERS_PROCESSED.with_label_values(&[kind_label, "accepted"]).inc();
    metrics::EXTRACTOR_EDGES_EMITTED.with_label_values(&[kind_label]).inc_by(stats.edges_emitted as f64);

    (records, stats)
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
    use crate::config::ExtractorConfig;
    use ndarray::array;

    fn vocab(ids: &[u8]) -> Vec<VocabEntry> {
        ids.iter()
            .map(|&b| VocabEntry { composition_id: [b; 32], centroid: [1.0, 0.0, 0.0, 0.0] })
            .collect()
    }

    #[test]
    fn low_quality_layer_is_skipped() {
        let matrix = Array2::<f32>::zeros((8, 4)).mapv(|_: f32| 0.0);
        let mut m = matrix;
        for i in 0..8 {
            m[[i, i % 4]] = 1.0;
        }
        let content = Content::new("model", 0);
        let cfg = ExtractorConfig::default();
        let (_, stats) = extract_layer(m, LayerKind::Attention, 0, &vocab(&[1, 2, 3, 4, 5, 6, 7, 8]), &cfg, &content);
        assert!(stats.skipped_low_quality || stats.layer_quality < 0.05);
    }

    #[test]
    fn accepted_pair_emits_all_five_record_kinds() {
        let matrix = array![[1.0f32, 0.0], [1.0, 0.0], [1.0, 0.0]];
        let content = Content::new("model", 0);
        let mut cfg = ExtractorConfig::default();
        cfg.embedding_similarity_threshold = 0.1;
        let (records, stats) = extract_layer(matrix, LayerKind::Embedding, 0, &vocab(&[1, 2, 3]), &cfg, &content);
        assert!(stats.edges_emitted > 0);
        assert!(!records.relations.is_empty());
        assert!(!records.relation_sequences.is_empty());
        assert!(!records.relation_ratings.is_empty());
        assert!(!records.relation_evidence.is_empty());
    }

    #[test]
    fn out_of_range_vocab_index_is_counted_not_panicked() {
        let matrix = array![[1.0f32, 0.0], [1.0, 0.0]];
        let content = Content::new("model", 0);
        let mut cfg = ExtractorConfig::default();
        cfg.embedding_similarity_threshold = 0.1;
        let (_, stats) = extract_layer(matrix, LayerKind::Embedding, 0, &vocab(&[1]), &cfg, &content);
        assert!(stats.pairs_missing_vocab > 0);
    }
}
