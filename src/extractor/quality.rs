//! Layer quality scoring and per-kind ELO/threshold policy.

use ndarray::{Array2, ArrayView1};

/// The semantic source a projected matrix came from. Each kind carries its
/// own quality threshold and ELO assignment rule (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Embedding,
    Attention,
    Ffn,
}

impl LayerKind {
    /// Label used in metrics/span fields.
    pub fn as_str(self) -> &'static str {
        match self {
            LayerKind::Embedding => "embedding",
            LayerKind::Attention => "attention",
            LayerKind::Ffn => "ffn",
        }
    }

    /// Quality floor below which a layer is treated as collapsed/noise and
    /// skipped outright. Embedding layers have no floor of their own; they're
    /// gated only by the similarity threshold applied during extraction.
    pub fn quality_floor(self) -> f32 {
        match self {
            LayerKind::Embedding => 0.0,
            LayerKind::Attention => 0.05,
            LayerKind::Ffn => 0.10,
        }
    }

    /// The similarity threshold above which a pair is accepted as an edge.
    /// FFN activations (post-ReLU) are inherently high-similarity, so its
    /// floor is raised regardless of the configured threshold.
    pub fn edge_threshold(self, configured: f32) -> f32 {
        match self {
            LayerKind::Embedding | LayerKind::Attention => configured,
            LayerKind::Ffn => configured.max(0.70),
        }
    }

    /// ELO assigned to a freshly accepted edge of this kind, given its
    /// similarity and the threshold that admitted it.
    pub fn elo_for_similarity(self, similarity: f32, threshold: f32) -> f64 {
        match self {
            LayerKind::Embedding => {
                let sim = similarity.clamp(threshold, 1.0) as f64;
                800.0 + (2000.0 - 800.0) * sim
            }
            LayerKind::Attention | LayerKind::Ffn => {
                let elo_range = 1000.0;
                let base = 1000.0 - elo_range * threshold as f64;
                let denom = (1.0 - threshold as f64).max(1e-6);
                base + (1000.0 / denom) * similarity as f64
            }
        }
    }
}

/// Mean, over up to `sample_size` rows, of each sampled row's maximum cosine
/// similarity against a strided sample of the other rows. A matrix whose
/// rows are nearly orthogonal scores near 0; a collapsed matrix (every row
/// pointing the same direction) scores near 1.
///
/// `matrix` is assumed already row-normalized; rows of zero norm contribute
/// a similarity of 0 against everything.
pub fn score_layer_quality(matrix: &Array2<f32>, sample_size: usize) -> f32 {
    let n = matrix.nrows();
    if n == 0 {
        return 0.0;
    }
    let sample_count = sample_size.min(n);
    let stride = (n / sample_count).max(1);
    let sample: Vec<usize> = (0..n).step_by(stride).take(sample_count).collect();

    let mut total = 0.0f32;
    for &i in &sample {
        let row = matrix.row(i);
        let best = sample
            .iter()
            .filter(|&&j| j != i)
            .map(|&j| cosine(row, matrix.row(j)))
            .fold(0.0f32, f32::max);
        total += best;
    }
    total / sample.len() as f32
}

/// Row-normalize in place: `row /= ‖row‖`. Zero rows are left as-is.
pub fn row_normalize(matrix: &mut Array2<f32>) {
    for mut row in matrix.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 1e-12 {
            row.mapv_inplace(|x| x / norm);
        }
    }
}

/// Apply ReLU in place (used before normalizing FFN activations).
pub fn relu_inplace(matrix: &mut Array2<f32>) {
    matrix.mapv_inplace(|x| x.max(0.0));
}

fn cosine(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    let dot = a.dot(&b);
    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();
    if norm_a < 1e-12 || norm_b < 1e-12 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn identical_rows_score_near_one() {
        let matrix = Array2::from_shape_fn((20, 4), |(_, j)| if j == 0 { 1.0 } else { 0.0 });
        let score = score_layer_quality(&matrix, 16);
        assert!(score > 0.99, "expected collapsed matrix to score near 1, got {score}");
    }

    #[test]
    fn orthogonal_rows_score_near_zero() {
        let mut matrix = Array2::<f32>::zeros((4, 4));
        for i in 0..4 {
            matrix[[i, i]] = 1.0;
        }
        let score = score_layer_quality(&matrix, 4);
        assert!(score < 1e-6, "expected orthogonal rows to score near 0, got {score}");
    }

    #[test]
    fn embedding_elo_is_linear_in_similarity() {
        let low = LayerKind::Embedding.elo_for_similarity(0.5, 0.5);
        let high = LayerKind::Embedding.elo_for_similarity(0.9, 0.5);
        assert!(high > low);
        assert!(low >= 800.0 && high <= 2000.0);
    }

    #[test]
    fn ffn_threshold_is_floored_at_0_70() {
        assert_eq!(LayerKind::Ffn.edge_threshold(0.3), 0.70);
        assert_eq!(LayerKind::Ffn.edge_threshold(0.9), 0.9);
    }

    #[test]
    fn row_normalize_yields_unit_rows() {
        let mut matrix = array![[3.0f32, 4.0], [0.0, 0.0]];
        row_normalize(&mut matrix);
        assert!((matrix.row(0).dot(&matrix.row(0)) - 1.0).abs() < 1e-6);
        assert_eq!(matrix.row(1)[0], 0.0);
    }
}
