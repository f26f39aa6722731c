//! Blocked GEMM neighbor extraction: the core similarity search that turns a
//! row-normalized matrix into candidate edges without materializing the full
//! `n x n` similarity matrix at once.

use ndarray::Array2;
use std::cmp::Ordering;

/// One candidate edge: source row, target row, cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub source: usize,
    pub target: usize,
    pub similarity: f32,
}

/// For each row, keep the best `top_k` columns above `threshold`, scanning
/// `Q` against `K^T` (here `Q == K`, the same row-normalized matrix) in
/// blocks of `block_size` rows at a time so peak memory is `block_size * n`
/// floats rather than `n * n`.
///
/// Ties in similarity are broken by lower target index, matching a stable
/// partial sort.
pub fn blocked_neighbors(matrix: &Array2<f32>, block_size: usize, threshold: f32, top_k: usize) -> Vec<Candidate> {
    let n = matrix.nrows();
    if n == 0 || top_k == 0 {
        return Vec::new();
    }
    let block_size = block_size.max(1);
    let matrix_t = matrix.t();

    let mut edges = Vec::new();
    let mut start = 0;
    while start < n {
        let end = (start + block_size).min(n);
        let block = matrix.slice(ndarray::s![start..end, ..]);
        // One matrix product covers the whole block against every row.
        let scores = block.dot(&matrix_t);

        for (local_row, row_index) in (start..end).enumerate() {
            let mut best: Vec<(usize, f32)> = Vec::new();
            for target in 0..n {
                if target == row_index {
                    continue;
                }
                let sim = scores[[local_row, target]];
                if sim >= threshold {
                    best.push((target, sim));
                }
            }
            top_k_stable(&mut best, top_k);
            edges.extend(best.into_iter().map(|(target, similarity)| Candidate { source: row_index, target, similarity }));
        }
        start = end;
    }
    edges
}

/// Truncate `items` to its top `k` by similarity descending, ties broken by
/// lower index (stable partial sort).
fn top_k_stable(items: &mut Vec<(usize, f32)>, k: usize) {
    items.sort_by(|a, b| match b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    items.truncate(k);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn finds_self_orthogonal_basis_neighbors_above_threshold() {
        // Three vectors: two identical, one orthogonal.
        let matrix = array![[1.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let candidates = blocked_neighbors(&matrix, 2, 0.5, 5);
        let row0_targets: Vec<_> = candidates.iter().filter(|c| c.source == 0).map(|c| c.target).collect();
        assert_eq!(row0_targets, vec![1]);
    }

    #[test]
    fn top_k_limits_neighbor_count() {
        let n = 10;
        let matrix = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { 1.0 } else { i as f32 * 0.0001 });
        let candidates = blocked_neighbors(&matrix, 4, 0.0, 2);
        let row0_count = candidates.iter().filter(|c| c.source == 0).count();
        assert!(row0_count <= 2);
    }

    #[test]
    fn ties_break_by_lower_target_index() {
        let matrix = array![[1.0f32, 0.0], [1.0, 0.0], [1.0, 0.0]];
        let candidates = blocked_neighbors(&matrix, 3, 0.5, 1);
        let row0 = candidates.iter().find(|c| c.source == 0).unwrap();
        assert_eq!(row0.target, 1);
    }

    #[test]
    fn empty_matrix_yields_no_candidates() {
        let matrix = Array2::<f32>::zeros((0, 4));
        assert!(blocked_neighbors(&matrix, 1024, 0.5, 20).is_empty());
    }
}
