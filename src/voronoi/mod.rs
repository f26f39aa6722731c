//! Voronoi / gap analysis (§4.8): Monte-Carlo cell sampling on S³ to
//! approximate a composition's Voronoi volume, boundary distance, and
//! eccentricity, plus polysemy ranking by centroid spread.

use crate::geometry::{geodesic, sample_near, S3Point};
use crate::hash::Hash32;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A neighboring composition's centroid, fetched from the spatial index.
#[derive(Debug, Clone, Copy)]
pub struct NeighborhoodEntry {
    pub composition_id: Hash32,
    pub centroid: S3Point,
}

#[derive(Debug, Clone)]
pub struct VoronoiResult {
    pub approximate_volume: f64,
    pub average_boundary_distance: f64,
    /// `1 - lambda_min / lambda_max` of the scatter matrix of owned
    /// offsets. `None` when fewer than 11 samples were owned (too few to
    /// estimate shape).
    pub eccentricity: Option<f64>,
    /// Boundary neighbors ranked by fraction of lost samples attributed to
    /// them, descending, truncated to `max_neighbors`.
    pub boundary_neighbors: Vec<(Hash32, f64)>,
}

/// Converts an angular radius (geodesic, on S³) to the Euclidean chord
/// bound that a Euclidean spatial index can filter on:
/// `2 * sin(min(radius, pi) / 2)`.
pub fn euclidean_radius_bound(radius: f64) -> f64 {
    2.0 * (radius.min(std::f64::consts::PI) / 2.0).sin()
}

/// Monte-Carlo sample `n_samples` points near `center` (the composition
/// `c`'s centroid `mu`), classify each by nearest neighborhood centroid,
/// and summarize volume/boundary/eccentricity/ranked neighbors.
///
/// `seed` should be derived from a stable hash of the composition's text so
/// repeated analysis of the same composition is reproducible.
pub fn analyze(
    composition_id: Hash32,
    center: S3Point,
    radius: f64,
    neighborhood: &[NeighborhoodEntry],
    n_samples: usize,
    max_neighbors: usize,
    seed: u64,
) -> VoronoiResult {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut owned = 0usize;
    let mut boundary_distances = Vec::new();
    let mut lost_counts: std::collections::HashMap<Hash32, u64> = std::collections::HashMap::new();
    let mut owned_offsets: Vec<S3Point> = Vec::new();

    for _ in 0..n_samples {
        let sample = sample_near(&center, radius, &mut rng);
        let nearest = nearest_of(composition_id, &center, &sample, neighborhood);
        match nearest {
            None => {
                owned += 1;
                owned_offsets.push(tangent_offset(&center, &sample));
            }
            Some(winner) => {
                let dist = geodesic(&sample, &neighborhood.iter().find(|n| n.composition_id == winner).map(|n| n.centroid).unwrap_or(center));
                boundary_distances.push(dist);
                *lost_counts.entry(winner).or_insert(0) += 1;
            }
        }
    }

    let approximate_volume = owned as f64 / n_samples.max(1) as f64;
    let average_boundary_distance = if boundary_distances.is_empty() {
        0.0
    } else {
        boundary_distances.iter().sum::<f64>() / boundary_distances.len() as f64
    };
    let eccentricity = if owned > 10 { Some(scatter_eccentricity(&owned_offsets)) } else { None };

    let total_lost: u64 = lost_counts.values().sum();
    let mut ranked: Vec<(Hash32, f64)> = lost_counts
        .into_iter()
        .map(|(id, count)| (id, if total_lost > 0 { count as f64 / total_lost as f64 } else { 0.0 }))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(max_neighbors);

    VoronoiResult { approximate_volume, average_boundary_distance, eccentricity, boundary_neighbors: ranked }
}

/// Returns `None` if `composition_id`'s own centroid is the nearest to
/// `sample`; otherwise the winning neighbor's id.
fn nearest_of(composition_id: Hash32, own_centroid: &S3Point, sample: &S3Point, neighborhood: &[NeighborhoodEntry]) -> Option<Hash32> {
    let mut best_id = composition_id;
    let mut best_dist = geodesic(sample, own_centroid);
    for entry in neighborhood {
        let d = geodesic(sample, &entry.centroid);
        if d < best_dist {
            best_dist = d;
            best_id = entry.composition_id;
        }
    }
    if best_id == composition_id {
        None
    } else {
        Some(best_id)
    }
}

fn tangent_offset(center: &S3Point, sample: &S3Point) -> S3Point {
    let dot: f64 = center.iter().zip(sample.iter()).map(|(c, s)| c * s).sum();
    let mut offset = [0.0; 4];
    for i in 0..4 {
        offset[i] = sample[i] - dot * center[i];
    }
    offset
}

/// `1 - lambda_min / lambda_max` of the 4x4 scatter (covariance) matrix of
/// `offsets`, via a Jacobi eigenvalue sweep (exact for small symmetric
/// matrices, no external linear-algebra dependency needed).
fn scatter_eccentricity(offsets: &[S3Point]) -> f64 {
    let n = offsets.len() as f64;
    let mut scatter = [[0.0; 4]; 4];
    for offset in offsets {
        for i in 0..4 {
            for j in 0..4 {
                scatter[i][j] += offset[i] * offset[j];
            }
        }
    }
    for row in scatter.iter_mut() {
        for v in row.iter_mut() {
            *v /= n;
        }
    }

    let eigenvalues = jacobi_eigenvalues(scatter);
    let lambda_max = eigenvalues.iter().cloned().fold(f64::MIN, f64::max);
    let lambda_min = eigenvalues.iter().cloned().fold(f64::MAX, f64::min);
    if lambda_max.abs() < 1e-12 {
        0.0
    } else {
        1.0 - lambda_min / lambda_max
    }
}

/// Classic cyclic Jacobi eigenvalue algorithm for a small symmetric matrix.
/// Converges in a handful of sweeps; capped at 50 to guarantee termination.
fn jacobi_eigenvalues(mut a: [[f64; 4]; 4]) -> [f64; 4] {
    for _ in 0..50 {
        let (mut p, mut q, mut max_off) = (0, 1, 0.0f64);
        for i in 0..4 {
            for j in (i + 1)..4 {
                if a[i][j].abs() > max_off {
                    max_off = a[i][j].abs();
                    p = i;
                    q = j;
                }
            }
        }
        if max_off < 1e-12 {
            break;
        }
        let theta = if (a[p][p] - a[q][q]).abs() < 1e-15 {
            std::f64::consts::FRAC_PI_4
        } else {
            0.5 * (2.0 * a[p][q] / (a[p][p] - a[q][q])).atan()
        };
        let (c, s) = (theta.cos(), theta.sin());
        let mut rotated = a;
        for k in 0..4 {
            rotated[p][k] = c * a[p][k] + s * a[q][k];
            rotated[q][k] = -s * a[p][k] + c * a[q][k];
        }
        let before_rows = rotated;
        for k in 0..4 {
            rotated[k][p] = c * before_rows[k][p] + s * before_rows[k][q];
            rotated[k][q] = -s * before_rows[k][p] + c * before_rows[k][q];
        }
        a = rotated;
    }
    [a[0][0], a[1][1], a[2][2], a[3][3]]
}

/// "Find polysemous concepts": among compositions with at least two model
/// projections, rank by centroid spread (mean pairwise geodesic distance);
/// return the top `top_n` above `min_spread`.
pub fn polysemy_rank(projections: &[(Hash32, Vec<S3Point>)], top_n: usize, min_spread: f64) -> Vec<(Hash32, f64)> {
    let mut scored: Vec<(Hash32, f64)> = projections
        .iter()
        .filter(|(_, positions)| positions.len() >= 2)
        .map(|(id, positions)| (*id, mean_pairwise_geodesic(positions)))
        .filter(|(_, spread)| *spread > min_spread)
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_n);
    scored
}

fn mean_pairwise_geodesic(positions: &[S3Point]) -> f64 {
    let mut total = 0.0;
    let mut count = 0u64;
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            total += geodesic(&positions[i], &positions[j]);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_radius_bound_of_pi_is_two() {
        assert!((euclidean_radius_bound(std::f64::consts::PI) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn analyze_with_no_neighbors_owns_every_sample() {
        let result = analyze([1u8; 32], [1.0, 0.0, 0.0, 0.0], 0.3, &[], 200, 5, 42);
        assert_eq!(result.approximate_volume, 1.0);
        assert!(result.boundary_neighbors.is_empty());
    }

    #[test]
    fn analyze_is_reproducible_for_a_fixed_seed() {
        let neighborhood = vec![NeighborhoodEntry { composition_id: [2u8; 32], centroid: [0.0, 1.0, 0.0, 0.0] }];
        let a = analyze([1u8; 32], [1.0, 0.0, 0.0, 0.0], 1.0, &neighborhood, 100, 5, 7);
        let b = analyze([1u8; 32], [1.0, 0.0, 0.0, 0.0], 1.0, &neighborhood, 100, 5, 7);
        assert_eq!(a.approximate_volume, b.approximate_volume);
    }

    #[test]
    fn polysemy_rank_excludes_single_projection_compositions() {
        let projections = vec![([1u8; 32], vec![[1.0, 0.0, 0.0, 0.0]])];
        assert!(polysemy_rank(&projections, 10, 0.0).is_empty());
    }

    #[test]
    fn polysemy_rank_ranks_by_spread_descending() {
        let projections = vec![
            ([1u8; 32], vec![[1.0, 0.0, 0.0, 0.0], [0.99, 0.01, 0.0, 0.0]]),
            ([2u8; 32], vec![[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]]),
        ];
        let ranked = polysemy_rank(&projections, 10, 0.0);
        assert_eq!(ranked[0].0, [2u8; 32]);
    }
}
