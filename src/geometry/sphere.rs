//! Pure, stateless arithmetic on the 3-sphere S³ ⊂ ℝ⁴.

use rand::Rng;
use std::f64::consts::TAU;

/// A point on S³: a unit vector in ℝ⁴.
pub type S3Point = [f64; 4];

const UNIT_TOLERANCE: f64 = 1e-9;

#[inline]
fn dot(a: &S3Point, b: &S3Point) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

#[inline]
fn norm(p: &S3Point) -> f64 {
    dot(p, p).sqrt()
}

/// `true` iff `‖p‖ = 1` within `1e-9`.
pub fn is_unit(p: &S3Point) -> bool {
    (norm(p) - 1.0).abs() < UNIT_TOLERANCE
}

fn scale(p: &S3Point, s: f64) -> S3Point {
    [p[0] * s, p[1] * s, p[2] * s, p[3] * s]
}

fn add(a: &S3Point, b: &S3Point) -> S3Point {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]]
}

fn sub(a: &S3Point, b: &S3Point) -> S3Point {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2], a[3] - b[3]]
}

/// Normalize a vector to unit length. Panics only on a zero vector; callers
/// that may hit that case (e.g. `centroid`) special-case it first.
pub fn normalize(p: S3Point) -> S3Point {
    let n = norm(&p);
    scale(&p, 1.0 / n)
}

/// `acos(clamp(a·b, -1, 1))`, the great-circle arc length between two unit
/// vectors. Returns a value in `[0, π]`.
pub fn geodesic(a: &S3Point, b: &S3Point) -> f64 {
    dot(a, b).clamp(-1.0, 1.0).acos()
}

/// `normalize(mean(points))`; returns `(1,0,0,0)` if the mean has near-zero
/// norm (antipodal points cancelling out).
pub fn centroid(points: &[S3Point]) -> S3Point {
    if points.is_empty() {
        return [1.0, 0.0, 0.0, 0.0];
    }
    let sum = points.iter().fold([0.0; 4], |acc, p| add(&acc, p));
    let mean = scale(&sum, 1.0 / points.len() as f64);
    if norm(&mean) < 1e-10 {
        return [1.0, 0.0, 0.0, 0.0];
    }
    normalize(mean)
}

/// Gaussian-sample a tangent vector at `center`, project onto the tangent
/// plane, normalize, then rotate `center` towards it by an angle drawn
/// uniformly from `[0, radius]`. Returns a unit vector. `sample_near(c, 0,
/// _) == c`.
pub fn sample_near<R: Rng + ?Sized>(center: &S3Point, radius: f64, rng: &mut R) -> S3Point {
    if radius <= 0.0 {
        return *center;
    }
    let raw: S3Point = [
        sample_standard_normal(rng),
        sample_standard_normal(rng),
        sample_standard_normal(rng),
        sample_standard_normal(rng),
    ];
    let tangent = sub(&raw, &scale(center, dot(&raw, center)));
    let tangent_norm = norm(&tangent);
    let tangent = if tangent_norm < 1e-12 {
        // Degenerate draw (raw parallel to center); fall back to a fixed
        // orthogonal direction.
        orthogonal_fallback(center)
    } else {
        scale(&tangent, 1.0 / tangent_norm)
    };
    let theta = rng.gen_range(0.0..radius);
    add(&scale(center, theta.cos()), &scale(&tangent, theta.sin()))
}

/// Box-Muller standard normal sample. `rand_distr` is overkill for the one
/// distribution this module needs.
fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

fn orthogonal_fallback(center: &S3Point) -> S3Point {
    // Any vector not parallel to `center` works; e1 fails only if center is
    // itself e1, in which case e2 is used.
    let e1 = [1.0, 0.0, 0.0, 0.0];
    let candidate = if dot(center, &e1).abs() > 0.999 {
        [0.0, 1.0, 0.0, 0.0]
    } else {
        e1
    };
    let tangent = sub(&candidate, &scale(center, dot(&candidate, center)));
    normalize(tangent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const W: S3Point = [1.0, 0.0, 0.0, 0.0];
    const X: S3Point = [0.0, 1.0, 0.0, 0.0];

    #[test]
    fn geodesic_self_is_zero() {
        assert!(geodesic(&W, &W).abs() < 1e-12);
    }

    #[test]
    fn geodesic_antipodal_is_pi() {
        let neg_w = [-1.0, 0.0, 0.0, 0.0];
        assert!((geodesic(&W, &neg_w) - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn geodesic_orthogonal_is_half_pi() {
        assert!((geodesic(&W, &X) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn centroid_of_single_point_is_itself() {
        assert_eq!(centroid(&[W]), W);
    }

    #[test]
    fn centroid_of_antipodal_pair_falls_back() {
        let neg_w = [-1.0, 0.0, 0.0, 0.0];
        assert_eq!(centroid(&[W, neg_w]), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn sample_near_zero_radius_is_identity() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(sample_near(&W, 0.0, &mut rng), W);
    }

    #[test]
    fn sample_near_returns_unit_vector() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let p = sample_near(&X, 0.5, &mut rng);
            assert!(is_unit(&p), "sample left the sphere: {p:?}");
        }
    }

    #[test]
    fn sample_near_stays_within_radius() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let p = sample_near(&W, 0.3, &mut rng);
            assert!(geodesic(&W, &p) <= 0.3 + 1e-9);
        }
    }
}
