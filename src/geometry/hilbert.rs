//! 4D Hilbert curve encoding: a locality-preserving map from `[0,1]⁴` to a
//! single u128, via the standard Gray-code transposition algorithm
//! generalized to 4 dimensions.

use super::sphere::S3Point;

const DIMENSIONS: usize = 4;

/// Encode a point in `[0,1]⁴` to a u128 Hilbert index at `bits` per
/// dimension (default 32, for 128 bits total). Deterministic and monotone
/// under the fixed axis order `(x, y, z, w)`.
pub fn hilbert4d_encode(p: [f64; 4], bits: u32) -> u128 {
    debug_assert!(bits * DIMENSIONS as u32 <= 128, "bit depth overflows u128");
    let scale = ((1u64 << bits) - 1) as f64;
    let mut coords: [u64; DIMENSIONS] = [0; DIMENSIONS];
    for (i, v) in p.iter().enumerate() {
        let clamped = v.clamp(0.0, 1.0);
        coords[i] = (clamped * scale).round() as u64;
    }
    transpose_to_index(coords, bits)
}

/// Convenience wrapper matching S³ points onto the same index space by
/// mapping each coordinate from `[-1,1]` into `[0,1]` first.
pub fn hilbert4d_encode_s3(p: &S3Point, bits: u32) -> u128 {
    let unit = [
        (p[0] + 1.0) / 2.0,
        (p[1] + 1.0) / 2.0,
        (p[2] + 1.0) / 2.0,
        (p[3] + 1.0) / 2.0,
    ];
    hilbert4d_encode(unit, bits)
}

/// Gray-code transposition: the standard algorithm (Hamilton/Lawder),
/// generalized beyond 2D/3D to `DIMENSIONS` axes.
fn transpose_to_index(mut coords: [u64; DIMENSIONS], bits: u32) -> u128 {
    let n = DIMENSIONS as u32;
    let m = 1u64 << (bits - 1);

    // Inverse undo
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..DIMENSIONS {
            if coords[i] & q != 0 {
                coords[0] ^= p;
            } else {
                let t = (coords[0] ^ coords[i]) & p;
                coords[0] ^= t;
                coords[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode
    for i in 1..DIMENSIONS {
        coords[i] ^= coords[i - 1];
    }
    let mut t = 0u64;
    let mut q = m;
    while q > 1 {
        if coords[DIMENSIONS - 1] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for c in coords.iter_mut() {
        *c ^= t;
    }

    // Interleave bits into the final index, most significant axis bit
    // first, cycling through axes.
    let mut index: u128 = 0;
    for bit in (0..bits).rev() {
        for axis in 0..DIMENSIONS {
            let b = (coords[axis] >> bit) & 1;
            index = (index << 1) | b as u128;
        }
    }
    let _ = n;
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_deterministic() {
        let p = [0.25, 0.5, 0.75, 0.1];
        assert_eq!(hilbert4d_encode(p, 16), hilbert4d_encode(p, 16));
    }

    #[test]
    fn encode_origin_is_zero() {
        assert_eq!(hilbert4d_encode([0.0, 0.0, 0.0, 0.0], 8), 0);
    }

    #[test]
    fn encode_is_injective_on_a_small_grid() {
        let bits = 4u32;
        let steps = 1u64 << bits;
        let mut seen = std::collections::HashSet::new();
        for x in 0..steps {
            for y in 0..steps {
                let p = [
                    x as f64 / (steps - 1) as f64,
                    y as f64 / (steps - 1) as f64,
                    0.0,
                    0.0,
                ];
                let idx = hilbert4d_encode(p, bits);
                assert!(seen.insert(idx), "collision at x={x} y={y}");
            }
        }
    }

    #[test]
    fn s3_wrapper_maps_negative_one_to_zero_coordinate() {
        let idx = hilbert4d_encode_s3(&[-1.0, -1.0, -1.0, -1.0], 8);
        assert_eq!(idx, 0);
    }
}
