//! Unicode atom seeding.
//!
//! The codepoint → S³ projection itself is treated as an external, already
//! pure function: `project(codepoint) -> (hash, s3_point, hilbert_index)`.
//! This module provides that function plus the thin wrapper that turns its
//! output into an [`Atom`] record for the writer.

use crate::geometry::{hilbert4d_encode_s3, S3Point};
use crate::hash::{tagged_hash, Tag};
use crate::model::Atom;

/// Deterministically project a Unicode codepoint onto S³. Two halves of the
/// codepoint's hash become two angle pairs via spherical coordinates, which
/// keeps the mapping deterministic and total over all of `char`.
pub fn project(codepoint: u32) -> (crate::hash::Hash32, S3Point, u128) {
    let hash = tagged_hash(Tag::Atom, &codepoint.to_be_bytes());
    let position = hash_to_s3(&hash);
    let hilbert_index = hilbert4d_encode_s3(&position, 32);
    (hash, position, hilbert_index)
}

/// Map a 32-byte hash to a uniformly distributed point on S³ by treating
/// four u64 chunks as angle seeds (a standard technique for sampling the
/// n-sphere from uniform scalars via the Marsaglia-style transform reduced
/// to closed-form trig for n=3).
fn hash_to_s3(hash: &[u8; 32]) -> S3Point {
    let u = [
        chunk_to_unit(hash, 0),
        chunk_to_unit(hash, 8),
        chunk_to_unit(hash, 16),
        chunk_to_unit(hash, 24),
    ];
    let theta1 = u[0] * std::f64::consts::PI;
    let theta2 = u[1] * std::f64::consts::PI;
    let phi = u[2] * std::f64::consts::TAU;
    let _ = u[3]; // reserved for future higher-entropy remixing

    let w = theta1.cos();
    let x = theta1.sin() * theta2.cos();
    let y = theta1.sin() * theta2.sin() * phi.cos();
    let z = theta1.sin() * theta2.sin() * phi.sin();
    crate::geometry::normalize([w, x, y, z])
}

fn chunk_to_unit(hash: &[u8; 32], offset: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&hash[offset..offset + 8]);
    (u64::from_be_bytes(buf) as f64) / (u64::MAX as f64)
}

pub fn atom_from_codepoint(codepoint: u32) -> Atom {
    let (id, s3_position, hilbert_index) = project(codepoint);
    Atom { id, codepoint, s3_position, hilbert_index }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::is_unit;

    #[test]
    fn project_is_deterministic() {
        assert_eq!(project('a' as u32), project('a' as u32));
    }

    #[test]
    fn project_yields_unit_vector() {
        let (_, pos, _) = project('A' as u32);
        assert!(is_unit(&pos));
    }

    #[test]
    fn distinct_codepoints_usually_diverge() {
        let (id_a, pos_a, _) = project('a' as u32);
        let (id_b, pos_b, _) = project('b' as u32);
        assert_ne!(id_a, id_b);
        assert_ne!(pos_a, pos_b);
    }

    #[test]
    fn atom_from_codepoint_matches_project() {
        let atom = atom_from_codepoint(0x1F600);
        let (id, pos, hidx) = project(0x1F600);
        assert_eq!(atom.id, id);
        assert_eq!(atom.s3_position, pos);
        assert_eq!(atom.hilbert_index, hidx);
    }
}
