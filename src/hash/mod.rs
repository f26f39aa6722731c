//! 256-bit content hashes and the tagged derivation used for every entity id.
//!
//! All ids are `H(tag, payload) = BLAKE3(tag || payload)`. The single leading
//! tag byte partitions the id namespace so that, e.g., an atom and a
//! composition can never collide even if their canonical payloads happen to
//! coincide byte-for-byte.

use crate::error::{Result, SubstrateError};
use std::fmt;

/// A 256-bit digest used for every entity id in the substrate.
pub type Hash32 = [u8; 32];

/// Domain-separation tag, one leading byte per entity kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Tag {
    Atom,
    Physicality,
    Composition,
    CompositionSequence,
    Relation,
    RelationSequence,
}

impl Tag {
    #[inline]
    pub fn byte(self) -> u8 {
        match self {
            Tag::Atom => b'A',
            Tag::Physicality => b'P',
            Tag::Composition => b'C',
            Tag::CompositionSequence => b'S',
            Tag::Relation => b'R',
            Tag::RelationSequence => b'T',
        }
    }
}

/// `H(tag, payload) = BLAKE3(tag || payload)`.
pub fn tagged_hash(tag: Tag, payload: &[u8]) -> Hash32 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[tag.byte()]);
    hasher.update(payload);
    *hasher.finalize().as_bytes()
}

/// Hash several payload chunks as if concatenated, under one tag. Used for
/// ids derived from more than one field (e.g. a relation's ordered
/// composition pair).
pub fn tagged_hash_many<'a, I>(tag: Tag, parts: I) -> Hash32
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[tag.byte()]);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Lowercase 64-char hex encoding.
pub fn to_hex(hash: &Hash32) -> String {
    hex::encode(hash)
}

/// Total on any 64-char lowercase-hex string; fails otherwise.
pub fn from_hex(s: &str) -> Result<Hash32> {
    if s.len() != 64 {
        return Err(SubstrateError::InvalidInput(format!(
            "hash hex must be 64 chars, got {}",
            s.len()
        )));
    }
    let bytes = hex::decode(s)
        .map_err(|e| SubstrateError::InvalidInput(format!("invalid hex: {e}")))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Truncates to the first 16 bytes, standard dashed layout.
pub fn to_uuid(hash: &Hash32) -> uuid::Uuid {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);
    uuid::Uuid::from_bytes(bytes)
}

/// Byte-lexicographic comparison used to canonicalize ordered pairs (e.g. a
/// relation's two composition ids).
pub fn byte_lex_sort(a: Hash32, b: Hash32) -> (Hash32, Hash32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Thin wrapper so hashes can be used as map keys / logged without repeating
/// `to_hex` everywhere.
#[derive(Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct HashId(pub Hash32);

impl HashId {
    pub fn new(tag: Tag, payload: &[u8]) -> Self {
        Self(tagged_hash(tag, payload))
    }
}

impl fmt::Debug for HashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashId({})", to_hex(&self.0))
    }
}

impl fmt::Display for HashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_hex(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let input = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let h = from_hex(input).unwrap();
        assert_eq!(to_hex(&h), input);
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(from_hex("abcd").is_err());
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let bad = "z".repeat(64);
        assert!(from_hex(&bad).is_err());
    }

    #[test]
    fn tag_byte_separates_domains() {
        let a = tagged_hash(Tag::Atom, b"x");
        let c = tagged_hash(Tag::Composition, b"x");
        assert_ne!(a, c);
    }

    #[test]
    fn tagged_hash_many_matches_concatenation() {
        let parts = [b"ab" as &[u8], b"cd"];
        let many = tagged_hash_many(Tag::Relation, parts.iter().copied());
        let direct = tagged_hash(Tag::Relation, b"abcd");
        assert_eq!(many, direct);
    }

    #[test]
    fn byte_lex_sort_is_order_independent() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(byte_lex_sort(a, b), byte_lex_sort(b, a));
    }

    #[test]
    fn to_uuid_uses_first_sixteen_bytes() {
        let mut h = [0u8; 32];
        for (i, b) in h.iter_mut().enumerate() {
            *b = i as u8;
        }
        let u = to_uuid(&h);
        assert_eq!(&u.as_bytes()[..], &h[..16]);
    }
}
