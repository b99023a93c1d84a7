use sha2::{Digest as _, Sha256};
use ssot_types::Digest;

use crate::canonical::{canonical_json, CanonicalError};

/// SHA-256 content hasher.
///
/// Leaf hashes are taken over the canonical JSON encoding of a value, so the
/// same field values hash identically on every run and platform. Interior
/// Merkle nodes hash the concatenated hex renderings of their children.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes.
    pub fn hash(data: &[u8]) -> Digest {
        Digest::from_hash(Sha256::digest(data).into())
    }

    /// Hash a JSON value in canonical form.
    pub fn hash_value(value: &serde_json::Value) -> Result<Digest, HasherError> {
        let encoded = canonical_json(value)?;
        Ok(Self::hash(encoded.as_bytes()))
    }

    /// Hash two sibling nodes: `SHA-256(hex(left) ++ hex(right))`.
    pub fn hash_pair(left: &Digest, right: &Digest) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(hex::encode(left.as_bytes()));
        hasher.update(hex::encode(right.as_bytes()));
        Digest::from_hash(hasher.finalize().into())
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("canonical encoding error: {0}")]
    Canonical(#[from] CanonicalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(ContentHasher::hash(b"hello"), ContentHasher::hash(b"hello"));
        assert_ne!(ContentHasher::hash(b"hello"), ContentHasher::hash(b"hellp"));
    }

    #[test]
    fn matches_known_sha256_vector() {
        assert_eq!(
            ContentHasher::hash(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn canonical_hash_ignores_key_order() {
        let a: serde_json::Value = serde_json::from_str(r#"{"x":1,"y":"two"}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"y":"two","x":1}"#).unwrap();
        assert_eq!(
            ContentHasher::hash_value(&a).unwrap(),
            ContentHasher::hash_value(&b).unwrap()
        );
    }

    #[test]
    fn canonical_hash_is_sha256_of_encoding() {
        let value = serde_json::json!({"b": true, "a": null});
        let expected = ContentHasher::hash(br#"{"a":null,"b":true}"#);
        assert_eq!(ContentHasher::hash_value(&value).unwrap(), expected);
    }

    #[test]
    fn float_values_are_rejected() {
        let err = ContentHasher::hash_value(&serde_json::json!({"ratio": 0.25})).unwrap_err();
        assert!(matches!(err, HasherError::Canonical(_)));
    }

    #[test]
    fn pair_hash_concatenates_hex_strings() {
        let left = ContentHasher::hash(b"left");
        let right = ContentHasher::hash(b"right");
        let expected =
            ContentHasher::hash(format!("{}{}", left.to_hex(), right.to_hex()).as_bytes());
        assert_eq!(ContentHasher::hash_pair(&left, &right), expected);
        assert_ne!(
            ContentHasher::hash_pair(&left, &right),
            ContentHasher::hash_pair(&right, &left)
        );
    }
}
