//! Cryptographic primitives for the SSOT binder.
//!
//! Provides a canonical JSON encoding, SHA-256 content hashing over that
//! encoding, and binary Merkle trees with inclusion proofs.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod canonical;
pub mod hasher;
pub mod merkle;

pub use canonical::{canonical_json, CanonicalError};
pub use hasher::{ContentHasher, HasherError};
pub use merkle::{MerkleProof, MerkleTree, Side};
