//! The SSOT binder: the single authority over the provenance registry.
//!
//! This crate provides:
//! - `RegistryEntry` and its nested records, built by an explicit validator
//!   that reports every field-level problem instead of failing fast
//! - Deterministic leaf hashes over a canonical encoding that excludes notes
//! - `SsotBinder`: sorted entries, O(1) lookup, Merkle root, and a
//!   side-effect-free candidate preview
//! - Loading from a JSON envelope and a swappable `BinderHandle`

pub mod binder;
pub mod entry;
pub mod envelope;
pub mod error;
pub mod loader;
mod fields;

pub use binder::{
    BinderSnapshot, CandidateOutcome, CandidateRejection, EntryProof, EntrySnapshot, SsotBinder,
};
pub use entry::{CouncilAttestation, Lineage, RegistryEntry, ReplayRules};
pub use envelope::{RegistryContext, RegistryEnvelope};
pub use error::{FieldIssue, IssueKind, LoadError};
pub use loader::{load_binder, save_envelope, BinderHandle, DEFAULT_REGISTRY_PATH};
pub use ssot_types::{Digest, EntryType};
