//! Foundation types for the SSOT binder.
//!
//! Every other SSOT crate depends on `ssot-types`.
//!
//! # Key Types
//!
//! - [`Digest`]: SHA-256 value, rendered as lowercase hex on every boundary
//! - [`EntryType`]: the closed set of artifact kinds a registry entry may describe

pub mod digest;
pub mod entry_type;
pub mod error;

pub use digest::Digest;
pub use entry_type::EntryType;
pub use error::TypeError;
