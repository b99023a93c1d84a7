//! HTTP server for the SSOT binder.
//!
//! A thin JSON layer over [`ssot_binder::SsotBinder`]: it exposes the
//! registry snapshot, entry lookup, inclusion proofs, and candidate
//! validation. The binder is shared through an explicit [`BinderHandle`]
//! carried in router state.
//!
//! [`BinderHandle`]: ssot_binder::BinderHandle

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::SsotServer;
