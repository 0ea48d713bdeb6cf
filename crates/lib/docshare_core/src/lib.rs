//! # docshare_core
//!
//! Core domain logic for Docshare: session credentials, role policy,
//! identity and file registries, and the object storage indirection layer.

pub mod auth;
pub mod files;
pub mod migrate;
pub mod models;
pub mod storage;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
