//! Internal implementation modules for `lspace-core`.
//!
//! Callers should go through the re-exports in the crate root rather than
//! importing these modules directly.

pub mod config;
pub mod runtime;
pub mod space;
pub mod tooling;
