//! bonsai-core
//!
//! Pure domain types for managed search clusters: the caller's desired
//! descriptor, the remote cluster representation, the persisted snapshot,
//! and provider configuration.
//! No async runtime dependency; this is the shared vocabulary of the
//! provisioner and whatever schema layer sits above it.

pub mod config;
pub mod error;
pub mod models;
