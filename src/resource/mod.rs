// src/resource/mod.rs

//! Resources and change detection.
//!
//! - [`provider`] exposes the files under the content root as resources
//!   addressed by [`NodeId`](crate::dag::NodeId).
//! - [`fingerprint`] decides whether a resource's content changed since the
//!   last successful run, by comparing blake3 digests against the store.

pub mod fingerprint;
pub mod provider;

pub use fingerprint::{compute_fingerprint, FingerprintCheck, ModificationCheck};
pub use provider::{FileProvider, ResourceProvider};
