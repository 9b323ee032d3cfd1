// src/dag/mod.rs

//! Dependency graph and incremental scheduling.
//!
//! - [`node`] defines the node identifier shared by every layer.
//! - [`graph`] holds the dependency graph and its persisted form.
//! - [`analyzer`] decides, one step at a time, which node to build next,
//!   skipping nodes unchanged since the previous run.

pub mod analyzer;
pub mod graph;
pub mod node;

pub use analyzer::{Analyzer, Signal};
pub use graph::{DepGraph, PersistedGraph, PersistedNode};
pub use node::NodeId;
