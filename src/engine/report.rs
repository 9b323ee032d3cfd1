// src/engine/report.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::dag::NodeId;

/// What happened during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Nodes registered in this run, initial and generated.
    pub registered: usize,
    /// Nodes registered by generative units.
    pub generated: usize,
    /// Nodes the analyzer selected, in the order it selected them.
    pub scheduled: Vec<NodeId>,
    /// Nodes whose unit succeeded.
    pub built: BTreeSet<NodeId>,
    /// Destination files written, in write order.
    pub written: Vec<PathBuf>,
    /// Nodes whose unit failed, with the failure message.
    pub failed: BTreeMap<NodeId, String>,
    /// Nodes skipped because a dependency failed or was itself skipped.
    pub degraded: BTreeSet<NodeId>,
    /// Nodes never built because of a dependency cycle.
    pub stalled: BTreeSet<NodeId>,
    /// Cycles found among the stalled nodes.
    pub cycles: Vec<Vec<NodeId>>,
}

impl RunReport {
    /// No failures, no skipped nodes and no cycles.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.degraded.is_empty() && self.stalled.is_empty()
    }

    /// Nodes whose fingerprints must not be committed.
    pub fn unsettled(&self) -> BTreeSet<NodeId> {
        self.failed
            .keys()
            .chain(self.degraded.iter())
            .chain(self.stalled.iter())
            .cloned()
            .collect()
    }

    /// Whether `id` failed or was skipped for a failed dependency.
    pub fn is_broken(&self, id: &NodeId) -> bool {
        self.failed.contains_key(id) || self.degraded.contains(id)
    }
}
