// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::dag::NodeId;
use crate::errors::Result;

static NO_DEPENDENCIES: BTreeSet<NodeId> = BTreeSet::new();

/// Dependency graph keyed by node id.
///
/// Each registered node maps to the set of nodes it depends on. Edge targets
/// do not need an entry of their own: a dependency may be declared before
/// (or without) its unit being registered. Graphs are combined with
/// [`DepGraph::union`] and never have an existing edge set replaced.
///
/// No acyclicity is assumed; the analyzer deals with cycles while walking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepGraph {
    edges: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl DepGraph {
    /// The union identity.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a graph with exactly the given declared edges.
    pub fn from_edges<I, D>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, D)>,
        D: IntoIterator<Item = NodeId>,
    {
        let mut edges: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for (node, deps) in pairs {
            edges.entry(node).or_default().extend(deps);
        }
        Self { edges }
    }

    /// Node-wise union of both dependency maps.
    pub fn union(mut self, other: DepGraph) -> DepGraph {
        if self.edges.len() < other.edges.len() {
            return other.union(self);
        }
        for (node, deps) in other.edges {
            self.edges.entry(node).or_default().extend(deps);
        }
        self
    }

    /// Direct dependencies of `node`, empty if the node is unknown.
    pub fn dependencies_of(&self, node: &NodeId) -> &BTreeSet<NodeId> {
        self.edges.get(node).unwrap_or(&NO_DEPENDENCIES)
    }

    /// Like [`dependencies_of`](Self::dependencies_of), but distinguishes an
    /// unknown node from a node without dependencies.
    pub fn get(&self, node: &NodeId) -> Option<&BTreeSet<NodeId>> {
        self.edges.get(node)
    }

    pub fn contains(&self, node: &NodeId) -> bool {
        self.edges.contains_key(node)
    }

    /// Registered nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.edges.keys()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Copy of this graph with the entries of `nodes` removed. Edges pointing
    /// at removed nodes are kept.
    pub fn without(&self, nodes: &BTreeSet<NodeId>) -> DepGraph {
        let edges = self
            .edges
            .iter()
            .filter(|(node, _)| !nodes.contains(*node))
            .map(|(node, deps)| (node.clone(), deps.clone()))
            .collect();
        DepGraph { edges }
    }

    /// Reverse adjacency: dependency -> registered nodes depending on it.
    pub(crate) fn reverse_index(&self) -> BTreeMap<&NodeId, Vec<&NodeId>> {
        let mut reverse: BTreeMap<&NodeId, Vec<&NodeId>> = BTreeMap::new();
        for (node, deps) in &self.edges {
            for dep in deps {
                reverse.entry(dep).or_default().push(node);
            }
        }
        reverse
    }

    /// Cycles formed by edges between members of `among`.
    ///
    /// Each cycle is a strongly connected component with more than one node,
    /// or a single node depending on itself. Nodes within a cycle and the
    /// cycles themselves come back in ascending order.
    pub fn cycles_among(&self, among: &BTreeSet<NodeId>) -> Vec<Vec<NodeId>> {
        let mut graph: DiGraphMap<&NodeId, ()> = DiGraphMap::new();
        for node in among {
            graph.add_node(node);
        }
        for node in among {
            for dep in self.dependencies_of(node) {
                if among.contains(dep) {
                    graph.add_edge(node, dep, ());
                }
            }
        }

        let mut cycles: Vec<Vec<NodeId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut members: Vec<NodeId> = scc.into_iter().cloned().collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Serialize for the durable store.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&PersistedGraph::from(self))?)
    }

    /// Inverse of [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let persisted: PersistedGraph = serde_json::from_slice(bytes)?;
        Ok(persisted.into())
    }
}

/// On-disk form of a [`DepGraph`]: a node list with per-node edge lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedGraph {
    pub nodes: Vec<PersistedNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedNode {
    pub id: NodeId,
    #[serde(default)]
    pub deps: Vec<NodeId>,
}

impl From<&DepGraph> for PersistedGraph {
    fn from(graph: &DepGraph) -> Self {
        let nodes = graph
            .edges
            .iter()
            .map(|(id, deps)| PersistedNode {
                id: id.clone(),
                deps: deps.iter().cloned().collect(),
            })
            .collect();
        Self { nodes }
    }
}

impl From<PersistedGraph> for DepGraph {
    fn from(persisted: PersistedGraph) -> Self {
        DepGraph::from_edges(persisted.nodes.into_iter().map(|n| (n.id, n.deps)))
    }
}
