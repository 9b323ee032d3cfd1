// src/dag/analyzer.rs

//! Incremental dependency analyzer.
//!
//! An [`Analyzer`] owns the graph registered so far in this run, the graph
//! persisted by the previous run, and which nodes are known to have changed
//! content. It hands out one scheduling decision ([`Signal`]) per
//! [`step`](Analyzer::step).
//!
//! Analyzers are built per registration batch and folded together with
//! [`combine`](Analyzer::combine). Combining is associative and
//! [`Analyzer::new`] is its identity, so the final state never depends on how
//! registrations were batched.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::dag::{DepGraph, NodeId};

/// One scheduling decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Nothing left to build.
    Completed,
    /// Every remaining node is stuck behind a dependency cycle. Holds all
    /// stalled nodes in ascending order; none of them will be built this run.
    Cycle(Vec<NodeId>),
    /// This node's dependencies are resolved; build it now.
    Build(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analyzer {
    graph: DepGraph,
    previous: Arc<DepGraph>,
    modified: BTreeSet<NodeId>,
    done: BTreeSet<NodeId>,
    remaining: BTreeSet<NodeId>,
    /// Nodes given up on after a cycle; never scheduled again this run.
    stalled: BTreeSet<NodeId>,
}

impl Analyzer {
    /// Empty analyzer over `previous`; the identity of [`combine`](Self::combine).
    pub fn new(previous: Arc<DepGraph>) -> Self {
        Self {
            graph: DepGraph::empty(),
            previous,
            modified: BTreeSet::new(),
            done: BTreeSet::new(),
            remaining: BTreeSet::new(),
            stalled: BTreeSet::new(),
        }
    }

    /// Analyzer for a freshly registered fragment.
    ///
    /// `is_modified` is asked only about nodes that have an entry in
    /// `fragment`.
    pub fn make<F>(fragment: DepGraph, mut is_modified: F, previous: Arc<DepGraph>) -> Self
    where
        F: FnMut(&NodeId) -> bool,
    {
        let modified = fragment.nodes().filter(|n| is_modified(*n)).cloned().collect();
        let mut analyzer = Self {
            graph: fragment,
            previous,
            modified,
            done: BTreeSet::new(),
            remaining: BTreeSet::new(),
            stalled: BTreeSet::new(),
        };
        analyzer.refresh_remaining();
        analyzer
    }

    /// Merge two analyzers that share the same previous-run graph.
    ///
    /// Graphs, modified, done and stalled sets are unioned; the remaining
    /// set is recomputed from the merged state, so nodes already done stay
    /// done.
    pub fn combine(self, other: Analyzer) -> Analyzer {
        debug_assert!(
            Arc::ptr_eq(&self.previous, &other.previous) || self.previous == other.previous,
            "combining analyzers built over different previous-run graphs"
        );

        let mut merged = Analyzer {
            graph: self.graph.union(other.graph),
            previous: self.previous,
            modified: union(self.modified, other.modified),
            done: union(self.done, other.done),
            remaining: BTreeSet::new(),
            stalled: union(self.stalled, other.stalled),
        };
        merged.refresh_remaining();
        merged
    }

    /// Produce the next decision together with the advanced analyzer.
    pub fn step(mut self) -> (Signal, Analyzer) {
        let signal = self.next_signal();
        (signal, self)
    }

    /// In-place form of [`step`](Self::step).
    pub fn next_signal(&mut self) -> Signal {
        if self.remaining.is_empty() {
            return Signal::Completed;
        }

        let ready = self
            .remaining
            .iter()
            .find(|node| self.dependencies_resolved(node))
            .cloned();

        match ready {
            Some(node) => {
                self.remaining.remove(&node);
                self.done.insert(node.clone());
                trace!(node = %node, left = self.remaining.len(), "analyzer: ready");
                Signal::Build(node)
            }
            None => {
                let stuck = std::mem::take(&mut self.remaining);
                debug!(count = stuck.len(), "analyzer: no buildable node; remaining set is stalled");
                self.stalled.extend(stuck.iter().cloned());
                Signal::Cycle(stuck.into_iter().collect())
            }
        }
    }

    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    pub fn previous(&self) -> &Arc<DepGraph> {
        &self.previous
    }

    pub fn modified(&self) -> &BTreeSet<NodeId> {
        &self.modified
    }

    pub fn done(&self) -> &BTreeSet<NodeId> {
        &self.done
    }

    pub fn remaining(&self) -> &BTreeSet<NodeId> {
        &self.remaining
    }

    pub fn stalled(&self) -> &BTreeSet<NodeId> {
        &self.stalled
    }

    pub fn is_finished(&self) -> bool {
        self.remaining.is_empty()
    }

    /// A dependency blocks only while it still has to be built this run, or
    /// when it was given up on because of a cycle. Done, unchanged and
    /// unregistered dependencies are all satisfied.
    fn dependencies_resolved(&self, node: &NodeId) -> bool {
        self.graph
            .dependencies_of(node)
            .iter()
            .all(|dep| !self.remaining.contains(dep) && !self.stalled.contains(dep))
    }

    /// A node is changed when its content changed, it is new since the
    /// previous run, or its dependency set differs from last time.
    fn is_changed(&self, node: &NodeId) -> bool {
        if self.modified.contains(node) {
            return true;
        }
        match self.previous.get(node) {
            None => true,
            Some(previous_deps) => previous_deps != self.graph.dependencies_of(node),
        }
    }

    /// remaining = (changed nodes + everything depending on them, transitively)
    ///             - done - stalled
    fn refresh_remaining(&mut self) {
        let reverse = self.graph.reverse_index();
        let mut stack: Vec<&NodeId> = self.graph.nodes().filter(|n| self.is_changed(n)).collect();
        let mut rebuild: BTreeSet<&NodeId> = BTreeSet::new();

        while let Some(node) = stack.pop() {
            if !rebuild.insert(node) {
                continue;
            }
            if let Some(dependents) = reverse.get(node) {
                stack.extend(dependents.iter().copied());
            }
        }

        let remaining = rebuild
            .into_iter()
            .filter(|n| !self.done.contains(*n) && !self.stalled.contains(*n))
            .cloned()
            .collect();
        self.remaining = remaining;
    }
}

fn union(mut a: BTreeSet<NodeId>, mut b: BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    if a.len() < b.len() {
        std::mem::swap(&mut a, &mut b);
    }
    a.extend(b);
    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s)
    }

    fn graph(pairs: &[(&str, &[&str])]) -> DepGraph {
        DepGraph::from_edges(
            pairs
                .iter()
                .map(|(n, deps)| (id(n), deps.iter().map(|d| id(d)).collect::<Vec<_>>())),
        )
    }

    fn drain(mut analyzer: Analyzer) -> (Vec<Signal>, Analyzer) {
        let mut signals = Vec::new();
        loop {
            let signal = analyzer.next_signal();
            let finished = signal == Signal::Completed;
            signals.push(signal);
            if finished {
                return (signals, analyzer);
            }
        }
    }

    fn all_modified(fragment: DepGraph, previous: &Arc<DepGraph>) -> Analyzer {
        Analyzer::make(fragment, |_| true, Arc::clone(previous))
    }

    #[test]
    fn chain_builds_in_dependency_order() {
        let prev = Arc::new(DepGraph::empty());
        let analyzer = all_modified(graph(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]), &prev);

        let (signals, _) = drain(analyzer);
        assert_eq!(
            signals,
            vec![
                Signal::Build(id("a")),
                Signal::Build(id("b")),
                Signal::Build(id("c")),
                Signal::Completed,
            ]
        );
    }

    #[test]
    fn ties_break_by_ascending_id() {
        let prev = Arc::new(DepGraph::empty());
        let analyzer = all_modified(graph(&[("z", &[]), ("m", &[]), ("a", &["m"])]), &prev);

        let (signals, _) = drain(analyzer);
        assert_eq!(signals[0], Signal::Build(id("m")));
        assert_eq!(signals[1], Signal::Build(id("a")));
        assert_eq!(signals[2], Signal::Build(id("z")));
    }

    #[test]
    fn unregistered_dependency_counts_as_satisfied() {
        let prev = Arc::new(DepGraph::empty());
        let analyzer = all_modified(graph(&[("page", &["missing-template"])]), &prev);

        let (signals, _) = drain(analyzer);
        assert_eq!(signals, vec![Signal::Build(id("page")), Signal::Completed]);
    }

    #[test]
    fn unchanged_history_is_skipped_and_modified_dependent_rebuilt() {
        let g = graph(&[("a", &[]), ("b", &["a"])]);
        let prev = Arc::new(g.clone());

        let analyzer = Analyzer::make(g, |n| n == &id("b"), Arc::clone(&prev));
        let (signals, _) = drain(analyzer);
        assert_eq!(signals, vec![Signal::Build(id("b")), Signal::Completed]);
    }

    #[test]
    fn nothing_modified_means_nothing_to_build() {
        let g = graph(&[("a", &[]), ("b", &["a"])]);
        let prev = Arc::new(g.clone());

        let (signals, _) = drain(Analyzer::make(g, |_| false, prev));
        assert_eq!(signals, vec![Signal::Completed]);
    }

    #[test]
    fn modified_leaf_rebuilds_its_dependents() {
        let g = graph(&[("a", &[]), ("b", &["a"]), ("c", &["b"]), ("d", &[])]);
        let prev = Arc::new(g.clone());

        let (signals, _) = drain(Analyzer::make(g, |n| n == &id("a"), prev));
        assert_eq!(
            signals,
            vec![
                Signal::Build(id("a")),
                Signal::Build(id("b")),
                Signal::Build(id("c")),
                Signal::Completed,
            ]
        );
    }

    #[test]
    fn changed_dependency_set_counts_as_change() {
        let prev = Arc::new(graph(&[("a", &[]), ("b", &[])]));
        let now = graph(&[("a", &[]), ("b", &["a"])]);

        let (signals, _) = drain(Analyzer::make(now, |_| false, prev));
        assert_eq!(signals, vec![Signal::Build(id("b")), Signal::Completed]);
    }

    #[test]
    fn cycle_is_contained_and_reported_once() {
        let prev = Arc::new(DepGraph::empty());
        let analyzer = all_modified(
            graph(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"]), ("free", &[])]),
            &prev,
        );

        let (signals, analyzer) = drain(analyzer);
        assert_eq!(
            signals,
            vec![
                Signal::Build(id("free")),
                Signal::Cycle(vec![id("a"), id("b"), id("c")]),
                Signal::Completed,
            ]
        );
        assert!(analyzer.done().contains(&id("free")));
        assert!(!analyzer.done().contains(&id("a")));
        assert_eq!(analyzer.stalled().len(), 3);
    }

    #[test]
    fn stalled_nodes_stay_out_after_later_merges() {
        let prev = Arc::new(DepGraph::empty());
        let mut analyzer = all_modified(graph(&[("a", &["b"]), ("b", &["a"])]), &prev);
        assert!(matches!(analyzer.next_signal(), Signal::Cycle(_)));

        let late = all_modified(graph(&[("c", &["a"]), ("d", &[])]), &prev);
        let (signals, _) = drain(analyzer.combine(late));
        assert_eq!(
            signals,
            vec![
                Signal::Build(id("d")),
                Signal::Cycle(vec![id("c")]),
                Signal::Completed,
            ]
        );
    }

    #[test]
    fn done_nodes_are_never_rescheduled_by_merges() {
        let prev = Arc::new(DepGraph::empty());
        let mut analyzer = all_modified(graph(&[("x", &[])]), &prev);
        assert_eq!(analyzer.next_signal(), Signal::Build(id("x")));

        // A new dependent of `x` makes `x` reachable from a change again.
        let late = all_modified(graph(&[("y", &["x"])]), &prev);
        let (signals, analyzer) = drain(analyzer.combine(late));
        assert_eq!(signals, vec![Signal::Build(id("y")), Signal::Completed]);
        assert_eq!(analyzer.done().len(), 2);
    }

    #[test]
    fn empty_make_is_combine_identity() {
        let prev = Arc::new(graph(&[("a", &[])]));
        let mut a = Analyzer::make(graph(&[("a", &[]), ("b", &["a"])]), |n| n == &id("b"), Arc::clone(&prev));
        a.next_signal();

        let identity = Analyzer::make(DepGraph::empty(), |_| true, Arc::clone(&prev));
        assert_eq!(a.clone().combine(identity.clone()), a);
        assert_eq!(identity.combine(a.clone()), a);
    }

    #[test]
    fn is_modified_is_only_asked_about_fragment_nodes() {
        let prev = Arc::new(DepGraph::empty());
        let mut asked = Vec::new();
        Analyzer::make(
            graph(&[("page", &["template"])]),
            |n| {
                asked.push(n.clone());
                false
            },
            prev,
        );
        assert_eq!(asked, vec![id("page")]);
    }

    #[test]
    fn completed_step_leaves_state_untouched() {
        let prev = Arc::new(DepGraph::empty());
        let analyzer = Analyzer::new(prev);
        let (signal, after) = analyzer.clone().step();
        assert_eq!(signal, Signal::Completed);
        assert_eq!(after, analyzer);
    }
}
