use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;
use sitedag::dag::{Analyzer, DepGraph, NodeId, Signal};

fn id(i: usize) -> NodeId {
    NodeId::new(format!("n{i:02}.md"))
}

/// Acyclic graphs: node `i` may only depend on nodes `0..i`.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<(NodeId, BTreeSet<NodeId>)>> {
    (1..=max_nodes).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            move |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, picks)| {
                        let deps = if i == 0 {
                            BTreeSet::new()
                        } else {
                            picks.into_iter().map(|p| id(p % i)).collect()
                        };
                        (id(i), deps)
                    })
                    .collect()
            },
        )
    })
}

fn drain(mut analyzer: Analyzer) -> (Vec<Signal>, Analyzer) {
    let mut signals = Vec::new();
    // Each step either finishes a node or empties the remaining set.
    let bound = analyzer.remaining().len() + 2;
    for _ in 0..bound {
        let signal = analyzer.next_signal();
        let finished = signal == Signal::Completed;
        signals.push(signal);
        if finished {
            break;
        }
    }
    (signals, analyzer)
}

fn built(signals: &[Signal]) -> Vec<NodeId> {
    signals
        .iter()
        .filter_map(|s| match s {
            Signal::Build(n) => Some(n.clone()),
            _ => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn dependencies_are_built_before_dependents(
        edges in dag_strategy(12),
        modified_mask in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let modified: BTreeSet<NodeId> = edges
            .iter()
            .zip(modified_mask.iter())
            .filter(|(_, m)| **m)
            .map(|((n, _), _)| n.clone())
            .collect();
        let graph = DepGraph::from_edges(edges.clone());
        let analyzer = Analyzer::make(graph.clone(), |n| modified.contains(n), Arc::new(DepGraph::empty()));

        let (signals, finished) = drain(analyzer);
        prop_assert_eq!(signals.last(), Some(&Signal::Completed));

        let order = built(&signals);
        let position: BTreeMap<&NodeId, usize> = order.iter().enumerate().map(|(i, n)| (n, i)).collect();
        for (node, at) in &position {
            for dep in graph.dependencies_of(node) {
                prop_assert!(position[dep] < *at, "{} built before its dependency {}", node, dep);
            }
        }

        // Empty previous graph: every node is new, so each is built exactly once.
        prop_assert_eq!(order.len(), edges.len());
        prop_assert!(finished.stalled().is_empty());
    }

    #[test]
    fn unchanged_graph_with_nothing_modified_builds_nothing(edges in dag_strategy(12)) {
        let graph = DepGraph::from_edges(edges);
        let analyzer = Analyzer::make(graph.clone(), |_| false, Arc::new(graph));
        let (signals, _) = drain(analyzer);
        prop_assert_eq!(signals, vec![Signal::Completed]);
    }

    #[test]
    fn batching_does_not_change_the_outcome(
        edges in dag_strategy(12),
        modified_mask in proptest::collection::vec(any::<bool>(), 12),
        cuts in proptest::collection::vec(any::<bool>(), 12),
        previous_len in 0usize..12,
    ) {
        let modified: BTreeSet<NodeId> = edges
            .iter()
            .zip(modified_mask.iter())
            .filter(|(_, m)| **m)
            .map(|((n, _), _)| n.clone())
            .collect();
        let previous = Arc::new(DepGraph::from_edges(edges.iter().take(previous_len).cloned()));
        let is_modified = |n: &NodeId| modified.contains(n);

        let whole = Analyzer::make(DepGraph::from_edges(edges.clone()), is_modified, previous.clone());

        // Split registrations into consecutive batches at the `cuts`.
        let mut batches: Vec<Vec<(NodeId, BTreeSet<NodeId>)>> = vec![Vec::new()];
        for (entry, cut) in edges.iter().zip(cuts.iter()) {
            if *cut && !batches.last().map(Vec::is_empty).unwrap_or(true) {
                batches.push(Vec::new());
            }
            if let Some(last) = batches.last_mut() {
                last.push(entry.clone());
            }
        }
        let fragments: Vec<Analyzer> = batches
            .into_iter()
            .map(|b| Analyzer::make(DepGraph::from_edges(b), is_modified, previous.clone()))
            .collect();

        let left = fragments
            .iter()
            .cloned()
            .fold(Analyzer::new(previous.clone()), Analyzer::combine);
        let right = fragments
            .iter()
            .cloned()
            .rev()
            .fold(Analyzer::new(previous.clone()), |acc, f| f.combine(acc));

        prop_assert_eq!(&left, &whole);
        prop_assert_eq!(&right, &whole);
        prop_assert_eq!(drain(left).0, drain(whole).0);
    }

    #[test]
    fn scheduling_is_deterministic(
        edges in dag_strategy(12),
        modified_mask in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let modified: BTreeSet<NodeId> = edges
            .iter()
            .zip(modified_mask.iter())
            .filter(|(_, m)| **m)
            .map(|((n, _), _)| n.clone())
            .collect();
        let previous = Arc::new(DepGraph::from_edges(edges.clone()));
        let run = || {
            let analyzer = Analyzer::make(
                DepGraph::from_edges(edges.clone()),
                |n| modified.contains(n),
                previous.clone(),
            );
            drain(analyzer).0
        };
        prop_assert_eq!(run(), run());
    }
}

#[test]
fn cycle_stalls_all_remaining_nodes_and_terminates() {
    let graph = DepGraph::from_edges([
        (id(0), vec![id(1)]),
        (id(1), vec![id(0)]),
        (id(2), vec![id(1)]),
        (id(3), vec![]),
    ]);
    let analyzer = Analyzer::make(graph, |_| true, Arc::new(DepGraph::empty()));
    let (signals, finished) = drain(analyzer);

    assert_eq!(
        signals,
        vec![
            Signal::Build(id(3)),
            Signal::Cycle(vec![id(0), id(1), id(2)]),
            Signal::Completed,
        ]
    );
    assert_eq!(
        finished.stalled(),
        &BTreeSet::from([id(0), id(1), id(2)])
    );
}
