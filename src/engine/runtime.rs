// src/engine/runtime.rs

use std::collections::BTreeSet;
use std::fmt;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::dag::{Analyzer, DepGraph, NodeId, Signal};
use crate::errors::{Result, SitedagError};
use crate::resource::ModificationCheck;
use crate::routes::is_contained;
use crate::store::{Store, ARTIFACT_NAMESPACE, GRAPH_KEY, GRAPH_NAMESPACE};
use crate::unit::{Artifact, BuildContext, Registration, UnitFailure, UnitOutput};

use super::{BuildEnv, Registry, RunReport};

/// State of one build run.
///
/// Nodes are built one at a time, in the order the analyzer hands them out.
/// Registrations discovered while building are merged into the running
/// analyzer before the next decision is taken.
pub struct Runtime {
    env: BuildEnv,
    check: Box<dyn ModificationCheck>,
    registry: Registry,
    previous: Arc<DepGraph>,
    analyzer: Analyzer,
    report: RunReport,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("env", &self.env)
            .field("registry", &self.registry)
            .field("analyzer", &self.analyzer)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(env: BuildEnv, check: Box<dyn ModificationCheck>, previous: DepGraph) -> Self {
        let previous = Arc::new(previous);
        Self {
            env,
            check,
            registry: Registry::new(),
            analyzer: Analyzer::new(previous.clone()),
            previous,
            report: RunReport::default(),
        }
    }

    /// Graph persisted by the last run.
    ///
    /// A missing entry means a first run. An entry that cannot be decoded is
    /// logged and treated the same way, so the run rebuilds everything and
    /// overwrites it.
    pub fn load_previous_graph(store: &dyn Store) -> Result<DepGraph> {
        let Some(bytes) = store.get(GRAPH_NAMESPACE, GRAPH_KEY)? else {
            info!("no previous dependency graph; every node is new");
            return Ok(DepGraph::empty());
        };

        match DepGraph::from_bytes(&bytes) {
            Ok(graph) => {
                info!(nodes = graph.len(), "loaded previous dependency graph");
                Ok(graph)
            }
            Err(err) => {
                warn!(error = %err, "previous dependency graph is unreadable; rebuilding everything");
                Ok(DepGraph::empty())
            }
        }
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Register a batch of nodes and merge them into the running analyzer.
    ///
    /// Dependencies are resolved and modification is checked once, here.
    pub fn register(&mut self, batch: Vec<Registration>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let ids = self.registry.insert_batch(batch)?;
        let provider = self.env.provider.as_ref();
        let store = self.env.store.as_ref();

        let mut edges = Vec::with_capacity(ids.len());
        let mut modified = BTreeSet::new();
        for id in &ids {
            let unit = self
                .registry
                .get(id)
                .ok_or_else(|| SitedagError::UnknownNode(id.to_string()))?;
            let deps = unit
                .dependencies(id, provider)
                .with_context(|| format!("resolving dependencies of {id}"))?;
            if unit.always_run() || self.check.is_modified(provider, store, id)? {
                modified.insert(id.clone());
            }
            edges.push((id.clone(), deps));
        }

        let fragment = Analyzer::make(
            DepGraph::from_edges(edges),
            |n| modified.contains(n),
            self.previous.clone(),
        );
        let running = mem::replace(&mut self.analyzer, Analyzer::new(self.previous.clone()));
        self.analyzer = running.combine(fragment);
        self.report.registered += ids.len();

        debug!(
            registered = ids.len(),
            modified = modified.len(),
            remaining = self.analyzer.remaining().len(),
            "registered batch"
        );
        Ok(())
    }

    /// Build until the analyzer reports completion.
    pub async fn drive(&mut self) -> Result<()> {
        loop {
            match self.analyzer.next_signal() {
                Signal::Completed => return Ok(()),
                Signal::Build(id) => self.build_one(id).await?,
                Signal::Cycle(stuck) => self.record_stall(stuck),
            }
        }
    }

    fn record_stall(&mut self, stuck: Vec<NodeId>) {
        let stuck: BTreeSet<NodeId> = stuck.into_iter().collect();
        let cycles = self.analyzer.graph().cycles_among(&stuck);
        for cycle in &cycles {
            let members: Vec<String> = cycle.iter().map(|n| n.to_string()).collect();
            warn!(nodes = %members.join(" -> "), "dependency cycle");
        }
        warn!(stalled = stuck.len(), "nodes left unbuilt behind dependency cycles");
        self.report.cycles.extend(cycles);
        self.report.stalled.extend(stuck);
    }

    async fn build_one(&mut self, id: NodeId) -> Result<()> {
        self.report.scheduled.push(id.clone());

        let unit = self
            .registry
            .get(&id)
            .cloned()
            .ok_or_else(|| SitedagError::UnknownNode(id.to_string()))?;
        let deps = self.analyzer.graph().dependencies_of(&id).clone();

        if let Some(broken) = deps.iter().find(|d| self.report.is_broken(d)) {
            warn!(node = %id, dependency = %broken, "skipping node: dependency did not build");
            self.report.degraded.insert(id);
            return Ok(());
        }

        // Nodes unknown to the last run have no trustworthy cached artifact.
        let modified = self.analyzer.modified().contains(&id) || !self.previous.contains(&id);
        debug!(node = %id, kind = unit.kind(), modified, "building node");

        let ctx = BuildContext {
            id: &id,
            dependencies: &deps,
            provider: self.env.provider.as_ref(),
            routes: &self.env.routes,
            store: self.env.store.as_ref(),
            modified,
        };

        match unit.execute(ctx).await {
            Ok(UnitOutput::Artifact(artifact)) => match self.destination_of(&id) {
                Ok(dest) => {
                    self.emit(&id, artifact, dest)?;
                    self.report.built.insert(id);
                }
                Err(failure) => {
                    error!(node = %id, error = %failure, "refusing to write artifact");
                    self.report.failed.insert(id, failure.to_string());
                }
            },
            Ok(UnitOutput::Generated(batch)) => {
                info!(node = %id, count = batch.len(), "registering generated nodes");
                self.report.generated += batch.len();
                self.report.built.insert(id);
                self.register(batch)?;
            }
            Err(failure) => {
                error!(node = %id, error = %failure, "build failed");
                self.report.failed.insert(id, failure.to_string());
            }
        }
        Ok(())
    }

    /// Output path of `id`, or `None` when it is not routed. Routes that
    /// leave the destination directory are a failure of the node.
    fn destination_of(&self, id: &NodeId) -> std::result::Result<Option<PathBuf>, UnitFailure> {
        match self.env.routes.route(id) {
            None => Ok(None),
            Some(rel) if is_contained(&rel) => Ok(Some(self.env.destination.join(rel))),
            Some(rel) => Err(UnitFailure::Invalid(format!(
                "route of {id} leaves the destination directory: {}",
                rel.display()
            ))),
        }
    }

    /// Store the artifact and, if the node is routed, write it out.
    fn emit(&mut self, id: &NodeId, artifact: Artifact, dest: Option<PathBuf>) -> Result<()> {
        self.env
            .store
            .set(ARTIFACT_NAMESPACE, &id.to_string(), artifact.bytes())
            .with_context(|| format!("storing artifact of {id}"))?;

        let Some(dest) = dest else {
            debug!(node = %id, "no route; artifact kept in the store only");
            return Ok(());
        };

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.env.sink.create_dir_all(parent)?;
        }
        self.env.sink.write(&dest, artifact.bytes())?;

        debug!(node = %id, path = %dest.display(), bytes = artifact.bytes().len(), "wrote artifact");
        self.report.written.push(dest);
        Ok(())
    }

    /// Write the merged graph, then commit fingerprints of nodes that settled.
    ///
    /// Failed, degraded and stalled nodes are left out of the persisted graph,
    /// so the next run sees them as new and schedules them again whatever
    /// else changed.
    pub fn persist(&mut self) -> Result<()> {
        let unsettled = self.report.unsettled();
        let graph = self.analyzer.graph().without(&unsettled);
        let bytes = graph.to_bytes()?;
        self.env
            .store
            .set(GRAPH_NAMESPACE, GRAPH_KEY, &bytes)
            .context("persisting dependency graph")?;

        self.check.commit(self.env.store.as_ref(), &unsettled)?;

        info!(
            nodes = graph.len(),
            unsettled = unsettled.len(),
            "persisted dependency graph"
        );
        Ok(())
    }

    /// Run a whole build from the initial registrations.
    pub async fn run(mut self, initial: Vec<Registration>) -> Result<RunReport> {
        let started = Instant::now();

        {
            let _span = info_span!("register").entered();
            self.register(initial)?;
            info!(
                nodes = self.registry.len(),
                scheduled = self.analyzer.remaining().len(),
                elapsed = ?started.elapsed(),
                "initial registration done"
            );
        }

        let drive_started = Instant::now();
        self.drive().instrument(info_span!("drive")).await?;
        info!(
            built = self.report.built.len(),
            elapsed = ?drive_started.elapsed(),
            "analyzer completed"
        );

        {
            let _span = info_span!("persist").entered();
            self.persist()?;
        }

        let report = self.report;
        info!(
            registered = report.registered,
            built = report.built.len(),
            written = report.written.len(),
            failed = report.failed.len(),
            degraded = report.degraded.len(),
            stalled = report.stalled.len(),
            elapsed = ?started.elapsed(),
            "build finished"
        );
        Ok(report)
    }
}
