// src/unit/mod.rs

//! Build units: the transformations the engine schedules.
//!
//! Every unit implements [`BuildUnit`]. The engine only ever sees the closed
//! set of outcomes a unit can report:
//! - an [`Artifact`] to store and (if routed) write,
//! - a batch of further [`Registration`]s discovered while building,
//! - a [`UnitFailure`].
//!
//! Concrete units shipped with the tool:
//! - [`copy::CopyUnit`] passes the resource through unchanged.
//! - [`command::CommandUnit`] pipes the resource through a shell command.
//! - [`manifest::ManifestUnit`] reads a list of resources and registers a
//!   unit for each of them mid-run.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::dag::NodeId;
use crate::resource::ResourceProvider;
use crate::routes::Routes;
use crate::store::{Store, ARTIFACT_NAMESPACE};

pub mod command;
pub mod copy;
pub mod deps;
pub mod manifest;

pub use command::CommandUnit;
pub use copy::CopyUnit;
pub use deps::DeclaredDeps;
pub use manifest::ManifestUnit;

/// Future returned by [`BuildUnit::execute`].
pub type UnitFuture<'a> = Pin<Box<dyn Future<Output = Result<UnitOutput, UnitFailure>> + Send + 'a>>;

/// A schedulable transformation.
pub trait BuildUnit: Send + Sync + fmt::Debug {
    /// Short label for logs and `check` output.
    fn kind(&self) -> &'static str;

    /// Static dependencies of `id`, declared before anything is built.
    fn dependencies(
        &self,
        id: &NodeId,
        provider: &dyn ResourceProvider,
    ) -> anyhow::Result<BTreeSet<NodeId>>;

    /// Run the transformation.
    fn execute<'a>(&'a self, ctx: BuildContext<'a>) -> UnitFuture<'a>;

    /// Units that must run on every build regardless of change detection.
    ///
    /// Generative units return `true` so that the nodes they discover are
    /// registered (and persisted) on every run.
    fn always_run(&self) -> bool {
        false
    }
}

/// Everything a unit may look at while building one node.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub id: &'a NodeId,
    pub dependencies: &'a BTreeSet<NodeId>,
    pub provider: &'a dyn ResourceProvider,
    pub routes: &'a Routes,
    pub store: &'a dyn Store,
    /// Whether this node's own resource changed since the last run. A unit
    /// can still be scheduled with `modified == false` when a dependency
    /// changed.
    pub modified: bool,
}

impl<'a> BuildContext<'a> {
    pub fn read_resource(&self) -> Result<Vec<u8>, UnitFailure> {
        self.provider.read(self.id).map_err(UnitFailure::Resource)
    }

    /// Artifact produced for `id` by this or an earlier run.
    pub fn artifact_of(&self, id: &NodeId) -> Result<Option<Artifact>, UnitFailure> {
        let bytes = self
            .store
            .get(ARTIFACT_NAMESPACE, &id.to_string())
            .map_err(UnitFailure::Store)?;
        Ok(bytes.map(Artifact::from))
    }

    /// This node's own artifact from the last time it was built.
    pub fn cached_artifact(&self) -> Result<Option<Artifact>, UnitFailure> {
        self.artifact_of(self.id)
    }
}

/// A node registered with the engine together with the unit that builds it.
#[derive(Debug, Clone)]
pub struct Registration {
    pub id: NodeId,
    pub unit: Arc<dyn BuildUnit>,
}

impl Registration {
    pub fn new(id: NodeId, unit: Arc<dyn BuildUnit>) -> Self {
        Self { id, unit }
    }
}

/// Output bytes of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Artifact(Vec<u8>);

impl Artifact {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Artifact {
    fn from(bytes: Vec<u8>) -> Self {
        Artifact(bytes)
    }
}

impl From<&str> for Artifact {
    fn from(s: &str) -> Self {
        Artifact(s.as_bytes().to_vec())
    }
}

impl From<String> for Artifact {
    fn from(s: String) -> Self {
        Artifact(s.into_bytes())
    }
}

/// Successful result of a unit.
#[derive(Debug)]
pub enum UnitOutput {
    Artifact(Artifact),
    /// More nodes to schedule in this run.
    Generated(Vec<Registration>),
}

/// Why a unit did not produce anything.
#[derive(Debug, Error)]
pub enum UnitFailure {
    #[error("reading resource: {0:#}")]
    Resource(anyhow::Error),

    #[error("store access: {0:#}")]
    Store(anyhow::Error),

    #[error("spawning `{cmd}`: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{cmd}` exited with code {code}: {stderr}")]
    Command { cmd: String, code: i32, stderr: String },

    #[error("{0}")]
    Invalid(String),
}
