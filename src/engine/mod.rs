// src/engine/mod.rs

//! Build engine.
//!
//! A [`Runtime`] owns everything one build run needs:
//! - the [`Registry`] of build units,
//! - the running [`Analyzer`](crate::dag::Analyzer),
//! - the collaborators in [`BuildEnv`],
//! - the [`RunReport`] being assembled.
//!
//! A run loads the previous dependency graph, registers the initial nodes,
//! drives the analyzer until it completes (registering generated nodes as
//! they appear), and finally persists the merged graph and fingerprints.

use std::path::PathBuf;
use std::sync::Arc;

use crate::fs::FileSystem;
use crate::resource::ResourceProvider;
use crate::routes::Routes;
use crate::store::Store;

pub mod registry;
pub mod report;
pub mod runtime;

pub use registry::Registry;
pub use report::RunReport;
pub use runtime::Runtime;

/// Collaborators a run reads from and writes to.
#[derive(Clone)]
pub struct BuildEnv {
    pub provider: Arc<dyn ResourceProvider>,
    pub store: Arc<dyn Store>,
    /// Where routed artifacts are written.
    pub sink: Arc<dyn FileSystem>,
    /// Root that routes are resolved against.
    pub destination: PathBuf,
    pub routes: Routes,
}

impl std::fmt::Debug for BuildEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildEnv")
            .field("destination", &self.destination)
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}
