//! In-memory build environment over the mock filesystem.

use std::sync::Arc;

use sitedag::dag::DepGraph;
use sitedag::engine::{BuildEnv, Runtime};
use sitedag::fs::mock::MockFileSystem;
use sitedag::resource::{FileProvider, ModificationCheck};
use sitedag::routes::Routes;
use sitedag::store::{MemoryStore, Store};

pub const CONTENT: &str = "content";
pub const SITE: &str = "_site";

/// Resources live under `content/`, artifacts are written below `_site/`.
/// The store outlives individual runs so that consecutive runs are
/// incremental.
#[derive(Debug, Clone)]
pub struct TestEnv {
    pub fs: MockFileSystem,
    pub store: Arc<MemoryStore>,
    pub routes: Routes,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            fs: MockFileSystem::new(),
            store: Arc::new(MemoryStore::new()),
            routes: Routes::new(),
        }
    }

    pub fn with_routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    /// Add a resource below `content/`.
    pub fn add_resource(&self, rel: &str, contents: &str) {
        self.fs.add_file(&format!("{CONTENT}/{rel}"), contents);
    }

    pub fn build_env(&self) -> BuildEnv {
        let store: Arc<dyn Store> = self.store.clone();
        BuildEnv {
            provider: Arc::new(FileProvider::new(Arc::new(self.fs.clone()), CONTENT)),
            store,
            sink: Arc::new(self.fs.clone()),
            destination: SITE.into(),
            routes: self.routes.clone(),
        }
    }

    /// Runtime over the graph persisted by the previous run, if any.
    pub fn runtime(&self, check: impl ModificationCheck + 'static) -> Runtime {
        let previous = Runtime::load_previous_graph(self.store.as_ref())
            .expect("loading previous graph");
        Runtime::new(self.build_env(), Box::new(check), previous)
    }

    pub fn runtime_over(&self, check: impl ModificationCheck + 'static, previous: DepGraph) -> Runtime {
        Runtime::new(self.build_env(), Box::new(check), previous)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
