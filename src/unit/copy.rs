// src/unit/copy.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::NodeId;
use crate::resource::ResourceProvider;
use crate::unit::{BuildContext, BuildUnit, DeclaredDeps, UnitFuture, UnitOutput};

/// Artifact is the resource content, unchanged.
///
/// When the resource itself is unmodified (the node was only scheduled
/// because a dependency changed), the stored artifact is reused instead of
/// reading the resource again.
#[derive(Debug, Clone, Default)]
pub struct CopyUnit {
    deps: DeclaredDeps,
}

impl CopyUnit {
    pub fn new(deps: DeclaredDeps) -> Self {
        Self { deps }
    }
}

impl BuildUnit for CopyUnit {
    fn kind(&self) -> &'static str {
        "copy"
    }

    fn dependencies(
        &self,
        id: &NodeId,
        provider: &dyn ResourceProvider,
    ) -> anyhow::Result<BTreeSet<NodeId>> {
        self.deps.resolve(id, provider)
    }

    fn execute<'a>(&'a self, ctx: BuildContext<'a>) -> UnitFuture<'a> {
        Box::pin(async move {
            if !ctx.modified {
                if let Some(cached) = ctx.cached_artifact()? {
                    debug!(node = %ctx.id, "resource unchanged; reusing stored copy");
                    return Ok(UnitOutput::Artifact(cached));
                }
            }
            let bytes = ctx.read_resource()?;
            Ok(UnitOutput::Artifact(bytes.into()))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::resource::FileProvider;
    use crate::routes::Routes;
    use crate::store::{MemoryStore, Store, ARTIFACT_NAMESPACE};
    use crate::unit::Artifact;

    async fn copy(modified: bool, store: &MemoryStore) -> Artifact {
        let fs = MockFileSystem::new();
        fs.add_file("content/a.css", "fresh");
        let provider = FileProvider::new(Arc::new(fs), "content");
        let id = NodeId::new("a.css");
        let deps = BTreeSet::new();
        let routes = Routes::new();
        let ctx = BuildContext {
            id: &id,
            dependencies: &deps,
            provider: &provider,
            routes: &routes,
            store,
            modified,
        };
        match CopyUnit::default().execute(ctx).await.unwrap() {
            UnitOutput::Artifact(a) => a,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[tokio::test]
    async fn unmodified_resource_reuses_stored_artifact() {
        let store = MemoryStore::new();
        store.set(ARTIFACT_NAMESPACE, "a.css", b"cached").unwrap();

        assert_eq!(copy(false, &store).await.bytes(), b"cached");
        assert_eq!(copy(true, &store).await.bytes(), b"fresh");
    }

    #[tokio::test]
    async fn unmodified_without_cache_reads_resource() {
        assert_eq!(copy(false, &MemoryStore::new()).await.bytes(), b"fresh");
    }
}
