// src/unit/manifest.rs

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::dag::NodeId;
use crate::resource::ResourceProvider;
use crate::routes::is_contained;
use crate::unit::{
    BuildContext, BuildUnit, DeclaredDeps, Registration, UnitFailure, UnitFuture, UnitOutput,
};

/// Generative unit: every non-empty line of the resource names another
/// resource, which is registered as `line@group:manifest` and built by `emit`.
///
/// Scoping the group by the manifest's own path keeps two manifests of one
/// rule from generating the same node. Lines starting with `#` are ignored.
/// The manifest node itself produces no artifact.
#[derive(Debug, Clone)]
pub struct ManifestUnit {
    group: String,
    emit: Arc<dyn BuildUnit>,
    deps: DeclaredDeps,
}

impl ManifestUnit {
    pub fn new(group: impl Into<String>, emit: Arc<dyn BuildUnit>, deps: DeclaredDeps) -> Self {
        Self {
            group: group.into(),
            emit,
            deps,
        }
    }

    /// Node ids named by the content of `manifest`, deduplicated and in
    /// order. Lines pointing outside the resource root are rejected.
    pub fn entries(&self, manifest: &NodeId, content: &str) -> Result<Vec<NodeId>, UnitFailure> {
        let group = format!("{}:{}", self.group, manifest.path());
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if !is_contained(Path::new(line)) {
                return Err(UnitFailure::Invalid(format!(
                    "manifest {manifest} names {line}, which is outside the resource root"
                )));
            }
            let id = NodeId::with_group(line, group.clone());
            if seen.insert(id.clone()) {
                out.push(id);
            }
        }
        Ok(out)
    }
}

impl BuildUnit for ManifestUnit {
    fn kind(&self) -> &'static str {
        "manifest"
    }

    fn dependencies(
        &self,
        id: &NodeId,
        provider: &dyn ResourceProvider,
    ) -> anyhow::Result<BTreeSet<NodeId>> {
        self.deps.resolve(id, provider)
    }

    fn always_run(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, ctx: BuildContext<'a>) -> UnitFuture<'a> {
        Box::pin(async move {
            let bytes = ctx.read_resource()?;
            let content = String::from_utf8(bytes).map_err(|e| {
                UnitFailure::Invalid(format!("manifest {} is not UTF-8: {e}", ctx.id))
            })?;

            let regs: Vec<Registration> = self
                .entries(ctx.id, &content)?
                .into_iter()
                .map(|id| Registration::new(id, self.emit.clone()))
                .collect();

            debug!(node = %ctx.id, generated = regs.len(), "manifest expanded");
            Ok(UnitOutput::Generated(regs))
        })
    }
}
