// src/unit/deps.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;

use crate::dag::NodeId;
use crate::resource::ResourceProvider;
use crate::rules::patterns::PatternSet;

/// Dependencies a configured unit declares up front: every resource matching
/// the rule's `after` patterns, except the node itself.
#[derive(Debug, Clone, Default)]
pub struct DeclaredDeps {
    after: Option<Arc<PatternSet>>,
}

impl DeclaredDeps {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn after(patterns: Option<Arc<PatternSet>>) -> Self {
        Self { after: patterns }
    }

    pub fn resolve(&self, id: &NodeId, provider: &dyn ResourceProvider) -> Result<BTreeSet<NodeId>> {
        let Some(after) = &self.after else {
            return Ok(BTreeSet::new());
        };
        let mut deps: BTreeSet<NodeId> = after.matching_resources(provider)?.into_iter().collect();
        deps.remove(id);
        Ok(deps)
    }
}
