// src/engine/registry.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::dag::NodeId;
use crate::errors::{Result, SitedagError};
use crate::unit::{BuildUnit, Registration};

/// Build unit per registered node. A node can be registered once per run.
#[derive(Debug, Default)]
pub struct Registry {
    units: BTreeMap<NodeId, Arc<dyn BuildUnit>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch of registrations.
    ///
    /// The whole batch is rejected, and nothing inserted, if any id is
    /// already registered or appears twice within the batch.
    pub fn insert_batch(&mut self, batch: Vec<Registration>) -> Result<Vec<NodeId>> {
        let mut seen = BTreeSet::new();
        for reg in &batch {
            if self.units.contains_key(&reg.id) || !seen.insert(&reg.id) {
                return Err(SitedagError::DuplicateRegistration(reg.id.to_string()));
            }
        }

        let mut ids = Vec::with_capacity(batch.len());
        for Registration { id, unit } in batch {
            ids.push(id.clone());
            self.units.insert(id, unit);
        }
        Ok(ids)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Arc<dyn BuildUnit>> {
        self.units.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.units.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
