// src/resource/fingerprint.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::Result;
use blake3::Hasher;
use tracing::{debug, info};

use crate::dag::NodeId;
use crate::resource::ResourceProvider;
use crate::store::{Store, FINGERPRINT_NAMESPACE};

/// Compute the hex blake3 digest of a resource's content.
pub fn compute_fingerprint(content: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().to_hex().to_string()
}

/// Decides whether a node's underlying resource changed since the last
/// successful run.
pub trait ModificationCheck: Send {
    fn is_modified(
        &mut self,
        provider: &dyn ResourceProvider,
        store: &dyn Store,
        id: &NodeId,
    ) -> Result<bool>;

    /// Make this run's observations durable, except for nodes in `skip`
    /// (failed, degraded or stalled). The engine also drops those nodes from
    /// the persisted graph, which is what schedules them again next run.
    fn commit(&mut self, store: &dyn Store, skip: &BTreeSet<NodeId>) -> Result<()>;
}

/// Fingerprint comparison against [`FINGERPRINT_NAMESPACE`].
///
/// - Answers are cached per node, so asking again while building returns the
///   answer given at registration time.
/// - New fingerprints are only staged; nothing is written until [`commit`],
///   which the engine calls after the dependency graph has been persisted.
///   An aborted run therefore leaves the previous fingerprints in place.
/// - Nodes without a backing resource (e.g. generated variants of missing
///   files) are never reported as modified; their changes surface through
///   the dependency graph instead.
///
/// [`commit`]: ModificationCheck::commit
#[derive(Debug, Default)]
pub struct FingerprintCheck {
    answers: HashMap<NodeId, bool>,
    staged: BTreeMap<NodeId, String>,
}

impl FingerprintCheck {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ModificationCheck for FingerprintCheck {
    fn is_modified(
        &mut self,
        provider: &dyn ResourceProvider,
        store: &dyn Store,
        id: &NodeId,
    ) -> Result<bool> {
        if let Some(answer) = self.answers.get(id) {
            return Ok(*answer);
        }

        let modified = if provider.exists(id) {
            let fingerprint = compute_fingerprint(&provider.read(id)?);
            let previous = store.get(FINGERPRINT_NAMESPACE, &id.to_string())?;
            let modified = previous.as_deref() != Some(fingerprint.as_bytes());
            if modified {
                self.staged.insert(id.clone(), fingerprint);
            }
            modified
        } else {
            false
        };

        debug!(node = %id, modified, "checked resource fingerprint");
        self.answers.insert(id.clone(), modified);
        Ok(modified)
    }

    fn commit(&mut self, store: &dyn Store, skip: &BTreeSet<NodeId>) -> Result<()> {
        let mut written = 0usize;
        for (id, fingerprint) in std::mem::take(&mut self.staged) {
            if skip.contains(&id) {
                continue;
            }
            store.set(FINGERPRINT_NAMESPACE, &id.to_string(), fingerprint.as_bytes())?;
            written += 1;
        }
        info!(written, skipped = skip.len(), "committed resource fingerprints");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::resource::FileProvider;
    use crate::store::MemoryStore;

    #[test]
    fn known_digest() {
        assert_eq!(
            compute_fingerprint(b"hello world"),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn modified_until_committed_then_clean() {
        let fs = MockFileSystem::new();
        fs.add_file("content/a.md", "a");
        let provider = FileProvider::new(Arc::new(fs), "content");
        let store = MemoryStore::new();
        let a = NodeId::new("a.md");

        let mut first = FingerprintCheck::new();
        assert!(first.is_modified(&provider, &store, &a).unwrap());
        // Cached: still the registration-time answer.
        assert!(first.is_modified(&provider, &store, &a).unwrap());
        assert_eq!(store.count(FINGERPRINT_NAMESPACE), 0);
        first.commit(&store, &BTreeSet::new()).unwrap();

        let mut second = FingerprintCheck::new();
        assert!(!second.is_modified(&provider, &store, &a).unwrap());
    }

    #[test]
    fn skipped_nodes_stay_modified() {
        let fs = MockFileSystem::new();
        fs.add_file("content/a.md", "a");
        let provider = FileProvider::new(Arc::new(fs), "content");
        let store = MemoryStore::new();
        let a = NodeId::new("a.md");

        let mut first = FingerprintCheck::new();
        first.is_modified(&provider, &store, &a).unwrap();
        first.commit(&store, &BTreeSet::from([a.clone()])).unwrap();

        let mut second = FingerprintCheck::new();
        assert!(second.is_modified(&provider, &store, &a).unwrap());
    }

    #[test]
    fn missing_resource_is_not_modified() {
        let provider = FileProvider::new(Arc::new(MockFileSystem::new()), "content");
        let store = MemoryStore::new();
        let mut check = FingerprintCheck::new();
        assert!(!check.is_modified(&provider, &store, &NodeId::new("ghost.md")).unwrap());
    }
}
