// src/resource/provider.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use tracing::debug;

use crate::dag::NodeId;
use crate::fs::FileSystem;

/// Read access to the resources a build works from.
///
/// The engine itself never interprets resources; it only hands the provider
/// to build units and to the modification check.
pub trait ResourceProvider: Send + Sync {
    /// Whether `id` is backed by an actual resource. Group is ignored.
    fn exists(&self, id: &NodeId) -> bool;

    fn read(&self, id: &NodeId) -> Result<Vec<u8>>;

    /// All resources, as ungrouped ids in ascending order.
    fn enumerate(&self) -> Result<Vec<NodeId>>;
}

/// Resources are the files below `root`.
///
/// The listing is computed once and reused for the lifetime of the provider,
/// which matches the one-provider-per-run usage of the engine.
#[derive(Debug)]
pub struct FileProvider {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    listing: OnceLock<Vec<NodeId>>,
}

impl FileProvider {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
            listing: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, id: &NodeId) -> PathBuf {
        self.root.join(id.path())
    }

    fn walk(&self) -> Result<Vec<NodeId>> {
        let mut found = Vec::new();
        let mut stack = vec![self.root.clone()];

        while let Some(dir) = stack.pop() {
            for path in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&path) {
                    stack.push(path);
                } else if self.fs.is_file(&path) {
                    if let Ok(rel) = path.strip_prefix(&self.root) {
                        found.push(NodeId::new(rel.to_string_lossy()));
                    }
                }
            }
        }

        found.sort();
        debug!(root = ?self.root, count = found.len(), "enumerated resources");
        Ok(found)
    }
}

impl ResourceProvider for FileProvider {
    fn exists(&self, id: &NodeId) -> bool {
        self.fs.is_file(&self.path_of(id))
    }

    fn read(&self, id: &NodeId) -> Result<Vec<u8>> {
        self.fs
            .read(&self.path_of(id))
            .with_context(|| format!("reading resource {id}"))
    }

    fn enumerate(&self) -> Result<Vec<NodeId>> {
        if let Some(listing) = self.listing.get() {
            return Ok(listing.clone());
        }
        let listing = self.walk()?;
        let _ = self.listing.set(listing.clone());
        Ok(listing)
    }
}
