// src/store/mod.rs

//! Durable key-value store shared by the engine and build units.
//!
//! Entries are addressed by `(namespace, key)` and hold raw bytes. The engine
//! uses three namespaces: the persisted dependency graph, produced artifacts,
//! and resource fingerprints. Build units may read any of them through their
//! build context.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::fs::FileSystem;

/// Namespace holding the merged dependency graph of the last run.
pub const GRAPH_NAMESPACE: &str = "sitedag.graph";
/// The single key under [`GRAPH_NAMESPACE`].
pub const GRAPH_KEY: &str = "dependencies";
/// Namespace holding the last artifact produced per node (keyed by node id).
pub const ARTIFACT_NAMESPACE: &str = "sitedag.artifact";
/// Namespace holding committed resource fingerprints (keyed by node id).
pub const FINGERPRINT_NAMESPACE: &str = "sitedag.fingerprint";

/// Abstract byte store.
///
/// Implementations assume a single writer: one run of the tool at a time.
pub trait Store: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()>;
}

/// Stores every entry as one file:
///
/// `<root>/<namespace>/<blake3(key)>`
///
/// Keys are hashed so that node ids containing path separators map to flat,
/// portable file names.
#[derive(Debug, Clone)]
pub struct FileStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl FileStore {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        let name = blake3::hash(key.as_bytes()).to_hex().to_string();
        self.root.join(namespace).join(name)
    }
}

impl Store for FileStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(namespace, key);
        if !self.fs.is_file(&path) {
            return Ok(None);
        }
        let bytes = self
            .fs
            .read(&path)
            .with_context(|| format!("reading store entry {namespace}/{key}"))?;
        Ok(Some(bytes))
    }

    fn set(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let path = self.entry_path(namespace, key);
        if let Some(parent) = path.parent() {
            self.fs.create_dir_all(parent)?;
        }
        self.fs
            .write(&path, value)
            .with_context(|| format!("writing store entry {namespace}/{key}"))?;
        debug!(namespace, key, bytes = value.len(), "stored entry (file)");
        Ok(())
    }
}

/// Stores entries in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `namespace`.
    pub fn count(&self, namespace: &str) -> usize {
        match self.map.lock() {
            Ok(map) => map.keys().filter(|(ns, _)| ns == namespace).count(),
            Err(_) => 0,
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        let map = self.map.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(map.get(&(namespace.to_string(), key.to_string())).cloned())
    }

    fn set(&self, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let mut map = self.map.lock().map_err(|_| anyhow!("memory store lock poisoned"))?;
        map.insert((namespace.to_string(), key.to_string()), value.to_vec());
        debug!(namespace, key, bytes = value.len(), "stored entry (memory)");
        Ok(())
    }
}
