// src/dag/node.rs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one build unit.
///
/// A resource path (always with forward slashes) plus an optional group that
/// lets the same path be built more than once under different variants.
/// Ordering compares the path first, then the group, so that build order and
/// persisted graphs are stable across runs and platforms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<String>,
}

impl NodeId {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: normalize(path.as_ref()),
            group: None,
        }
    }

    pub fn with_group(path: impl AsRef<str>, group: impl Into<String>) -> Self {
        Self {
            path: normalize(path.as_ref()),
            group: Some(group.into()),
        }
    }

    /// Resource path relative to the provider root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches("./").to_string()
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}@{}", self.path, group),
            None => f.write_str(&self.path),
        }
    }
}

impl From<&str> for NodeId {
    fn from(path: &str) -> Self {
        NodeId::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_normalized() {
        assert_eq!(NodeId::new("./posts\\a.md").path(), "posts/a.md");
    }

    #[test]
    fn ungrouped_sorts_before_grouped_for_same_path() {
        let plain = NodeId::new("a.md");
        let grouped = NodeId::with_group("a.md", "tags");
        assert!(plain < grouped);
        assert!(grouped < NodeId::new("b.md"));
        assert_eq!(grouped.to_string(), "a.md@tags");
    }
}
