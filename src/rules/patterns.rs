// src/rules/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::dag::NodeId;
use crate::resource::ResourceProvider;

/// Compiled include/exclude glob patterns.
///
/// Patterns are relative to the provider root and are matched against
/// [`NodeId::path`] (forward slashes), e.g. `"posts/2024/hello.md"`.
#[derive(Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = build_globset(include).context("building include globset")?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("building exclude globset")?)
        };

        Ok(Self {
            patterns: include.to_vec(),
            include: include_set,
            exclude: exclude_set,
        })
    }

    /// Include patterns as written in the config.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Every resource the provider knows about that matches, in ascending order.
    pub fn matching_resources(&self, provider: &dyn ResourceProvider) -> Result<Vec<NodeId>> {
        Ok(provider
            .enumerate()?
            .into_iter()
            .filter(|id| self.matches(id.path()))
            .collect())
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exclude_wins_over_include() {
        let set = PatternSet::new(&strings(&["posts/**/*.md"]), &strings(&["**/draft-*"])).unwrap();
        assert!(set.matches("posts/2024/hello.md"));
        assert!(!set.matches("posts/draft-wip.md"));
        assert!(!set.matches("pages/about.md"));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        assert!(PatternSet::new(&strings(&["posts/[.md"]), &[]).is_err());
    }
}
