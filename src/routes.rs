// src/routes.rs

//! Mapping from a resolved node to where its artifact is written.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::dag::NodeId;
use crate::rules::patterns::PatternSet;

/// How one rule places its artifacts under the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Dependency-only: nothing is written.
    None,
    /// Same relative path as the resource.
    Identity,
    /// Same relative path, extension replaced.
    Extension(String),
    /// Always the given relative path.
    Constant(PathBuf),
}

impl Route {
    /// Relative destination for `id`, if any.
    pub fn apply(&self, id: &NodeId) -> Option<PathBuf> {
        match self {
            Route::None => None,
            Route::Identity => Some(PathBuf::from(id.path())),
            Route::Extension(ext) => Some(Path::new(id.path()).with_extension(ext)),
            Route::Constant(path) => Some(path.clone()),
        }
    }
}

impl FromStr for Route {
    type Err = String;

    /// `none`, `identity`, `extension:<ext>` or `constant:<path>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            None => match s.to_lowercase().as_str() {
                "none" => Ok(Route::None),
                "identity" => Ok(Route::Identity),
                other => Err(format!(
                    "invalid route: {other} (expected none, identity, extension:<ext> or constant:<path>)"
                )),
            },
            Some((kind, arg)) => {
                let arg = arg.trim();
                if arg.is_empty() {
                    return Err(format!("invalid route: {s} (missing argument)"));
                }
                match kind.trim().to_lowercase().as_str() {
                    "extension" => Ok(Route::Extension(arg.trim_start_matches('.').to_string())),
                    "constant" if is_contained(Path::new(arg)) => {
                        Ok(Route::Constant(PathBuf::from(arg)))
                    }
                    "constant" => Err(format!(
                        "invalid route: {s} (path must stay inside the destination directory)"
                    )),
                    other => Err(format!("invalid route kind: {other}")),
                }
            }
        }
    }
}

/// Which nodes a route applies to.
#[derive(Debug, Clone)]
enum Matcher {
    /// Ungrouped nodes whose path matches.
    Patterns(PatternSet),
    /// Every node in this group or in one of its `group:<scope>` subgroups.
    Group(String),
}

fn in_group(id: &NodeId, name: &str) -> bool {
    id.group().is_some_and(|group| {
        group == name || group.strip_prefix(name).is_some_and(|rest| rest.starts_with(':'))
    })
}

/// Whether `rel` stays inside the directory it is joined onto.
pub fn is_contained(rel: &Path) -> bool {
    rel.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Routing function for a whole run: first matching entry wins.
#[derive(Debug, Clone, Default)]
pub struct Routes {
    entries: Vec<(Matcher, Route)>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route ungrouped nodes matching `patterns`.
    pub fn add_patterns(&mut self, patterns: PatternSet, route: Route) {
        self.entries.push((Matcher::Patterns(patterns), route));
    }

    /// Route every node in `group`, including its scoped subgroups.
    pub fn add_group(&mut self, group: impl Into<String>, route: Route) {
        self.entries.push((Matcher::Group(group.into()), route));
    }

    /// Destination of `id` relative to the output directory, or `None` when
    /// the node only exists for others to depend on.
    pub fn route(&self, id: &NodeId) -> Option<PathBuf> {
        self.entries
            .iter()
            .find(|(matcher, _)| match matcher {
                Matcher::Patterns(set) => id.group().is_none() && set.matches(id.path()),
                Matcher::Group(group) => in_group(id, group),
            })
            .and_then(|(_, route)| route.apply(id))
    }
}
