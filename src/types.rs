// src/types.rs

use serde::Deserialize;

/// Where the durable store keeps its entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// One file per entry under `[config].store_directory`.
    #[default]
    File,
    /// In memory only; every run is a full build.
    Memory,
}

/// What a rule does with each resource it claims.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Artifact is the resource itself.
    #[default]
    Copy,
    /// Artifact is the stdout of a shell command fed the resource on stdin.
    Command,
    /// Resource lists further resources to register mid-run.
    Manifest,
}
