// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{RuleKind, StoreMode};

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// provider_directory = "content"
/// destination_directory = "_site"
///
/// [rule.pages]
/// match = ["pages/*.md"]
/// kind = "command"
/// cmd = "pandoc -f markdown -t html"
/// after = ["templates/*.html"]
/// route = "extension:html"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All rules from `[rule.<name>]`, keyed by rule name.
    #[serde(default)]
    pub rule: BTreeMap<String, RuleConfig>,
}

/// Validated configuration. Obtain one through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub rule: BTreeMap<String, RuleConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, rule: BTreeMap<String, RuleConfig>) -> Self {
        Self { config, rule }
    }
}

/// `[config]` section. Relative paths resolve against the config file's
/// directory.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    #[serde(default = "default_provider_directory")]
    pub provider_directory: PathBuf,

    #[serde(default = "default_destination_directory")]
    pub destination_directory: PathBuf,

    #[serde(default = "default_store_directory")]
    pub store_directory: PathBuf,

    /// `"file"` (default) keeps state between runs; `"memory"` forgets it.
    #[serde(default)]
    pub store_mode: StoreMode,
}

fn default_provider_directory() -> PathBuf {
    PathBuf::from("content")
}

fn default_destination_directory() -> PathBuf {
    PathBuf::from("_site")
}

fn default_store_directory() -> PathBuf {
    PathBuf::from(".sitedag")
}

fn default_route() -> String {
    "identity".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            provider_directory: default_provider_directory(),
            destination_directory: default_destination_directory(),
            store_directory: default_store_directory(),
            store_mode: StoreMode::default(),
        }
    }
}

/// `[rule.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// Resource globs this rule claims.
    #[serde(rename = "match", default)]
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub kind: RuleKind,

    /// Shell command for `kind = "command"`.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Every resource matching these globs becomes a dependency.
    #[serde(default)]
    pub after: Vec<String>,

    /// `none`, `identity`, `extension:<ext>` or `constant:<path>`.
    #[serde(default = "default_route")]
    pub route: String,

    /// For `kind = "manifest"`: the rule whose unit and route build each
    /// listed resource.
    #[serde(default)]
    pub emit: Option<String>,
}
