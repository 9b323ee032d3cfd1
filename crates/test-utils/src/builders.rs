#![allow(dead_code)]

use std::collections::BTreeMap;

use sitedag::config::{ConfigFile, ConfigSection, RawConfigFile, RuleConfig};
use sitedag::types::{RuleKind, StoreMode};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                rule: BTreeMap::new(),
            },
        }
    }

    pub fn with_rule(mut self, name: &str, rule: RuleConfig) -> Self {
        self.config.rule.insert(name.to_string(), rule);
        self
    }

    pub fn with_store_mode(mut self, mode: StoreMode) -> Self {
        self.config.config.store_mode = mode;
        self
    }

    pub fn with_directories(mut self, provider: &str, destination: &str, store: &str) -> Self {
        self.config.config.provider_directory = provider.into();
        self.config.config.destination_directory = destination.into();
        self.config.config.store_directory = store.into();
        self
    }

    /// Unvalidated config, for exercising validation errors.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RuleConfig`.
pub struct RuleConfigBuilder {
    rule: RuleConfig,
}

impl RuleConfigBuilder {
    pub fn copy(pattern: &str) -> Self {
        Self {
            rule: RuleConfig {
                patterns: vec![pattern.to_string()],
                exclude: vec![],
                kind: RuleKind::Copy,
                cmd: None,
                after: vec![],
                route: "identity".to_string(),
                emit: None,
            },
        }
    }

    pub fn command(pattern: &str, cmd: &str) -> Self {
        let mut builder = Self::copy(pattern);
        builder.rule.kind = RuleKind::Command;
        builder.rule.cmd = Some(cmd.to_string());
        builder
    }

    pub fn manifest(pattern: &str, emit: &str) -> Self {
        let mut builder = Self::copy(pattern);
        builder.rule.kind = RuleKind::Manifest;
        builder.rule.emit = Some(emit.to_string());
        builder.rule.route = "none".to_string();
        builder
    }

    pub fn after(mut self, pattern: &str) -> Self {
        self.rule.after.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.rule.exclude.push(pattern.to_string());
        self
    }

    pub fn route(mut self, route: &str) -> Self {
        self.rule.route = route.to_string();
        self
    }

    pub fn build(self) -> RuleConfig {
        self.rule
    }
}
