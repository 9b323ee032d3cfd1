// src/rules/mod.rs

//! Rules turn configuration into the initial registrations of a run and the
//! routing function for its artifacts.
//!
//! Each resource is claimed by at most one rule: rules are tried in name
//! order and the first whose patterns match wins.

pub mod patterns;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::config::{ConfigFile, RuleConfig};
use crate::resource::ResourceProvider;
use crate::routes::{Route, Routes};
use crate::types::RuleKind;
use crate::unit::{BuildUnit, CommandUnit, CopyUnit, DeclaredDeps, ManifestUnit, Registration};

pub use patterns::PatternSet;

/// One compiled `[rule.<name>]`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub kind: RuleKind,
    pub patterns: PatternSet,
    pub route: Route,
    pub unit: Arc<dyn BuildUnit>,
    /// Rule building the nodes a manifest generates.
    pub emit: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut units: BTreeMap<&str, Arc<dyn BuildUnit>> = BTreeMap::new();

        // Manifests reference the unit of their `emit` rule, so plain rules
        // are compiled first.
        for (name, rule) in cfg.rule.iter().filter(|(_, r)| r.kind != RuleKind::Manifest) {
            let deps = declared_deps(name, rule)?;
            let unit: Arc<dyn BuildUnit> = match rule.kind {
                RuleKind::Copy => Arc::new(CopyUnit::new(deps)),
                RuleKind::Command => {
                    let cmd = rule
                        .cmd
                        .as_deref()
                        .ok_or_else(|| anyhow!("rule '{name}' has no `cmd`"))?;
                    Arc::new(CommandUnit::new(cmd, deps))
                }
                RuleKind::Manifest => continue,
            };
            units.insert(name.as_str(), unit);
        }

        for (name, rule) in cfg.rule.iter().filter(|(_, r)| r.kind == RuleKind::Manifest) {
            let target = rule
                .emit
                .as_deref()
                .ok_or_else(|| anyhow!("manifest rule '{name}' has no `emit`"))?;
            let emit = units
                .get(target)
                .cloned()
                .ok_or_else(|| anyhow!("manifest rule '{name}' emits unknown rule '{target}'"))?;
            let unit: Arc<dyn BuildUnit> =
                Arc::new(ManifestUnit::new(name.clone(), emit, declared_deps(name, rule)?));
            units.insert(name.as_str(), unit);
        }

        let mut rules = Vec::with_capacity(cfg.rule.len());
        for (name, rule) in cfg.rule.iter() {
            let unit = units
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| anyhow!("rule '{name}' was not compiled"))?;
            rules.push(Rule {
                name: name.clone(),
                kind: rule.kind,
                patterns: PatternSet::new(&rule.patterns, &rule.exclude)
                    .with_context(|| format!("rule '{name}': `match` patterns"))?,
                route: rule
                    .route
                    .parse()
                    .map_err(|e: String| anyhow!("rule '{name}': {e}"))?,
                unit,
                emit: rule.emit.clone(),
            });
        }

        Ok(Self { rules })
    }

    /// Rules in the order they are tried.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Rule claiming a resource path, if any.
    pub fn claim(&self, rel_path: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.patterns.matches(rel_path))
    }

    /// Initial registrations: every resource claimed by some rule, in
    /// ascending node order.
    pub fn registrations(&self, provider: &dyn ResourceProvider) -> Result<Vec<Registration>> {
        let mut regs = Vec::new();
        for id in provider.enumerate()? {
            match self.claim(id.path()) {
                Some(rule) => regs.push(Registration::new(id, rule.unit.clone())),
                None => debug!(resource = %id, "no rule claims resource"),
            }
        }
        Ok(regs)
    }

    /// Routing for every node this rule set can produce.
    ///
    /// Nodes generated by a manifest live in the manifest's group and are
    /// routed like the rule they are emitted as.
    pub fn routes(&self) -> Routes {
        let mut routes = Routes::new();
        for rule in &self.rules {
            routes.add_patterns(rule.patterns.clone(), rule.route.clone());
        }
        for rule in &self.rules {
            if let Some(target) = rule.emit.as_deref().and_then(|t| self.rule(t)) {
                routes.add_group(rule.name.clone(), target.route.clone());
            }
        }
        routes
    }
}

fn declared_deps(name: &str, rule: &RuleConfig) -> Result<DeclaredDeps> {
    if rule.after.is_empty() {
        return Ok(DeclaredDeps::none());
    }
    let after = PatternSet::new(&rule.after, &[])
        .with_context(|| format!("rule '{name}': `after` patterns"))?;
    Ok(DeclaredDeps::after(Some(Arc::new(after))))
}
