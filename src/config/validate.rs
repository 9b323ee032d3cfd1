// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, RuleConfig};
use crate::errors::{Result, SitedagError};
use crate::routes::Route;
use crate::rules::patterns::build_globset;
use crate::types::RuleKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SitedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.rule))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_rules(cfg)?;
    for (name, rule) in cfg.rule.iter() {
        validate_rule(name, rule)?;
        validate_emit(cfg, name, rule)?;
    }
    Ok(())
}

fn ensure_has_rules(cfg: &RawConfigFile) -> Result<()> {
    if cfg.rule.is_empty() {
        return Err(SitedagError::ConfigError(
            "config must contain at least one [rule.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_rule(name: &str, rule: &RuleConfig) -> Result<()> {
    if rule.patterns.is_empty() {
        return Err(SitedagError::ConfigError(format!(
            "rule '{name}' has an empty `match` list"
        )));
    }

    for (field, patterns) in [
        ("match", &rule.patterns),
        ("exclude", &rule.exclude),
        ("after", &rule.after),
    ] {
        build_globset(patterns).map_err(|e| {
            SitedagError::ConfigError(format!("rule '{name}': invalid `{field}` glob: {e:#}"))
        })?;
    }

    rule.route
        .parse::<Route>()
        .map_err(|e| SitedagError::ConfigError(format!("rule '{name}': {e}")))?;

    if rule.kind == RuleKind::Command {
        match rule.cmd.as_deref().map(str::trim) {
            Some(cmd) if !cmd.is_empty() => {}
            _ => {
                return Err(SitedagError::ConfigError(format!(
                    "rule '{name}' has kind = \"command\" but no `cmd`"
                )));
            }
        }
    }

    Ok(())
}

fn validate_emit(cfg: &RawConfigFile, name: &str, rule: &RuleConfig) -> Result<()> {
    match (rule.kind, rule.emit.as_deref()) {
        (RuleKind::Manifest, None) => Err(SitedagError::ConfigError(format!(
            "rule '{name}' has kind = \"manifest\" but no `emit`"
        ))),
        (RuleKind::Manifest, Some(target)) => match cfg.rule.get(target) {
            None => Err(SitedagError::ConfigError(format!(
                "rule '{name}' emits unknown rule '{target}'"
            ))),
            Some(t) if t.kind == RuleKind::Manifest => Err(SitedagError::ConfigError(format!(
                "rule '{name}' emits '{target}', which is itself a manifest rule"
            ))),
            Some(_) => Ok(()),
        },
        (_, Some(_)) => Err(SitedagError::ConfigError(format!(
            "rule '{name}' sets `emit` but is not a manifest rule"
        ))),
        (_, None) => Ok(()),
    }
}
