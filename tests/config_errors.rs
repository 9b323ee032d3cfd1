use std::fs;

use sitedag::config::{load_and_validate, ConfigFile};
use sitedag::errors::SitedagError;
use sitedag::types::{RuleKind, StoreMode};
use sitedag_test_utils::builders::{ConfigFileBuilder, RuleConfigBuilder};
use tempfile::TempDir;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Sitedag.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

fn config_error(raw: sitedag::config::RawConfigFile) -> String {
    match ConfigFile::try_from(raw) {
        Err(SitedagError::ConfigError(msg)) => msg,
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn loads_full_config_with_defaults() {
    let (_dir, path) = write_config(
        r#"
[config]
destination_directory = "public"

[rule.pages]
match = ["pages/*.md"]
kind = "command"
cmd = "cat"
after = ["templates/*.html"]
route = "extension:html"

[rule.feed]
match = ["feed.list"]
kind = "manifest"
emit = "pages"
"#,
    );

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.config.provider_directory, std::path::PathBuf::from("content"));
    assert_eq!(cfg.config.destination_directory, std::path::PathBuf::from("public"));
    assert_eq!(cfg.config.store_mode, StoreMode::File);

    let pages = &cfg.rule["pages"];
    assert_eq!(pages.kind, RuleKind::Command);
    assert_eq!(pages.patterns, vec!["pages/*.md".to_string()]);
    assert_eq!(cfg.rule["feed"].route, "identity");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, SitedagError::IoError(_)));
}

#[test]
fn malformed_toml_and_unknown_enum_values_are_toml_errors() {
    let (_dir, path) = write_config("[rule.a\nmatch = 1");
    assert!(matches!(load_and_validate(&path).unwrap_err(), SitedagError::TomlError(_)));

    let (_dir, path) = write_config("[config]\nstore_mode = \"cloud\"\n[rule.a]\nmatch = [\"*\"]\n");
    assert!(matches!(load_and_validate(&path).unwrap_err(), SitedagError::TomlError(_)));
}

#[test]
fn requires_at_least_one_rule() {
    let msg = config_error(ConfigFileBuilder::new().build_raw());
    assert!(msg.contains("at least one"), "{msg}");
}

#[test]
fn command_rules_need_a_command() {
    let mut rule = RuleConfigBuilder::copy("*.md").build();
    rule.kind = RuleKind::Command;
    let msg = config_error(ConfigFileBuilder::new().with_rule("md", rule).build_raw());
    assert!(msg.contains("cmd"), "{msg}");
}

#[test]
fn manifest_emit_must_name_a_plain_rule() {
    let missing = ConfigFileBuilder::new()
        .with_rule("feed", RuleConfigBuilder::manifest("feed.list", "ghost").build())
        .build_raw();
    assert!(config_error(missing).contains("unknown rule 'ghost'"));

    let nested = ConfigFileBuilder::new()
        .with_rule("a", RuleConfigBuilder::manifest("a.list", "b").build())
        .with_rule("b", RuleConfigBuilder::manifest("b.list", "a").build())
        .build_raw();
    assert!(config_error(nested).contains("manifest rule"));

    let stray = ConfigFileBuilder::new()
        .with_rule("a", RuleConfigBuilder::copy("*.md").build())
        .with_rule("b", {
            let mut rule = RuleConfigBuilder::copy("*.txt").build();
            rule.emit = Some("a".to_string());
            rule
        })
        .build_raw();
    assert!(config_error(stray).contains("not a manifest rule"));
}

#[test]
fn bad_routes_and_globs_are_rejected() {
    let route = ConfigFileBuilder::new()
        .with_rule("a", RuleConfigBuilder::copy("*.md").route("sideways").build())
        .build_raw();
    assert!(config_error(route).contains("invalid route"));

    let glob = ConfigFileBuilder::new()
        .with_rule("a", RuleConfigBuilder::copy("*.md").after("[oops").build())
        .build_raw();
    assert!(config_error(glob).contains("`after`"));
}
