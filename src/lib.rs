// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod resource;
pub mod routes;
pub mod rules;
pub mod store;
pub mod types;
pub mod unit;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span, warn};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, ConfigSection};
use crate::dag::DepGraph;
use crate::engine::{BuildEnv, RunReport, Runtime};
use crate::fs::{FileSystem, RealFileSystem};
use crate::resource::{FileProvider, FingerprintCheck, ResourceProvider};
use crate::rules::RuleSet;
use crate::store::{FileStore, MemoryStore, Store};
use crate::types::StoreMode;

/// High-level entry point used by `main.rs`.
///
/// Returns `Ok(false)` when the command ran but the build is not clean
/// (failures, skipped nodes, cycles) or was interrupted.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;
    let paths = ProjectPaths::resolve(&cfg.config, &config_root_dir(&config_path));
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    match args.command {
        Command::Check => {
            print_check(&cfg, &paths, fs)?;
            Ok(true)
        }
        Command::Clean => {
            clean(&paths, fs.as_ref())?;
            Ok(true)
        }
        Command::Build | Command::Rebuild => {
            let full = args.command == Command::Rebuild;
            // Dropping the build future before `persist` leaves the previous
            // graph and fingerprints in place.
            let report = tokio::select! {
                res = build(&cfg, &paths, fs, full) => res?,
                _ = tokio::signal::ctrl_c() => {
                    warn!("interrupted; nothing persisted");
                    return Ok(false);
                }
            };
            print_report(&report);
            Ok(report.is_clean())
        }
    }
}

/// `[config]` directories, resolved against the config file's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub provider: PathBuf,
    pub destination: PathBuf,
    pub store: PathBuf,
}

impl ProjectPaths {
    pub fn resolve(section: &ConfigSection, root: &Path) -> Self {
        Self {
            provider: root.join(&section.provider_directory),
            destination: root.join(&section.destination_directory),
            store: root.join(&section.store_directory),
        }
    }
}

/// Run one build of `cfg` over `fs`.
///
/// With `full`, the previous dependency graph is ignored so every node is
/// scheduled.
pub async fn build(
    cfg: &ConfigFile,
    paths: &ProjectPaths,
    fs: Arc<dyn FileSystem>,
    full: bool,
) -> Result<RunReport> {
    let rules = RuleSet::from_config(cfg)?;
    let provider: Arc<dyn ResourceProvider> =
        Arc::new(FileProvider::new(fs.clone(), &paths.provider));
    let store = open_store(cfg.config.store_mode, fs.clone(), &paths.store);

    let previous = {
        let _span = info_span!("load").entered();
        if full {
            info!("full rebuild requested; ignoring previous dependency graph");
            DepGraph::empty()
        } else {
            Runtime::load_previous_graph(store.as_ref())?
        }
    };

    let initial = rules
        .registrations(provider.as_ref())
        .with_context(|| format!("enumerating resources under {}", paths.provider.display()))?;
    debug!(count = initial.len(), "initial registrations");

    let env = BuildEnv {
        provider,
        store,
        sink: fs,
        destination: paths.destination.clone(),
        routes: rules.routes(),
    };
    let runtime = Runtime::new(env, Box::new(FingerprintCheck::new()), previous);
    Ok(runtime.run(initial).await?)
}

fn open_store(mode: StoreMode, fs: Arc<dyn FileSystem>, root: &Path) -> Arc<dyn Store> {
    match mode {
        StoreMode::File => Arc::new(FileStore::new(fs, root)),
        StoreMode::Memory => Arc::new(MemoryStore::new()),
    }
}

/// Remove the destination and store directories, if present.
pub fn clean(paths: &ProjectPaths, fs: &dyn FileSystem) -> Result<()> {
    for dir in [&paths.destination, &paths.store] {
        if fs.is_dir(dir) {
            fs.remove_dir_all(dir)?;
            info!(dir = %dir.display(), "removed");
        } else {
            debug!(dir = %dir.display(), "nothing to remove");
        }
    }
    Ok(())
}

/// Directory relative `[config]` paths are resolved against.
///
/// - `configs/Sitedag.toml` resolves against `configs/`.
/// - A bare `Sitedag.toml` resolves against the current directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Dry run: print directories, rules and the nodes a build would register.
fn print_check(cfg: &ConfigFile, paths: &ProjectPaths, fs: Arc<dyn FileSystem>) -> Result<()> {
    let rules = RuleSet::from_config(cfg)?;
    let provider = FileProvider::new(fs, &paths.provider);
    let routes = rules.routes();

    println!("sitedag check");
    println!("  provider_directory    = {}", paths.provider.display());
    println!("  destination_directory = {}", paths.destination.display());
    println!("  store_directory       = {}", paths.store.display());
    println!("  store_mode            = {:?}", cfg.config.store_mode);
    println!();

    println!("rules ({}):", rules.rules().len());
    for rule in rules.rules() {
        println!("  - {} ({})", rule.name, rule.unit.kind());
        println!("      match: {:?}", rule.patterns.patterns());
        println!("      route: {:?}", rule.route);
        if let Some(cmd) = cfg.rule.get(&rule.name).and_then(|r| r.cmd.as_deref()) {
            println!("      cmd: {cmd}");
        }
        if let Some(emit) = rule.emit.as_deref() {
            println!("      emit: {emit}");
        }
    }
    println!();

    let regs = rules
        .registrations(&provider)
        .with_context(|| format!("enumerating resources under {}", paths.provider.display()))?;
    println!("nodes ({}):", regs.len());
    for reg in &regs {
        match routes.route(&reg.id) {
            Some(dest) => println!("  {} [{}] -> {}", reg.id, reg.unit.kind(), dest.display()),
            None => println!("  {} [{}]", reg.id, reg.unit.kind()),
        }
    }

    debug!("check complete (nothing built)");
    Ok(())
}

fn print_report(report: &RunReport) {
    println!(
        "sitedag: {} registered, {} built, {} written",
        report.registered,
        report.built.len(),
        report.written.len()
    );
    for (id, message) in &report.failed {
        println!("  failed   {id}: {message}");
    }
    for id in &report.degraded {
        println!("  skipped  {id}: a dependency did not build");
    }
    for cycle in &report.cycles {
        let members: Vec<String> = cycle.iter().map(|n| n.to_string()).collect();
        println!("  cycle    {}", members.join(" -> "));
    }
    for id in &report.stalled {
        println!("  stalled  {id}");
    }
}
