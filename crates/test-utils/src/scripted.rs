//! Fake build units and modification checks with scripted behaviour.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use sitedag::dag::NodeId;
use sitedag::resource::{ModificationCheck, ResourceProvider};
use sitedag::store::Store;
use sitedag::unit::{
    Artifact, BuildContext, BuildUnit, Registration, UnitFailure, UnitFuture, UnitOutput,
};

/// Shared, ordered record of the nodes a set of units executed.
pub type ExecLog = Arc<Mutex<Vec<NodeId>>>;

pub fn exec_log() -> ExecLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn executed(log: &ExecLog) -> Vec<NodeId> {
    log.lock().unwrap().clone()
}

#[derive(Debug, Clone)]
pub enum Script {
    /// Artifact is `built <id>`.
    Echo,
    Fixed(Vec<u8>),
    Fail(String),
    /// Register these nodes.
    Generate(Vec<Registration>),
}

/// Build unit with fixed dependencies that records every execution.
#[derive(Debug, Clone)]
pub struct ScriptedUnit {
    deps: BTreeSet<NodeId>,
    script: Script,
    always_run: bool,
    log: ExecLog,
}

impl ScriptedUnit {
    pub fn echo(log: &ExecLog) -> Self {
        Self {
            deps: BTreeSet::new(),
            script: Script::Echo,
            always_run: false,
            log: log.clone(),
        }
    }

    pub fn failing(log: &ExecLog, message: &str) -> Self {
        Self {
            script: Script::Fail(message.to_string()),
            ..Self::echo(log)
        }
    }

    pub fn fixed(log: &ExecLog, bytes: &[u8]) -> Self {
        Self {
            script: Script::Fixed(bytes.to_vec()),
            ..Self::echo(log)
        }
    }

    pub fn generating(log: &ExecLog, regs: Vec<Registration>) -> Self {
        Self {
            script: Script::Generate(regs),
            always_run: true,
            ..Self::echo(log)
        }
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.deps.extend(ids.iter().map(|s| NodeId::new(s)));
        self
    }

    pub fn arc(self) -> Arc<dyn BuildUnit> {
        Arc::new(self)
    }

    pub fn register(self, id: &str) -> Registration {
        Registration::new(NodeId::new(id), self.arc())
    }
}

impl BuildUnit for ScriptedUnit {
    fn kind(&self) -> &'static str {
        "scripted"
    }

    fn dependencies(
        &self,
        _id: &NodeId,
        _provider: &dyn ResourceProvider,
    ) -> anyhow::Result<BTreeSet<NodeId>> {
        Ok(self.deps.clone())
    }

    fn always_run(&self) -> bool {
        self.always_run
    }

    fn execute<'a>(&'a self, ctx: BuildContext<'a>) -> UnitFuture<'a> {
        Box::pin(async move {
            self.log.lock().unwrap().push(ctx.id.clone());
            match &self.script {
                Script::Echo => Ok(UnitOutput::Artifact(Artifact::from(format!("built {}", ctx.id)))),
                Script::Fixed(bytes) => Ok(UnitOutput::Artifact(Artifact::from(bytes.clone()))),
                Script::Fail(message) => Err(UnitFailure::Invalid(message.clone())),
                Script::Generate(regs) => Ok(UnitOutput::Generated(regs.clone())),
            }
        })
    }
}

/// Modification check answering from a fixed set and recording commits.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCheck {
    modified: BTreeSet<NodeId>,
    committed: Arc<Mutex<Vec<BTreeSet<NodeId>>>>,
}

impl ScriptedCheck {
    pub fn modified(ids: &[&str]) -> Self {
        Self {
            modified: ids.iter().map(|s| NodeId::new(s)).collect(),
            committed: Arc::default(),
        }
    }

    /// `skip` set passed to each commit, in order.
    pub fn commits(&self) -> Vec<BTreeSet<NodeId>> {
        self.committed.lock().unwrap().clone()
    }
}

impl ModificationCheck for ScriptedCheck {
    fn is_modified(
        &mut self,
        _provider: &dyn ResourceProvider,
        _store: &dyn Store,
        id: &NodeId,
    ) -> anyhow::Result<bool> {
        Ok(self.modified.contains(id))
    }

    fn commit(&mut self, _store: &dyn Store, skip: &BTreeSet<NodeId>) -> anyhow::Result<()> {
        self.committed.lock().unwrap().push(skip.clone());
        Ok(())
    }
}
