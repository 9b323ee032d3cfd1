// src/unit/command.rs

//! Shell command unit.

use std::collections::BTreeSet;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::dag::NodeId;
use crate::resource::ResourceProvider;
use crate::unit::{BuildContext, BuildUnit, DeclaredDeps, UnitFailure, UnitFuture, UnitOutput};

/// Pipes the resource through `sh -c <cmd>` and keeps stdout as the artifact.
///
/// The child sees:
/// - `SITEDAG_NODE`: the node id being built.
/// - `SITEDAG_DEPS`: its dependency ids, one per line.
/// - `SITEDAG_MODIFIED`: `1` when the resource itself changed, else `0`.
///
/// A non-zero exit status is a unit failure carrying the captured stderr.
#[derive(Debug, Clone)]
pub struct CommandUnit {
    cmd: String,
    deps: DeclaredDeps,
}

impl CommandUnit {
    pub fn new(cmd: impl Into<String>, deps: DeclaredDeps) -> Self {
        Self {
            cmd: cmd.into(),
            deps,
        }
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    async fn run(&self, ctx: BuildContext<'_>) -> Result<UnitOutput, UnitFailure> {
        let input = ctx.read_resource()?;
        let deps = ctx
            .dependencies
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n");

        let mut cmd = self.shell();
        cmd.env("SITEDAG_NODE", ctx.id.to_string())
            .env("SITEDAG_DEPS", deps)
            .env("SITEDAG_MODIFIED", if ctx.modified { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(node = %ctx.id, cmd = %self.cmd, "starting command");

        let mut child = cmd.spawn().map_err(|source| UnitFailure::Spawn {
            cmd: self.cmd.clone(),
            source,
        })?;

        // Feed stdin concurrently so a child that writes before reading all of
        // its input cannot deadlock on a full pipe.
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                let res = stdin.write_all(&input).await;
                drop(stdin);
                res
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| UnitFailure::Spawn {
                cmd: self.cmd.clone(),
                source,
            })?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // Commands are free to ignore their input.
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => warn!(node = %ctx.id, error = %e, "writing command stdin"),
                Err(e) => warn!(node = %ctx.id, error = %e, "stdin writer task failed"),
            }
        }

        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        if !stderr.is_empty() {
            debug!(node = %ctx.id, "stderr: {}", stderr);
        }

        info!(
            node = %ctx.id,
            exit_code = code,
            success = output.status.success(),
            "command exited"
        );

        if !output.status.success() {
            return Err(UnitFailure::Command {
                cmd: self.cmd.clone(),
                code,
                stderr,
            });
        }

        Ok(UnitOutput::Artifact(output.stdout.into()))
    }
}

impl BuildUnit for CommandUnit {
    fn kind(&self) -> &'static str {
        "command"
    }

    fn dependencies(
        &self,
        id: &NodeId,
        provider: &dyn ResourceProvider,
    ) -> anyhow::Result<BTreeSet<NodeId>> {
        self.deps.resolve(id, provider)
    }

    fn execute<'a>(&'a self, ctx: BuildContext<'a>) -> UnitFuture<'a> {
        Box::pin(self.run(ctx))
    }
}
