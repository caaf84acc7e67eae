// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Running commands, directly or through the isolation mechanism.

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

use crate::EnvSnapshot;

#[cfg(test)]
#[path = "./runtime_test.rs"]
mod runtime_test;

/// Exit status reported for signals is offset by this value, like shells do.
const SIGNAL_EXIT_BASE: i32 = 128;

/// A fully described command to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,

    /// Complete environment of the child, or `None` to inherit ours.
    #[serde(skip)]
    pub env: Option<EnvSnapshot>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: None,
        }
    }

    pub fn with_env(self, env: EnvSnapshot) -> Self {
        Self {
            env: Some(env),
            ..self
        }
    }

    /// Program followed by its arguments.
    pub fn command_line(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(env) = &self.env {
            cmd.env_clear().envs(env.os_iter());
        }
        cmd
    }

    fn spawn_failed(&self, error: std::io::Error) -> crate::Error {
        crate::Error::SpawnFailed {
            program: self.program.clone(),
            error,
        }
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.command_line().join(" "))
    }
}

/// Runs the final command of an activation.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Run to completion with inherited stdio, returning the exit code.
    async fn run(&self, invocation: &Invocation) -> crate::Result<i32>;

    /// Start in a new process group and return without waiting.
    async fn spawn_detached(&self, invocation: &Invocation) -> crate::Result<()>;
}

/// Spawns invocations as child processes of the launcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSandbox;

#[async_trait]
impl Sandbox for HostSandbox {
    async fn run(&self, invocation: &Invocation) -> crate::Result<i32> {
        tracing::debug!("run: {invocation}");
        let status = invocation
            .command()
            .status()
            .await
            .map_err(|err| invocation.spawn_failed(err))?;
        Ok(exit_code(status))
    }

    async fn spawn_detached(&self, invocation: &Invocation) -> crate::Result<()> {
        tracing::debug!("spawn detached: {invocation}");
        let mut cmd = invocation.command();
        #[cfg(unix)]
        cmd.process_group(0);
        let child = cmd.spawn().map_err(|err| invocation.spawn_failed(err))?;
        tracing::info!(
            "started {} detached (pid {})",
            invocation.program,
            child.id().unwrap_or_default()
        );
        Ok(())
    }
}

/// Exit code of a finished process, `128 + N` when killed by signal `N`.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return SIGNAL_EXIT_BASE + signal;
        }
    }
    1
}
