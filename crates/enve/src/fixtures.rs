// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! In-memory collaborators for tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::confirm::Confirm;
use crate::error::Operation;
use crate::evaluate::ConfigEvaluator;
use crate::package::{AppMetadata, CommandOutcome, InstalledRef, PackageManager};
use crate::runtime::{Invocation, Sandbox};
use crate::spec::{CommitPin, ExtensionSpec, VariableSpec};

pub const DEFAULT_REMOTE: &str = "flathub";
pub const NEWEST_COMMIT: &str = "c0ffee00112233";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageCall {
    Installed(String),
    Install {
        reference: String,
        remote: Option<String>,
    },
    Update {
        reference: String,
        commit: Option<String>,
    },
    Remove(String),
    AppMetadata(String),
}

impl PackageCall {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Install { .. } | Self::Update { .. } | Self::Remove(_))
    }
}

/// Package manager backed by a map of installed references.
#[derive(Debug, Default)]
pub struct FakePackages {
    installed: Mutex<HashMap<String, InstalledRef>>,
    apps: HashMap<String, AppMetadata>,
    failing: HashSet<(String, Operation)>,
    calls: Mutex<Vec<PackageCall>>,
}

impl FakePackages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installed(self, reference: &str, origin: &str, commit: &str) -> Self {
        self.installed.lock().unwrap().insert(
            reference.to_string(),
            InstalledRef {
                origin: origin.to_string(),
                commit: commit.to_string(),
            },
        );
        self
    }

    pub fn with_app(mut self, app_id: &str, command: &str, sdk: &str) -> Self {
        self.apps.insert(
            app_id.to_string(),
            AppMetadata {
                command: command.to_string(),
                runtime: None,
                sdk: Some(sdk.to_string()),
            },
        );
        self
    }

    pub fn failing(mut self, reference: &str, operation: Operation) -> Self {
        self.failing.insert((reference.to_string(), operation));
        self
    }

    pub fn calls(&self) -> Vec<PackageCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<PackageCall> {
        self.calls().into_iter().filter(PackageCall::is_mutation).collect()
    }

    pub fn installed_ref(&self, reference: &str) -> Option<InstalledRef> {
        self.installed.lock().unwrap().get(reference).cloned()
    }

    fn record(&self, call: PackageCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn outcome(&self, reference: &str, operation: Operation) -> Option<CommandOutcome> {
        if self.failing.contains(&(reference.to_string(), operation)) {
            return Some(CommandOutcome {
                code: Some(1),
                stdout: String::new(),
                stderr: format!("error: {operation} of {reference} failed"),
            });
        }
        None
    }

    fn ok() -> CommandOutcome {
        CommandOutcome {
            code: Some(0),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PackageManager for FakePackages {
    async fn installed(&self, reference: &str) -> crate::Result<Option<InstalledRef>> {
        self.record(PackageCall::Installed(reference.to_string()));
        Ok(self.installed_ref(reference))
    }

    async fn install(
        &self,
        extension: &ExtensionSpec,
        remote: Option<&str>,
    ) -> crate::Result<CommandOutcome> {
        let reference = extension.flatpak_ref.as_str();
        self.record(PackageCall::Install {
            reference: reference.to_string(),
            remote: remote.map(String::from),
        });
        if let Some(failed) = self.outcome(reference, Operation::Install) {
            return Ok(failed);
        }
        self.installed.lock().unwrap().insert(
            reference.to_string(),
            InstalledRef {
                origin: remote.unwrap_or(DEFAULT_REMOTE).to_string(),
                commit: NEWEST_COMMIT.to_string(),
            },
        );
        Ok(Self::ok())
    }

    async fn update(
        &self,
        extension: &ExtensionSpec,
        commit: Option<&str>,
    ) -> crate::Result<CommandOutcome> {
        let reference = extension.flatpak_ref.as_str();
        self.record(PackageCall::Update {
            reference: reference.to_string(),
            commit: commit.map(String::from),
        });
        if let Some(failed) = self.outcome(reference, Operation::Update) {
            return Ok(failed);
        }
        if let Some(installed) = self.installed.lock().unwrap().get_mut(reference) {
            installed.commit = commit.unwrap_or(NEWEST_COMMIT).to_string();
        }
        Ok(Self::ok())
    }

    async fn remove(&self, extension: &ExtensionSpec) -> crate::Result<CommandOutcome> {
        let reference = extension.flatpak_ref.as_str();
        self.record(PackageCall::Remove(reference.to_string()));
        if let Some(failed) = self.outcome(reference, Operation::Remove) {
            return Ok(failed);
        }
        self.installed.lock().unwrap().remove(reference);
        Ok(Self::ok())
    }

    async fn app_metadata(&self, app_id: &str) -> crate::Result<Option<AppMetadata>> {
        self.record(PackageCall::AppMetadata(app_id.to_string()));
        Ok(self.apps.get(app_id).cloned())
    }
}

/// Sandbox that records invocations instead of running them.
#[derive(Debug, Default)]
pub struct FakeSandbox {
    pub exit_code: i32,
    runs: Mutex<Vec<Invocation>>,
    detached: Mutex<Vec<Invocation>>,
}

impl FakeSandbox {
    pub fn exiting_with(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Default::default()
        }
    }

    pub fn runs(&self) -> Vec<Invocation> {
        self.runs.lock().unwrap().clone()
    }

    pub fn detached(&self) -> Vec<Invocation> {
        self.detached.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn run(&self, invocation: &Invocation) -> crate::Result<i32> {
        self.runs.lock().unwrap().push(invocation.clone());
        Ok(self.exit_code)
    }

    async fn spawn_detached(&self, invocation: &Invocation) -> crate::Result<()> {
        self.detached.lock().unwrap().push(invocation.clone());
        Ok(())
    }
}

/// Evaluator returning a fixed document regardless of the path.
#[derive(Debug, Clone)]
pub struct FakeEvaluator(pub serde_json::Value);

#[async_trait]
impl ConfigEvaluator for FakeEvaluator {
    async fn evaluate(&self, _path: &Path) -> crate::Result<serde_json::Value> {
        Ok(self.0.clone())
    }
}

/// Confirmation with a fixed answer, or the default when none is set.
#[derive(Debug, Default)]
pub struct FakeConfirm {
    answer: Option<bool>,
    asked: Mutex<Vec<String>>,
}

impl FakeConfirm {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: Some(answer),
            ..Default::default()
        }
    }

    /// Answers every question with its default, like a run without a
    /// terminal.
    pub fn non_interactive() -> Self {
        Self::default()
    }

    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Confirm for FakeConfirm {
    fn confirm(&self, message: &str, default: bool) -> crate::Result<bool> {
        self.asked.lock().unwrap().push(message.to_string());
        Ok(self.answer.unwrap_or(default))
    }
}

pub fn extension(id: &str, pin: &str) -> ExtensionSpec {
    ExtensionSpec {
        id: id.to_string(),
        flatpak_ref: format!("dev.enve.Extension.{id}"),
        remote_source: String::new(),
        commit_pin: CommitPin::from(pin.to_string()),
        id_alias: id.to_string(),
        install_path: format!("/usr/lib/sdk/{id}").into(),
        proxy_env: None,
        variables: Vec::new(),
    }
}

pub fn variable(name: &str, value: &str, delimiter: &str) -> VariableSpec {
    VariableSpec {
        name: name.to_string(),
        values: vec![value.to_string()],
        values_are_paths: false,
        delimiter: delimiter.to_string(),
        delimit_first: false,
        exports: Vec::new(),
        path_export: false,
    }
}
