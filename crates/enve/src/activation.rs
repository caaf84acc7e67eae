// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Deciding where an environment is activated, and building the command
//! that re-enters the launcher when it cannot be activated in place.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::options::{EnveOptions, USE_DETACHED};
use crate::package::AppMetadata;
use crate::runtime::Invocation;
use crate::settings::Settings;
use crate::{
    ENVE_CONFIG_HASH_VAR,
    ENVE_CONFIG_VAR,
    ENVE_SESSION_VAR,
    ENVE_SHELL_DEPTH_VAR,
    EnvSnapshot,
    Fingerprint,
    TERM_VAR,
};

#[cfg(test)]
#[path = "./activation_test.rs"]
mod activation_test;

/// Sandbox permissions granted to applications run in an environment.
const APPLICATION_GRANTS: [&str; 6] = [
    "--filesystem=host",
    "--socket=session-bus",
    "--allow=devel",
    "--allow=multiarch",
    "--share=network",
    "--device=all",
];

/// Why the launcher has to run itself again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryReason {
    /// The command is an application with its own runtime.
    ManagedApplication,
    /// An environment is already active in this process tree.
    ActiveSession,
    /// Extensions were installed or changed and are not yet visible.
    ExtensionsChanged,
}

impl std::fmt::Display for ReentryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ManagedApplication => f.write_str("managed application"),
            Self::ActiveSession => f.write_str("active session"),
            Self::ExtensionsChanged => f.write_str("extensions changed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "reason")]
pub enum Activation {
    /// Run the command directly with the resolved variables.
    InPlace,
    Reentrant(ReentryReason),
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InPlace => f.write_str("in place"),
            Self::Reentrant(reason) => write!(f, "re-enter ({reason})"),
        }
    }
}

/// Facts the activation decision is based on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivationInputs {
    pub in_active_session: bool,
    pub extensions_changed: bool,
    pub managed_application: bool,
}

/// Activate in place only when nothing forces a fresh context.
pub fn decide(inputs: &ActivationInputs) -> Activation {
    if inputs.managed_application {
        Activation::Reentrant(ReentryReason::ManagedApplication)
    } else if inputs.in_active_session {
        Activation::Reentrant(ReentryReason::ActiveSession)
    } else if inputs.extensions_changed {
        Activation::Reentrant(ReentryReason::ExtensionsChanged)
    } else {
        Activation::InPlace
    }
}

/// Everything known about one activation. Built once, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationContext {
    pub config_path: PathBuf,
    pub fingerprint: Fingerprint,
    /// Depth inherited from the parent launcher.
    pub shell_depth: u32,
    pub activation: Activation,
    /// Final variable mapping.
    pub variables: IndexMap<String, String>,
}

impl ActivationContext {
    /// Environment of a command run in place.
    pub fn child_env(&self, inherited: &EnvSnapshot) -> EnvSnapshot {
        let depth = self.shell_depth.to_string();
        inherited
            .overlaid(self.variables.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .overlaid([
                (ENVE_SHELL_DEPTH_VAR, depth.as_str()),
                (ENVE_CONFIG_HASH_VAR, self.fingerprint.as_str()),
            ])
    }

    /// Environment forwarded into a re-entered launcher.
    fn forwarded_env(&self, inherited: &EnvSnapshot) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(term) = inherited.term() {
            env.push((TERM_VAR.to_string(), term.to_string()));
        }
        env.push((
            ENVE_SHELL_DEPTH_VAR.to_string(),
            (self.shell_depth + 1).to_string(),
        ));
        env.push((
            ENVE_CONFIG_VAR.to_string(),
            self.config_path.display().to_string(),
        ));
        env.push((
            ENVE_CONFIG_HASH_VAR.to_string(),
            self.fingerprint.to_string(),
        ));
        env
    }
}

/// Where the re-entered launcher runs.
#[derive(Debug, Clone, Copy)]
pub enum ReentryTarget<'a> {
    /// A fresh instance of the launcher's own sandbox.
    Shell,
    /// The runtime of an installed application.
    Application {
        app_id: &'a str,
        metadata: &'a AppMetadata,
    },
}

/// The user facing request being re-entered.
#[derive(Debug, Clone, Copy)]
pub struct ReentryRequest<'a> {
    pub target: ReentryTarget<'a>,
    pub options: &'a EnveOptions,
    /// Command and arguments to run inside the new context.
    pub command: &'a [String],
    pub cwd: &'a Path,
    /// Process the spawned context dies with, unless detached.
    pub parent_pid: u32,
    pub detached: bool,
}

/// Build the single invocation that runs the launcher again.
///
/// Only explicitly passed options are forwarded, and the session marker is
/// cleared so the new launcher starts from a clean activation.
pub fn reentry_invocation(
    context: &ActivationContext,
    request: &ReentryRequest<'_>,
    inherited: &EnvSnapshot,
    settings: &Settings,
) -> Invocation {
    let env = context.forwarded_env(inherited);
    let launcher = settings.launcher().display().to_string();

    let mut args = Vec::new();
    let mut command: Vec<String> = request.command.to_vec();
    match request.target {
        ReentryTarget::Shell => {
            args.extend(env.iter().map(|(k, v)| format!("--env={k}={v}")));
            args.push(format!("--unset-env={ENVE_SESSION_VAR}"));
            args.push(format!("--directory={}", request.cwd.display()));
            args.push(launcher);
        }
        ReentryTarget::Application { app_id, metadata } => {
            args.extend(["--host", "--watch-bus", "flatpak", "run"].map(String::from));
            args.push(format!("--command={launcher}"));
            if let Some(runtime) = metadata.launch_runtime() {
                args.push(format!("--runtime={runtime}"));
            }
            args.extend(APPLICATION_GRANTS.map(String::from));
            if !request.detached {
                args.push(format!("--parent-pid={}", request.parent_pid));
                args.push("--die-with-parent".to_string());
            }
            args.extend(env.iter().map(|(k, v)| format!("--env={k}={v}")));
            args.push(format!("--unset-env={ENVE_SESSION_VAR}"));
            args.push(app_id.to_string());

            // the app id is replaced by the command the application runs
            command = std::iter::once(metadata.command.clone())
                .chain(request.command.iter().skip(1).cloned())
                .collect();
        }
    }

    for (name, value) in request.options.explicit_pairs() {
        if name == USE_DETACHED {
            continue;
        }
        args.extend(["--option".to_string(), name.to_string(), value]);
    }
    args.push("--".to_string());
    args.extend(command);

    Invocation::new(settings.flatpak_spawn.display().to_string(), args)
        .with_env(inherited.clone())
}
