// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! The activation pipeline, from locating a config to running the command.

use std::path::PathBuf;

use serde::Serialize;

use crate::activation::{
    decide,
    reentry_invocation,
    Activation,
    ActivationContext,
    ActivationInputs,
    ReentryRequest,
    ReentryTarget,
};
use crate::compose::ComposedEnvironment;
use crate::confirm::Confirm;
use crate::discovery::{base_config_at, locate_config, LocatedConfig};
use crate::dispatch::{classify, plain_invocation, CommandKind};
use crate::evaluate::ConfigEvaluator;
use crate::options::EnveOptions;
use crate::package::PackageManager;
use crate::reconcile::{ReconcileOptions, ReconcileReport, Reconciler};
use crate::runtime::{Invocation, Sandbox};
use crate::settings::Settings;
use crate::spec::EnveDocument;
use crate::{EnvSnapshot, Fingerprint, DEFAULT_COMMAND, FLATPAK_ID_VAR};

#[cfg(test)]
#[path = "./launcher_test.rs"]
mod launcher_test;

/// External systems the pipeline talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub evaluator: &'a dyn ConfigEvaluator,
    pub packages: &'a dyn PackageManager,
    pub sandbox: &'a dyn Sandbox,
    pub confirm: &'a dyn Confirm,
}

/// One request to run a command in an environment.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Command and arguments, `sh` when empty.
    pub command: Vec<String>,
    pub options: EnveOptions,
    pub cwd: PathBuf,
    /// Only report what would be done.
    pub dry_run: bool,
}

/// Everything decided before anything is executed.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPlan {
    /// `None` when no config was found and the active environment is reused.
    pub context: Option<ActivationContext>,
    pub reconcile: ReconcileReport,
    pub invocation: Invocation,
    /// Shell to open after the command, in the same environment.
    pub debug_shell: Option<Invocation>,
    pub detached: bool,
}

/// Runs the activation pipeline over a snapshot of the environment.
pub struct Launcher<'a> {
    settings: &'a Settings,
    collaborators: Collaborators<'a>,
    env: EnvSnapshot,
    parent_pid: u32,
}

impl<'a> Launcher<'a> {
    pub fn new(settings: &'a Settings, collaborators: Collaborators<'a>, env: EnvSnapshot) -> Self {
        Self {
            settings,
            collaborators,
            env,
            parent_pid: std::process::id(),
        }
    }

    /// Prepare and execute a request, returning the command's exit code.
    pub async fn launch(&self, request: &LaunchRequest) -> crate::Result<i32> {
        let plan = self.prepare(request).await?;
        self.execute(&plan).await
    }

    /// Resolve the environment and decide how the command is run.
    pub async fn prepare(&self, request: &LaunchRequest) -> crate::Result<LaunchPlan> {
        let command = match request.command.as_slice() {
            [] => vec![DEFAULT_COMMAND.to_string()],
            command => command.to_vec(),
        };
        let options = &request.options;
        let wrapper = self.settings.command_wrapper.as_deref();

        let debug_shell = options.debug_shell.value;
        let detached = options.detached.value && !debug_shell;
        if options.detached.value && debug_shell {
            tracing::warn!("Cannot run detached when the debug shell is enabled, running attached");
        }

        let Some(located) = self.locate(request)? else {
            tracing::info!("No enve config found, using the active environment");
            let invocation = plain_invocation(&command, wrapper, self.env.clone());
            let debug_shell = debug_shell
                .then(|| plain_invocation(&[DEFAULT_COMMAND.to_string()], wrapper, self.env.clone()));
            return Ok(LaunchPlan {
                context: None,
                reconcile: ReconcileReport::default(),
                invocation,
                debug_shell,
                detached,
            });
        };
        tracing::debug!("Using enve config {} ({:?})", located.path.display(), located.source);

        let fingerprint = Fingerprint::of_file(&located.path)?;
        let document = EnveDocument::load(&located.path, self.collaborators.evaluator).await?;

        let mut composed = ComposedEnvironment::new();
        composed.add_variables(&document.variables, None, document.base_dir());
        composed.add_identity(&document.id);
        let foreign_app = self
            .env
            .get_non_empty(FLATPAK_ID_VAR)
            .filter(|id| *id != self.settings.app_id);
        composed.add_prompt(options.basic_prompt.value, foreign_app);

        // an ambiguous command must fail before any extension is touched
        let kind = classify(
            &command,
            self.collaborators.packages,
            self.collaborators.confirm,
        )
        .await?;

        let in_active_session = self.env.in_active_session();
        let reconciler = Reconciler::new(
            self.collaborators.packages,
            ReconcileOptions {
                force_update: options.force_update.value,
                in_active_session,
                base_extension_id: document.base_extension_id().map(String::from),
                dry_run: request.dry_run,
            },
        );
        let report = reconciler
            .reconcile_all(document.extensions_in_load_order(), &fingerprint, &self.env)
            .await?;

        for extension in document.extensions_in_load_order().rev() {
            composed.add_variables(
                &extension.variables,
                extension.alias(),
                Some(extension.install_path.as_path()),
            );
        }
        let variables = composed.finalize(&self.env)?;

        let activation = decide(&ActivationInputs {
            in_active_session,
            extensions_changed: report.changed,
            managed_application: kind.is_managed(),
        });
        tracing::info!("Activating {} {activation}", document.id.name);

        let context = ActivationContext {
            config_path: located.path,
            fingerprint,
            shell_depth: self.env.shell_depth(),
            activation,
            variables,
        };

        let (invocation, debug_shell) = match activation {
            Activation::InPlace => {
                let env = context.child_env(&self.env);
                let shell = debug_shell.then(|| {
                    plain_invocation(&[DEFAULT_COMMAND.to_string()], wrapper, env.clone())
                });
                (plain_invocation(&command, wrapper, env), shell)
            }
            // the re-entered launcher opens the debug shell itself
            Activation::Reentrant(_) => {
                let target = match &kind {
                    CommandKind::Managed { app_id, metadata } => {
                        ReentryTarget::Application { app_id, metadata }
                    }
                    CommandKind::Plain => ReentryTarget::Shell,
                };
                let reentry = ReentryRequest {
                    target,
                    options,
                    command: &command,
                    cwd: &request.cwd,
                    parent_pid: self.parent_pid,
                    detached,
                };
                let invocation = reentry_invocation(&context, &reentry, &self.env, self.settings);
                (invocation, None)
            }
        };

        Ok(LaunchPlan {
            context: Some(context),
            reconcile: report,
            invocation,
            debug_shell,
            detached,
        })
    }

    /// Run a prepared plan.
    pub async fn execute(&self, plan: &LaunchPlan) -> crate::Result<i32> {
        let sandbox = self.collaborators.sandbox;
        tracing::debug!("Exec command: {}", plan.invocation);

        if plan.detached {
            sandbox.spawn_detached(&plan.invocation).await?;
            return Ok(0);
        }

        let Some(shell) = &plan.debug_shell else {
            return sandbox.run(&plan.invocation).await;
        };

        let question = format!("Debug shell enabled. Run command {:?}?", plan.invocation.to_string());
        if self.collaborators.confirm.confirm(&question, false)? {
            let code = sandbox.run(&plan.invocation).await?;
            tracing::info!("Command exited with {code}, opening debug shell");
        }
        sandbox.run(shell).await
    }

    /// Find the config, falling back to the base config when the user
    /// agrees. `None` means the active environment should be reused.
    fn locate(&self, request: &LaunchRequest) -> crate::Result<Option<LocatedConfig>> {
        let base_config = self.settings.base_config();
        let located = locate_config(
            request.options.config_path(),
            self.env.config_override(),
            &request.cwd,
            &base_config,
        )?;
        if located.is_some() {
            return Ok(located);
        }

        if self.env.in_active_session() {
            return Ok(None);
        }
        let question = "No enve config found. Use the base environment?";
        if self.collaborators.confirm.confirm(question, true)? {
            return base_config_at(&base_config).map(Some);
        }
        Err(crate::Error::ConfigNotFound(request.cwd.clone()))
    }
}
