// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Activating an environment and running a command in it.

use clap::Args;
use miette::{IntoDiagnostic, Result};

use enve::{
    Collaborators,
    EnvSnapshot,
    EnveOptions,
    FlatpakHost,
    HostSandbox,
    JsonnetEvaluator,
    LaunchRequest,
    Launcher,
    Settings,
    TerminalConfirm,
};

/// Activate the environment and run a command
#[derive(Debug, Args)]
pub struct CmdLoad {
    /// Set a launcher option (use-config, use-verbose, use-debug-shell,
    /// use-basic-prompt, use-detached, use-force-update)
    #[clap(
        long = "option",
        alias = "ENVE",
        num_args = 2,
        value_names = ["NAME", "VALUE"],
        action = clap::ArgAction::Append
    )]
    pub options: Vec<String>,

    /// Show what would be done without changing or running anything
    #[clap(long)]
    pub dry_run: bool,

    /// Dry run output format: table, yaml, json
    #[clap(long, default_value = "table", requires = "dry_run")]
    pub format: String,

    /// Command to run (default: sh)
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl CmdLoad {
    /// The `--option` pairs, in the order given.
    pub fn enve_options(&self) -> Result<EnveOptions> {
        let pairs = self
            .options
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()));
        Ok(EnveOptions::from_pairs(pairs)?)
    }

    pub async fn run(&mut self, options: EnveOptions) -> Result<i32> {
        let env = EnvSnapshot::from_process();
        let settings = Settings::load(&env)?;

        let evaluator = JsonnetEvaluator::new(&settings.jsonnet, settings.library_paths());
        let packages = FlatpakHost::new(&settings.flatpak_spawn, &env);
        let collaborators = Collaborators {
            evaluator: &evaluator,
            packages: &packages,
            sandbox: &HostSandbox,
            confirm: &TerminalConfirm,
        };
        let launcher = Launcher::new(&settings, collaborators, env);

        let request = LaunchRequest {
            command: std::mem::take(&mut self.command),
            options,
            cwd: std::env::current_dir().into_diagnostic()?,
            dry_run: self.dry_run,
        };

        if self.dry_run {
            let plan = launcher.prepare(&request).await?;
            crate::cmd_show::show_plan(&plan, &self.format)?;
            return Ok(0);
        }

        Ok(launcher.launch(&request).await?)
    }
}
