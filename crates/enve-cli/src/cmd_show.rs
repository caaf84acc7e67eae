// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Printing a launch plan for `--dry-run`.

use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use enve::{Activation, LaunchPlan};

/// Print `plan` as a table, yaml or json.
pub fn show_plan(plan: &LaunchPlan, format: &str) -> Result<()> {
    match format {
        "yaml" => show_yaml(plan),
        "json" => show_json(plan),
        _ => {
            show_table(plan);
            Ok(())
        }
    }
}

fn show_table(plan: &LaunchPlan) {
    match &plan.context {
        Some(context) => {
            println!("{}", "Config:".bold());
            println!("  {}", context.config_path.display().to_string().cyan());
            println!("  {}", context.fingerprint.to_string().dimmed());
            println!();

            let decision = match context.activation {
                Activation::InPlace => context.activation.to_string().green(),
                Activation::Reentrant(_) => context.activation.to_string().yellow(),
            };
            println!("{} {}", "Activation:".bold(), decision);
            println!("{} {}", "Shell depth:".bold(), context.shell_depth);
        }
        None => {
            println!("{}", "No config found, reusing the active environment".yellow());
        }
    }
    println!();

    println!("{}", "Extensions:".bold());
    if plan.reconcile.skipped {
        println!("  {}", "(unchanged config, not checked)".dimmed());
    } else if plan.reconcile.changed_extensions.is_empty() {
        println!("  {}", "(up to date)".dimmed());
    } else {
        for id in &plan.reconcile.changed_extensions {
            println!("  - {} {}", id.cyan(), "would change".yellow());
        }
    }

    if let Some(context) = &plan.context {
        println!();
        println!("{}", "Variables:".bold());
        if context.variables.is_empty() {
            println!("  {}", "(no variables)".dimmed());
        }
        for (name, value) in &context.variables {
            println!("  {} = {}", name.cyan(), value.green());
        }
        println!();
        println!("Total: {} variable(s)", context.variables.len());
    }

    println!();
    println!("{}", "Command:".bold());
    println!("  {}", plan.invocation);
    if let Some(shell) = &plan.debug_shell {
        println!("  {} {}", "then debug shell:".dimmed(), shell);
    }
    if plan.detached {
        println!("  {}", "(detached)".dimmed());
    }
}

fn show_yaml(plan: &LaunchPlan) -> Result<()> {
    print!("{}", serde_yaml::to_string(plan).into_diagnostic()?);
    Ok(())
}

fn show_json(plan: &LaunchPlan) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(plan).into_diagnostic()?);
    Ok(())
}
