// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Tell managed applications apart from plain commands.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::confirm::Confirm;
use crate::package::{AppMetadata, PackageManager};
use crate::runtime::Invocation;
use crate::EnvSnapshot;

#[cfg(test)]
#[path = "./dispatch_test.rs"]
mod dispatch_test;

/// Reverse-DNS application ids, like `org.example.Editor`.
static APP_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+\.\w+\.\w+").expect("valid regex"));

/// What the requested command turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// An installed application, run inside its own runtime.
    Managed {
        app_id: String,
        metadata: AppMetadata,
    },
    Plain,
}

impl CommandKind {
    pub fn is_managed(&self) -> bool {
        matches!(self, Self::Managed { .. })
    }
}

/// True when `program` has the shape of an application id.
pub fn looks_like_application(program: &str) -> bool {
    APP_ID.is_match(program)
}

/// Classify `cmd`, asking the user when it looks like an application that
/// is not installed.
pub async fn classify(
    cmd: &[String],
    packages: &dyn PackageManager,
    confirm: &dyn Confirm,
) -> crate::Result<CommandKind> {
    let Some(program) = cmd.first() else {
        return Ok(CommandKind::Plain);
    };
    if !looks_like_application(program) {
        return Ok(CommandKind::Plain);
    }

    if let Some(metadata) = packages.app_metadata(program).await? {
        tracing::debug!("{program} is an application running {:?}", metadata.command);
        return Ok(CommandKind::Managed {
            app_id: program.clone(),
            metadata,
        });
    }

    tracing::warn!("command {program:?} looks like an application but none is installed");
    if confirm.confirm(&format!("Treat {program:?} as a regular command?"), false)? {
        Ok(CommandKind::Plain)
    } else {
        Err(crate::Error::AmbiguousCommand(program.clone()))
    }
}

/// Invocation of a plain command with a complete environment, through
/// `wrapper` when one is configured.
pub fn plain_invocation(cmd: &[String], wrapper: Option<&Path>, env: EnvSnapshot) -> Invocation {
    let (program, args) = match (wrapper, cmd.split_first()) {
        (Some(wrapper), _) => (wrapper.display().to_string(), cmd.to_vec()),
        (None, Some((program, args))) => (program.clone(), args.to_vec()),
        (None, None) => (crate::DEFAULT_COMMAND.to_string(), Vec::new()),
    };
    Invocation::new(program, args).with_env(env)
}
