// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! enve - Environment Activation Launcher
//!
//! This crate provides the core library for activating development
//! environments described by an `enve.jsonnet` config, then running a command
//! inside them.
//!
//! # Overview
//!
//! Activating an environment:
//!
//! 1. locates the config (explicit path, `ENVE_CONFIG`, or the closest
//!    `enve.jsonnet` above the working directory),
//! 2. evaluates it and composes its variables into `ENVE_*` names,
//! 3. installs, repairs and updates the extensions it declares,
//! 4. decides whether the command can run right here or the launcher has to
//!    re-enter itself in a fresh sandbox, and runs it.
//!
//! # Example
//!
//! ```jsonnet
//! // enve.jsonnet
//! {
//!   id: { name: 'my-project', version: '1.2' },
//!   variables: [
//!     { name: 'home_dir', values: ['bin'], values_are_paths: true, delimiter: '' },
//!   ],
//!   extensions: [
//!     {
//!       id: 'gcc',
//!       flatpak: 'org.freedesktop.Sdk.Extension.gcc//23.08',
//!       commit: 'latest',
//!       id_alias: 'gcc',
//!       path: '/usr/lib/sdk/gcc',
//!       variables: [
//!         { name: 'bin', values: ['bin'], values_are_paths: true,
//!           delimiter: ':', exports: ['PATH'] },
//!       ],
//!     },
//!   ],
//! }
//! ```

pub mod activation;
pub mod compose;
pub mod confirm;
pub mod discovery;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod evaluate;
pub mod fingerprint;
pub mod launcher;
pub mod options;
pub mod package;
pub mod reconcile;
pub mod runtime;
pub mod settings;
pub mod spec;

#[cfg(test)]
mod fixtures;

pub use activation::{Activation, ActivationContext, ReentryReason};
pub use compose::{compose_variables, ComposedEnvironment};
pub use confirm::{Confirm, TerminalConfirm};
pub use discovery::{locate_config, ConfigSource, LocatedConfig};
pub use dispatch::CommandKind;
pub use environment::EnvSnapshot;
pub use error::{Error, Operation, Result};
pub use evaluate::{ConfigEvaluator, JsonnetEvaluator};
pub use fingerprint::Fingerprint;
pub use launcher::{Collaborators, LaunchPlan, LaunchRequest, Launcher};
pub use options::{EnveOptions, Provenanced, Verbosity};
pub use package::{FlatpakHost, PackageManager};
pub use reconcile::{ReconcileOptions, ReconcileReport, Reconciler};
pub use runtime::{HostSandbox, Invocation, Sandbox};
pub use settings::Settings;
pub use spec::{CommitPin, EnveDocument, ExtensionSpec, VariableSpec};

/// Well-known filename for enve configs.
pub const ENVE_FILENAME: &str = "enve.jsonnet";

/// Config path that selects the launcher's base config.
pub const BASE_CONFIG_ALIAS: &str = "base";

/// Command run when none is given.
pub const DEFAULT_COMMAND: &str = "sh";

/// Prefix of every variable enve defines, apart from raw exports.
pub const ENVE_VAR_PREFIX: &str = "ENVE_";

/// Aggregate of all path variables marked for export.
pub const ENVE_PATH_VAR: &str = "ENVE_PATH";

/// Interactive shell prompt.
pub const ENVE_PROMPT_VAR: &str = "ENVE_PROMPT";

/// Name of the active environment.
pub const ENVE_ID_VAR: &str = "ENVE_ID";

/// Version of the active environment.
pub const ENVE_ID_VER_VAR: &str = "ENVE_ID_VER";

/// Present whenever an environment is active.
pub const ENVE_SESSION_VAR: &str = ENVE_ID_VAR;

/// Config path override.
pub const ENVE_CONFIG_VAR: &str = "ENVE_CONFIG";

/// How many launchers deep the current process is.
pub const ENVE_SHELL_DEPTH_VAR: &str = "ENVE_SHELL_DEPTH";

/// Fingerprint of the config an ancestor launcher verified.
pub const ENVE_CONFIG_HASH_VAR: &str = "ENVE_CONFIG_HASH";

/// Launcher settings file override.
pub const ENVE_SETTINGS_VAR: &str = "ENVE_SETTINGS";

pub const TERM_VAR: &str = "TERM";

/// Id of the sandboxed application the process runs in.
pub const FLATPAK_ID_VAR: &str = "FLATPAK_ID";
