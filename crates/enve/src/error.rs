// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for enve operations.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Convenience Result type with enve Error.
pub type Result<T> = std::result::Result<T, Error>;

/// A mutating package operation performed on an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Install,
    Update,
    Remove,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install => f.write_str("install"),
            Self::Update => f.write_str("update"),
            Self::Remove => f.write_str("remove"),
        }
    }
}

/// Errors that can occur during enve operations.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// No config was found and the base environment was declined
    #[error("Unable to locate an enve config from {0:?}")]
    #[diagnostic(
        code(enve::config_not_found),
        help(
            "Create an enve.jsonnet file, set ENVE_CONFIG, or pass '--option use-config <path>'"
        )
    )]
    ConfigNotFound(PathBuf),

    /// Config path given explicitly does not exist
    #[error("enve config path does not exist: {0:?}")]
    #[diagnostic(code(enve::config_not_found_at_path))]
    ConfigNotFoundAtPath(PathBuf),

    /// The config evaluator rejected the document
    #[error("Failed to evaluate enve config {path:?}")]
    #[diagnostic(code(enve::invalid_config), help("{diagnostic}"))]
    InvalidConfig { path: PathBuf, diagnostic: String },

    /// The evaluated document does not match the expected schema
    #[error("Invalid enve document {path:?}: {error}")]
    #[diagnostic(
        code(enve::invalid_document),
        help("Check the 'id', 'variables' and 'extensions' fields of the config")
    )]
    InvalidDocument {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },

    /// One or more resolved variable names break the naming rules
    #[error("Invalid enve variable names: {}", names.join(", "))]
    #[diagnostic(
        code(enve::naming_violation),
        help("Resolved variables must be prefixed with 'ENVE_' unless listed as raw exports")
    )]
    NamingViolation { names: Vec<String> },

    /// A package operation for an extension failed
    #[error("{id} extension {operation} failed")]
    #[diagnostic(code(enve::extension_unavailable), help("{stderr}"))]
    ExtensionUnavailable {
        id: String,
        operation: Operation,
        stderr: String,
    },

    /// A destructive operation was requested while inside an active environment
    #[error("Refusing to {operation} the {id} extension from inside an active enve shell")]
    #[diagnostic(
        code(enve::unsafe_mutation),
        help("Exit the current enve shell and run the command again")
    )]
    UnsafeMutation { id: String, operation: Operation },

    /// Command looked like an application id but no such application exists
    #[error("Invalid command {0:?} received")]
    #[diagnostic(
        code(enve::ambiguous_command),
        help("The command looks like an application id but no such application is installed")
    )]
    AmbiguousCommand(String),

    /// Querying the package manager failed unexpectedly
    #[error("Unable to get info for {reference}")]
    #[diagnostic(code(enve::package_query_failed), help("{stderr}"))]
    PackageQueryFailed { reference: String, stderr: String },

    /// A `--option` name or value could not be understood
    #[error("--option {name} {value:?}: {reason}")]
    #[diagnostic(code(enve::invalid_option))]
    InvalidOption {
        name: String,
        value: String,
        reason: String,
    },

    /// Launcher settings could not be parsed
    #[error("Invalid launcher settings {path:?}: {error}")]
    #[diagnostic(code(enve::invalid_settings))]
    InvalidSettings {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(enve::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to start an external program
    #[error("Failed to run {program:?}")]
    #[diagnostic(code(enve::spawn_failed))]
    SpawnFailed {
        program: String,
        #[source]
        error: std::io::Error,
    },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(enve::io_error))]
    Io(#[from] std::io::Error),
}
