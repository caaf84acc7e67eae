// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Evaluation of config files into JSON documents.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

#[cfg(test)]
#[path = "./evaluate_test.rs"]
mod evaluate_test;

/// Turns a config file into its evaluated JSON value.
#[async_trait]
pub trait ConfigEvaluator: Send + Sync {
    async fn evaluate(&self, path: &Path) -> crate::Result<serde_json::Value>;
}

/// Evaluates jsonnet configs with the `jsonnet` command line tool.
///
/// Plain `.json` files are read directly without spawning anything.
#[derive(Debug, Clone)]
pub struct JsonnetEvaluator {
    binary: PathBuf,
    library_paths: Vec<PathBuf>,
}

impl JsonnetEvaluator {
    pub fn new(binary: impl Into<PathBuf>, library_paths: Vec<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            library_paths,
        }
    }

    /// Arguments passed to the jsonnet binary for `path`.
    pub fn args(&self, path: &Path) -> Vec<String> {
        let mut args = Vec::with_capacity(self.library_paths.len() * 2 + 1);
        for lib in &self.library_paths {
            args.push("--jpath".to_string());
            args.push(lib.display().to_string());
        }
        args.push(path.display().to_string());
        args
    }
}

#[async_trait]
impl ConfigEvaluator for JsonnetEvaluator {
    async fn evaluate(&self, path: &Path) -> crate::Result<serde_json::Value> {
        let invalid = |diagnostic: String| crate::Error::InvalidConfig {
            path: path.to_path_buf(),
            diagnostic,
        };

        if path.extension().is_some_and(|ext| ext == "json") {
            let content =
                std::fs::read_to_string(path).map_err(|error| crate::Error::ReadFailed {
                    path: path.to_path_buf(),
                    error,
                })?;
            return serde_json::from_str(&content).map_err(|e| invalid(e.to_string()));
        }

        tracing::debug!(config = %path.display(), "evaluating config with {}", self.binary.display());
        let output = Command::new(&self.binary)
            .args(self.args(path))
            .output()
            .await
            .map_err(|error| crate::Error::SpawnFailed {
                program: self.binary.display().to_string(),
                error,
            })?;

        if !output.status.success() {
            return Err(invalid(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| invalid(e.to_string()))
    }
}
