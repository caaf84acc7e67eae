// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Launcher installation settings.
//!
//! These describe where the launcher and its tools live, not the
//! environment being activated. Every field has a built-in default, so a
//! settings file only needs to name what differs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ENVE_SETTINGS_VAR;
use crate::EnvSnapshot;

#[cfg(test)]
#[path = "./settings_test.rs"]
mod settings_test;

/// Application id of the launcher itself.
pub const DEFAULT_APP_ID: &str = "dev.enve.sh";
/// Installation root of the launcher inside its sandbox.
pub const DEFAULT_ROOT: &str = "/usr/lib/sdk/enve";

const SETTINGS_DIR: &str = "enve";
const SETTINGS_FILE: &str = "settings.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub app_id: String,
    pub root: PathBuf,

    /// Config used for `base`, defaults to `<root>/etc/enve.jsonnet`.
    pub base_config: Option<PathBuf>,

    /// Jsonnet library search paths, defaults to `<root>/etc`.
    pub library_paths: Vec<PathBuf>,

    /// Launcher executable as seen from inside a sandbox, defaults to
    /// `<root>/bin/enve`.
    pub launcher: Option<PathBuf>,

    /// Script that plain commands are run through, when set.
    pub command_wrapper: Option<PathBuf>,

    pub flatpak_spawn: PathBuf,
    pub jsonnet: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            root: PathBuf::from(DEFAULT_ROOT),
            base_config: None,
            library_paths: Vec::new(),
            launcher: None,
            command_wrapper: None,
            flatpak_spawn: PathBuf::from("flatpak-spawn"),
            jsonnet: PathBuf::from("jsonnet"),
        }
    }
}

impl Settings {
    /// Load settings from `ENVE_SETTINGS` or the user config directory,
    /// falling back to the defaults when neither exists.
    pub fn load(env: &EnvSnapshot) -> crate::Result<Self> {
        if let Some(path) = env.get_non_empty(ENVE_SETTINGS_VAR) {
            return Self::load_file(Path::new(path));
        }
        match default_settings_path() {
            Some(path) if path.is_file() => Self::load_file(&path),
            _ => {
                tracing::debug!("no launcher settings found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_file(path: &Path) -> crate::Result<Self> {
        tracing::debug!("loading launcher settings from {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|error| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_yaml(&raw, path)
    }

    pub fn from_yaml(raw: &str, path: &Path) -> crate::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|error| crate::Error::InvalidSettings {
            path: path.to_path_buf(),
            error,
        })
    }

    pub fn etc_dir(&self) -> PathBuf {
        self.root.join("etc")
    }

    pub fn base_config(&self) -> PathBuf {
        self.base_config
            .clone()
            .unwrap_or_else(|| self.etc_dir().join(crate::ENVE_FILENAME))
    }

    pub fn library_paths(&self) -> Vec<PathBuf> {
        if self.library_paths.is_empty() {
            vec![self.etc_dir()]
        } else {
            self.library_paths.clone()
        }
    }

    pub fn launcher(&self) -> PathBuf {
        self.launcher
            .clone()
            .unwrap_or_else(|| self.root.join("bin").join("enve"))
    }
}

/// `<config dir>/enve/settings.yaml`, if the platform has a config dir.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
}
