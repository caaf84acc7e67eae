// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery algorithm for finding the active enve config.

use std::path::{Path, PathBuf};

use crate::{BASE_CONFIG_ALIAS, ENVE_FILENAME};

#[cfg(test)]
#[path = "./discovery_test.rs"]
mod discovery_test;

/// Where a config path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--option use-config <path>`.
    Explicit,
    /// The built-in base config, requested by name or accepted as fallback.
    Base,
    /// Taken from `ENVE_CONFIG`.
    Environment,
    /// Found by walking up from the working directory.
    Search,
}

/// An absolute, canonical config path and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedConfig {
    pub path: PathBuf,
    pub source: ConfigSource,
}

/// Locate the active config.
///
/// The first match wins:
/// 1. `explicit`, where `base` selects `base_config`
/// 2. `env_value` (from `ENVE_CONFIG`)
/// 3. the closest `enve.jsonnet` in `cwd` or any of its parents
///
/// Relative paths are taken relative to `cwd`, which should be absolute.
/// Returns `Ok(None)` when nothing was found; the caller decides how to fall
/// back. An explicit or environment path that does not exist is an error.
pub fn locate_config(
    explicit: Option<&str>,
    env_value: Option<&str>,
    cwd: &Path,
    base_config: &Path,
) -> crate::Result<Option<LocatedConfig>> {
    if let Some(explicit) = explicit.filter(|p| !p.is_empty()) {
        if explicit.eq_ignore_ascii_case(BASE_CONFIG_ALIAS) {
            return base_config_at(base_config).map(Some);
        }
        return existing(&cwd.join(explicit), ConfigSource::Explicit).map(Some);
    }

    if let Some(from_env) = env_value.filter(|p| !p.is_empty()) {
        return existing(&cwd.join(from_env), ConfigSource::Environment).map(Some);
    }

    match search_upwards(cwd) {
        Some(path) => existing(&path, ConfigSource::Search).map(Some),
        None => Ok(None),
    }
}

/// The built-in base config, which must exist.
pub fn base_config_at(base_config: &Path) -> crate::Result<LocatedConfig> {
    existing(base_config, ConfigSource::Base)
}

/// Walk from `start` towards the root looking for the config filename.
fn search_upwards(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(ENVE_FILENAME);
        if candidate.is_file() {
            tracing::debug!("found config at {}", candidate.display());
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn existing(path: &Path, source: ConfigSource) -> crate::Result<LocatedConfig> {
    if !path.is_file() {
        return Err(crate::Error::ConfigNotFoundAtPath(path.to_path_buf()));
    }
    let path = dunce::canonicalize(path).map_err(|error| crate::Error::ReadFailed {
        path: path.to_path_buf(),
        error,
    })?;
    Ok(LocatedConfig { path, source })
}
