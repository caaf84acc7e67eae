// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Content fingerprints of config files.
//!
//! A launcher records the fingerprint of the config it verified in
//! `ENVE_CONFIG_HASH`. Descendant launchers that load a config with the same
//! fingerprint trust that record and skip extension reconciliation. Nothing
//! binds the recorded value to the actual install state, so a stale or forged
//! value is accepted as-is.

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::EnvSnapshot;

#[cfg(test)]
#[path = "./fingerprint_test.rs"]
mod fingerprint_test;

/// Hex encoded sha256 of a config file's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of_bytes(content: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(content)))
    }

    pub fn of_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read(path).map_err(|error| crate::Error::ReadFailed {
            path: path.to_path_buf(),
            error,
        })?;
        Ok(Self::of_bytes(&content))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when an ancestor already verified a config with this content.
    pub fn matches_recorded(&self, env: &EnvSnapshot) -> bool {
        env.recorded_fingerprint() == Some(self.as_str())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
