// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Snapshots of the process environment.
//!
//! The launcher reads the live environment exactly once. Everything after
//! that works on an [`EnvSnapshot`], and spawned children receive a fully
//! materialized snapshot instead of inheriting mutations of our own process.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

use crate::{
    ENVE_CONFIG_HASH_VAR,
    ENVE_CONFIG_VAR,
    ENVE_SESSION_VAR,
    ENVE_SHELL_DEPTH_VAR,
    TERM_VAR,
};

#[cfg(test)]
#[path = "./environment_test.rs"]
mod environment_test;

/// Suffix of proxy variables forwarded to network operations.
const PROXY_SUFFIX: &str = "_proxy";

/// An immutable-by-convention copy of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
    /// Variables that are not valid unicode, passed to children untouched.
    opaque: BTreeMap<OsString, OsString>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Build a snapshot from raw variables.
    ///
    /// Variables whose name or value are not valid unicode cannot be read
    /// or changed, but are still handed to children by [`Self::os_iter`].
    pub fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut snapshot = Self::default();
        for (name, value) in vars {
            if let (Some(name), Some(value)) = (name.to_str(), value.to_str()) {
                snapshot.vars.insert(name.to_string(), value.to_string());
                continue;
            }
            snapshot.opaque.insert(name, value);
        }
        snapshot
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Like [`Self::get`], but treats empty values as unset.
    pub fn get_non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.opaque.remove(OsStr::new(&name));
        self.vars.insert(name, value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.opaque.remove(OsStr::new(name));
        self.vars.remove(name)
    }

    /// The unicode variables.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Every variable, including the ones that are not valid unicode.
    pub fn os_iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.iter()
            .map(|(k, v)| (OsStr::new(k), OsStr::new(v)))
            .chain(self.opaque.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str())))
    }

    pub fn len(&self) -> usize {
        self.vars.len() + self.opaque.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.opaque.is_empty()
    }

    /// Return a copy with `vars` written over the top of this snapshot.
    pub fn overlaid<'a, I>(&self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut result = self.clone();
        for (name, value) in vars {
            result.set(name, value);
        }
        result
    }

    /// True when running inside an already activated enve environment.
    pub fn in_active_session(&self) -> bool {
        self.contains(ENVE_SESSION_VAR)
    }

    /// The nesting depth recorded by the parent launcher, or 0.
    pub fn shell_depth(&self) -> u32 {
        match self.get_non_empty(ENVE_SHELL_DEPTH_VAR) {
            None => 0,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid {ENVE_SHELL_DEPTH_VAR}={raw:?}");
                0
            }),
        }
    }

    /// Config fingerprint recorded by an ancestor launcher.
    pub fn recorded_fingerprint(&self) -> Option<&str> {
        self.get_non_empty(ENVE_CONFIG_HASH_VAR)
    }

    /// Config path override.
    pub fn config_override(&self) -> Option<&str> {
        self.get_non_empty(ENVE_CONFIG_VAR)
    }

    pub fn term(&self) -> Option<&str> {
        self.get_non_empty(TERM_VAR)
    }

    /// Proxy settings (`http_proxy`, `HTTPS_PROXY`, ...) in name order.
    pub fn proxy_vars(&self) -> Vec<(String, String)> {
        self.iter()
            .filter(|(name, _)| name.to_ascii_lowercase().ends_with(PROXY_SUFFIX))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for EnvSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            opaque: BTreeMap::new(),
        }
    }
}

/// Put `value` in front of `existing`, dropping segments of `existing` that
/// `value` already provides.
///
/// Keeps `PATH`-like variables from growing on every nested activation.
pub fn prepend_unique(value: &str, existing: &str, delimiter: &str) -> String {
    if delimiter.is_empty() {
        return value.to_string();
    }

    let provided: Vec<&str> = value.split(delimiter).filter(|s| !s.is_empty()).collect();
    let remaining: Vec<&str> = existing
        .split(delimiter)
        .filter(|s| !s.is_empty() && !provided.contains(s))
        .collect();

    if remaining.is_empty() {
        value.to_string()
    } else {
        format!("{value}{delimiter}{}", remaining.join(delimiter))
    }
}
