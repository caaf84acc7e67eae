// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Launcher options given as `--option NAME VALUE` pairs.
//!
//! Every option remembers whether it was passed explicitly. Only explicit
//! options are forwarded when the launcher re-enters itself, so defaults of
//! the outer launcher never mask the environment of the inner one.

use std::str::FromStr;

use serde::Serialize;

#[cfg(test)]
#[path = "./options_test.rs"]
mod options_test;

pub const USE_CONFIG: &str = "use-config";
pub const USE_VERBOSE: &str = "use-verbose";
pub const USE_DEBUG_SHELL: &str = "use-debug-shell";
pub const USE_BASIC_PROMPT: &str = "use-basic-prompt";
pub const USE_DETACHED: &str = "use-detached";
pub const USE_FORCE_UPDATE: &str = "use-force-update";

/// Every option name, in forwarding order.
pub const OPTION_NAMES: [&str; 6] = [
    USE_CONFIG,
    USE_VERBOSE,
    USE_DEBUG_SHELL,
    USE_BASIC_PROMPT,
    USE_DETACHED,
    USE_FORCE_UPDATE,
];

/// A value along with whether the user provided it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenanced<T> {
    pub value: T,
    pub explicit: bool,
}

impl<T> Provenanced<T> {
    pub fn implicit(value: T) -> Self {
        Self {
            value,
            explicit: false,
        }
    }

    pub fn explicit(value: T) -> Self {
        Self {
            value,
            explicit: true,
        }
    }
}

/// Log level requested through `use-verbose`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Debug,
    Info,
    #[default]
    Warning,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            _ => Err("expected one of debug, info, warning".to_string()),
        }
    }
}

/// All launcher options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnveOptions {
    /// Config path, or `base` for the base config.
    pub config: Provenanced<String>,
    pub verbose: Provenanced<Verbosity>,
    /// Drop into a shell in the environment after the command.
    pub debug_shell: Provenanced<bool>,
    /// Prompt without powerline glyphs.
    pub basic_prompt: Provenanced<bool>,
    /// Start applications without waiting for them.
    pub detached: Provenanced<bool>,
    pub force_update: Provenanced<bool>,
}

impl EnveOptions {
    /// Build options from `NAME VALUE` pairs; a later pair overrides an
    /// earlier one with the same name.
    pub fn from_pairs<I, K, V>(pairs: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .try_fold(Self::default(), |options, (name, value)| {
                options.with(name.as_ref(), value.as_ref())
            })
    }

    /// A copy with a single option explicitly set.
    pub fn with(self, name: &str, value: &str) -> crate::Result<Self> {
        let invalid = |reason: String| crate::Error::InvalidOption {
            name: name.to_string(),
            value: value.to_string(),
            reason,
        };

        let options = match name {
            USE_CONFIG => Self {
                config: Provenanced::explicit(value.to_string()),
                ..self
            },
            USE_VERBOSE => Self {
                verbose: Provenanced::explicit(value.parse().map_err(invalid)?),
                ..self
            },
            USE_DEBUG_SHELL => Self {
                debug_shell: Provenanced::explicit(parse_bool(value).map_err(invalid)?),
                ..self
            },
            USE_BASIC_PROMPT => Self {
                basic_prompt: Provenanced::explicit(parse_bool(value).map_err(invalid)?),
                ..self
            },
            USE_DETACHED => Self {
                detached: Provenanced::explicit(parse_bool(value).map_err(invalid)?),
                ..self
            },
            USE_FORCE_UPDATE => Self {
                force_update: Provenanced::explicit(parse_bool(value).map_err(invalid)?),
                ..self
            },
            _ => {
                return Err(invalid(format!(
                    "unknown option, expected one of: {}",
                    OPTION_NAMES.join(", ")
                )));
            }
        };
        Ok(options)
    }

    /// The config option, when one was given.
    pub fn config_path(&self) -> Option<&str> {
        Some(self.config.value.as_str()).filter(|c| !c.trim().is_empty())
    }

    /// Explicitly passed options as `NAME VALUE` pairs, for forwarding.
    pub fn explicit_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.config.explicit {
            pairs.push((USE_CONFIG, self.config.value.clone()));
        }
        if self.verbose.explicit {
            pairs.push((USE_VERBOSE, self.verbose.value.to_string()));
        }
        let flags = [
            (USE_DEBUG_SHELL, &self.debug_shell),
            (USE_BASIC_PROMPT, &self.basic_prompt),
            (USE_DETACHED, &self.detached),
            (USE_FORCE_UPDATE, &self.force_update),
        ];
        for (name, flag) in flags {
            if flag.explicit {
                pairs.push((name, flag.value.to_string()));
            }
        }
        pairs
    }
}

/// Parse a boolean option value.
pub fn parse_bool(value: &str) -> std::result::Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "no" | "n" | "off" => Ok(false),
        _ => Err("expected a boolean (1/0, true/false, yes/no, y/n, on/off)".to_string()),
    }
}
