// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Document types for evaluated enve configs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::evaluate::ConfigEvaluator;

#[cfg(test)]
#[path = "./spec_test.rs"]
mod spec_test;

/// Key some configs wrap the document in.
const DOCUMENT_ROOT_KEY: &str = "Enve";

/// Identity of an environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocumentId {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A single declared variable.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    /// Name of the variable, before prefixing and alias scoping.
    pub name: String,

    /// Values, joined with `delimiter` when there is more than one.
    pub values: Vec<String>,

    /// Relative values are resolved against the owning base path.
    #[serde(default)]
    pub values_are_paths: bool,

    /// Separator used for joining values and for appending to an existing
    /// variable. Empty means later definitions replace earlier ones.
    #[serde(default)]
    pub delimiter: String,

    /// Prefix the first value written with the delimiter.
    #[serde(default)]
    pub delimit_first: bool,

    /// Additional unprefixed variables that receive the value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<String>,

    /// Also contribute to the aggregate `ENVE_PATH` variable.
    #[serde(default)]
    pub path_export: bool,
}

/// How the installed commit of an extension is checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommitPin {
    /// No pin was given.
    #[default]
    Unpinned,
    /// Whatever the remote currently offers.
    Latest,
    /// Keep the installed commit, whatever it is.
    CurrentInstalled,
    /// An exact commit, matched by prefix.
    Commit(String),
}

impl CommitPin {
    pub const LATEST: &'static str = "latest";
    pub const CURRENT_INSTALLED: &'static str = "current_installed";

    /// The explicit commit this pin requires, if any.
    pub fn commit(&self) -> Option<&str> {
        match self {
            Self::Commit(commit) => Some(commit),
            _ => None,
        }
    }
}

impl From<String> for CommitPin {
    fn from(value: String) -> Self {
        match value.trim() {
            "" => Self::Unpinned,
            Self::LATEST => Self::Latest,
            Self::CURRENT_INSTALLED => Self::CurrentInstalled,
            commit => Self::Commit(commit.to_string()),
        }
    }
}

impl From<CommitPin> for String {
    fn from(value: CommitPin) -> Self {
        match value {
            CommitPin::Unpinned => String::new(),
            CommitPin::Latest => CommitPin::LATEST.to_string(),
            CommitPin::CurrentInstalled => CommitPin::CURRENT_INSTALLED.to_string(),
            CommitPin::Commit(commit) => commit,
        }
    }
}

impl<'de> Deserialize<'de> for CommitPin {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?
            .map(Self::from)
            .unwrap_or_default())
    }
}

impl Serialize for CommitPin {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&String::from(self.clone()))
    }
}

/// An external, separately installed dependency of the environment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExtensionSpec {
    pub id: String,

    /// Package reference handed to the package manager.
    #[serde(rename = "flatpak")]
    pub flatpak_ref: String,

    /// Remote the extension must come from. Empty accepts any remote.
    #[serde(default, rename = "remote_name")]
    pub remote_source: String,

    #[serde(default, rename = "commit")]
    pub commit_pin: CommitPin,

    /// Namespace for the extension's variables.
    #[serde(default)]
    pub id_alias: String,

    /// Where the extension is mounted; relative path values resolve here.
    #[serde(default, rename = "path")]
    pub install_path: PathBuf,

    /// Proxy URL used while installing or updating this extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_env: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableSpec>,
}

impl ExtensionSpec {
    /// The remote this extension is pinned to, if any.
    pub fn remote(&self) -> Option<&str> {
        Some(self.remote_source.as_str()).filter(|r| !r.is_empty())
    }

    /// The alias used to scope this extension's variables, if any.
    pub fn alias(&self) -> Option<&str> {
        Some(self.id_alias.as_str()).filter(|a| !a.is_empty())
    }
}

/// Root of an evaluated enve config.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnveDocument {
    pub id: DocumentId,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionSpec>,

    /// The launcher's own base extension, always loaded first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_extension_version: Option<ExtensionSpec>,

    /// Path to the file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl EnveDocument {
    /// Build a document from the evaluator's JSON output.
    ///
    /// A document wrapped in a single top-level `Enve` key is unwrapped.
    pub fn from_value(value: serde_json::Value, path: &Path) -> crate::Result<Self> {
        let value = match value {
            serde_json::Value::Object(mut map)
                if map.len() == 1 && map.contains_key(DOCUMENT_ROOT_KEY) =>
            {
                map.remove(DOCUMENT_ROOT_KEY).unwrap_or_default()
            }
            other => other,
        };

        let mut document: Self =
            serde_json::from_value(value).map_err(|error| crate::Error::InvalidDocument {
                path: path.to_path_buf(),
                error,
            })?;
        document.source_path = Some(path.to_path_buf());
        document.validate()?;
        Ok(document)
    }

    /// Evaluate and load the document at `path`.
    pub async fn load(path: &Path, evaluator: &dyn ConfigEvaluator) -> crate::Result<Self> {
        let value = evaluator.evaluate(path).await?;
        Self::from_value(value, path)
    }

    /// Validate invariants serde cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        let path = self.source_path.clone().unwrap_or_default();
        let invalid = |msg: String| crate::Error::InvalidConfig {
            path: path.clone(),
            diagnostic: msg,
        };

        if self.id.name.trim().is_empty() {
            return Err(invalid("id.name must not be empty".to_string()));
        }

        let extension_vars = self.extensions_in_load_order().flat_map(|e| &e.variables);
        for variable in self.variables.iter().chain(extension_vars) {
            if variable.name.is_empty() {
                return Err(invalid("variable name must not be empty".to_string()));
            }
            if variable.values.is_empty() {
                return Err(invalid(format!(
                    "variable {} must have at least one value",
                    variable.name
                )));
            }
        }

        for extension in self.extensions_in_load_order() {
            if extension.flatpak_ref.is_empty() {
                return Err(invalid(format!(
                    "extension {} has an empty flatpak reference",
                    extension.id
                )));
            }
        }

        Ok(())
    }

    /// Directory the config was loaded from, used to resolve relative paths.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source_path.as_deref().and_then(Path::parent)
    }

    /// Declared extensions with the base extension prepended.
    pub fn extensions_in_load_order(&self) -> impl DoubleEndedIterator<Item = &ExtensionSpec> {
        self.base_extension_version
            .iter()
            .chain(self.extensions.iter())
    }

    /// Id of the base extension, which gets special recovery treatment.
    pub fn base_extension_id(&self) -> Option<&str> {
        self.base_extension_version.as_ref().map(|e| e.id.as_str())
    }
}
