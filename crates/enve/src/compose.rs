// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Composition of declared variables into a single environment mapping.

use std::path::Path;

use indexmap::IndexMap;

use crate::environment::prepend_unique;
use crate::spec::{DocumentId, VariableSpec};
use crate::{
    ENVE_ID_VAR,
    ENVE_ID_VER_VAR,
    ENVE_PATH_VAR,
    ENVE_PROMPT_VAR,
    ENVE_VAR_PREFIX,
    EnvSnapshot,
};

#[cfg(test)]
#[path = "./compose_test.rs"]
mod compose_test;


/// Variables composed from any number of [`VariableSpec`] lists.
///
/// Specs are applied in order; a later spec targeting an existing name
/// appends with its delimiter, or replaces the value when the delimiter is
/// empty.
#[derive(Debug, Clone, Default)]
pub struct ComposedEnvironment {
    values: IndexMap<String, String>,

    /// Unprefixed names and the delimiter last used to write them.
    raw_exports: IndexMap<String, String>,
}

/// Compose a single list of specs.
pub fn compose_variables(
    specs: &[VariableSpec],
    alias: Option<&str>,
    base_path: Option<&Path>,
) -> ComposedEnvironment {
    let mut composed = ComposedEnvironment::new();
    composed.add_variables(specs, alias, base_path);
    composed
}

impl ComposedEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `specs` on top of what has been composed so far.
    ///
    /// `alias` scopes the generated names (`ENVE_<ALIAS>_<NAME>`) and
    /// `base_path` anchors relative values of path variables.
    pub fn add_variables(
        &mut self,
        specs: &[VariableSpec],
        alias: Option<&str>,
        base_path: Option<&Path>,
    ) {
        for spec in specs {
            let value = joined_value(spec, base_path);

            let mut targets = Vec::new();
            if spec.path_export {
                targets.push(ENVE_PATH_VAR.to_string());
            }
            targets.push(scoped_name(spec, alias));
            for raw in &spec.exports {
                if !targets.contains(raw) {
                    targets.push(raw.clone());
                }
                self.raw_exports
                    .insert(raw.clone(), spec.delimiter.clone());
            }

            for name in targets {
                self.write(name, &value, spec);
            }
        }
    }

    fn write(&mut self, name: String, value: &str, spec: &VariableSpec) {
        match self.values.get_mut(&name) {
            Some(existing) if spec.delimiter.is_empty() => {
                *existing = value.to_string();
            }
            Some(existing) => {
                existing.push_str(&spec.delimiter);
                existing.push_str(value);
            }
            None if spec.delimit_first => {
                self.values
                    .insert(name, format!("{}{value}", spec.delimiter));
            }
            None => {
                self.values.insert(name, value.to_string());
            }
        }
    }

    /// Set a variable outright, replacing any composed value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Add `ENVE_ID` and, when versioned, `ENVE_ID_VER`.
    pub fn add_identity(&mut self, id: &DocumentId) {
        self.insert(ENVE_ID_VAR, id.name.clone());
        if let Some(version) = id.version.as_ref().filter(|v| !v.is_empty()) {
            self.insert(ENVE_ID_VER_VAR, version.clone());
        }
    }

    /// Add the interactive shell prompt.
    ///
    /// `foreign_app` is the id of the application the shell runs in, when
    /// that application is not the launcher itself.
    pub fn add_prompt(&mut self, basic: bool, foreign_app: Option<&str>) {
        self.insert(ENVE_PROMPT_VAR, prompt_string(basic, foreign_app));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check every name against the naming rules, reporting all offenders.
    pub fn validate_names(&self) -> crate::Result<()> {
        let names: Vec<String> = self
            .values
            .keys()
            .filter(|name| {
                if self.raw_exports.contains_key(*name) {
                    name.is_empty() || name.contains(['=', '\0'])
                } else {
                    !name.starts_with(ENVE_VAR_PREFIX)
                }
            })
            .cloned()
            .collect();

        if names.is_empty() {
            return Ok(());
        }
        for name in &names {
            tracing::error!("invalid enve variable name, expected prefix {ENVE_VAR_PREFIX:?}: {name}");
        }
        Err(crate::Error::NamingViolation { names })
    }

    /// Validate and produce the final mapping.
    ///
    /// Raw exports are merged with their inherited values so that repeated
    /// activations do not duplicate segments.
    pub fn finalize(&self, inherited: &EnvSnapshot) -> crate::Result<IndexMap<String, String>> {
        self.validate_names()?;

        let mut resolved = self.values.clone();
        for (name, delimiter) in &self.raw_exports {
            let Some(value) = resolved.get_mut(name) else {
                continue;
            };
            if let Some(existing) = inherited.get(name) {
                let merged = prepend_unique(value, existing, delimiter);
                *value = merged;
            }
        }

        tracing::debug!("enve variables: {resolved:#?}");
        Ok(resolved)
    }
}

fn scoped_name(spec: &VariableSpec, alias: Option<&str>) -> String {
    let name = match alias.filter(|a| !a.is_empty()) {
        Some(alias) => format!("{ENVE_VAR_PREFIX}{alias}_{}", spec.name),
        None => format!("{ENVE_VAR_PREFIX}{}", spec.name),
    };
    name.to_uppercase()
}

fn joined_value(spec: &VariableSpec, base_path: Option<&Path>) -> String {
    let values: Vec<String> = match base_path {
        Some(base) if spec.values_are_paths => spec
            .values
            .iter()
            .map(|value| {
                let joined = base.join(value).display().to_string();
                match joined.trim_end_matches('/') {
                    "" => "/".to_string(),
                    trimmed => trimmed.to_string(),
                }
            })
            .collect(),
        _ => spec.values.clone(),
    };

    match values.as_slice() {
        [single] => single.clone(),
        many => many.join(&spec.delimiter),
    }
}

fn prompt_string(basic: bool, foreign_app: Option<&str>) -> String {
    let (heavy, light) = if basic { ("▌", "┆") } else { ("\u{e0b0}", "\u{e0b1}") };

    let mut prompt = String::from(r"\[\e[30;42m\]📦$ENVE_ID${ENVE_ID_VER:+ ${ENVE_ID_VER}}");
    match foreign_app {
        Some(_) => prompt.push_str(&format!(
            r"\[\e[32;47m\]{heavy}\[\e[30m\]$FLATPAK_ID\[\e[37;49m\]{heavy}"
        )),
        None => prompt.push_str(&format!(r"\[\e[32;49m\]{heavy}")),
    }
    prompt.push_str(&format!(
        r"\n\[\e[0;32m\]▍\[\e[0m\]\u@\h \[\e[32m\]{light}\[\e[0m\] \W \[\e[32m\]{light}\[\e[0m\] $ "
    ));
    prompt
}
