// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Package manager integration for extensions and applications.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

use crate::spec::ExtensionSpec;
use crate::EnvSnapshot;

#[cfg(test)]
#[path = "./package_test.rs"]
mod package_test;

/// Install state of a package reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRef {
    /// Remote the package was installed from.
    pub origin: String,
    /// Full commit hash of the installed build.
    pub commit: String,
}

/// Captured result of a package manager command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Captured stderr, indented for log output.
    pub fn indented_stderr(&self) -> String {
        indent(&self.stderr, "  ")
    }
}

/// Application metadata needed to run the launcher inside an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
    /// Entrypoint the application normally runs.
    pub command: String,
    pub runtime: Option<String>,
    pub sdk: Option<String>,
}

impl AppMetadata {
    /// Runtime to run the launcher in: the sdk when available, since the
    /// launcher and developer tooling live there.
    pub fn launch_runtime(&self) -> Option<&str> {
        self.sdk.as_deref().or(self.runtime.as_deref())
    }
}

/// Operations on the package manager that provides extensions and apps.
///
/// Mutating operations report failure through [`CommandOutcome`]; `Err` is
/// reserved for being unable to run the package manager at all.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Origin and commit of `reference`, or `None` when not installed.
    async fn installed(&self, reference: &str) -> crate::Result<Option<InstalledRef>>;

    /// Install an extension, from `remote` when given.
    async fn install(
        &self,
        extension: &ExtensionSpec,
        remote: Option<&str>,
    ) -> crate::Result<CommandOutcome>;

    /// Update an extension, to `commit` when given, else to the newest build.
    async fn update(
        &self,
        extension: &ExtensionSpec,
        commit: Option<&str>,
    ) -> crate::Result<CommandOutcome>;

    async fn remove(&self, extension: &ExtensionSpec) -> crate::Result<CommandOutcome>;

    /// Metadata of an installed application, or `None` when it is unknown.
    async fn app_metadata(&self, app_id: &str) -> crate::Result<Option<AppMetadata>>;
}

/// Runs `flatpak` on the host through `flatpak-spawn --host`.
#[derive(Debug, Clone)]
pub struct FlatpakHost {
    flatpak_spawn: PathBuf,
    proxies: Vec<(String, String)>,
}

impl FlatpakHost {
    /// `env` provides the proxy settings forwarded to network operations.
    pub fn new(flatpak_spawn: impl Into<PathBuf>, env: &EnvSnapshot) -> Self {
        Self {
            flatpak_spawn: flatpak_spawn.into(),
            proxies: env.proxy_vars(),
        }
    }

    /// Host command line for a flatpak invocation.
    ///
    /// Network operations carry the proxy environment, including the
    /// extension's own proxy when it declares one.
    pub fn host_args(&self, network: Option<&ExtensionSpec>, flatpak_args: &[&str]) -> Vec<String> {
        let mut args = vec!["--host".to_string()];
        if let Some(extension) = network {
            for (name, value) in &self.proxies {
                args.push(format!("--env={name}={value}"));
            }
            if let Some(proxy) = extension.proxy_env.as_deref().filter(|p| !p.is_empty()) {
                args.push(format!("--env=http_proxy={proxy}"));
                args.push(format!("--env=https_proxy={proxy}"));
            }
        }
        args.push("flatpak".to_string());
        args.extend(flatpak_args.iter().map(|a| a.to_string()));
        args
    }

    async fn run(&self, args: Vec<String>) -> crate::Result<CommandOutcome> {
        tracing::debug!("running {} {}", self.flatpak_spawn.display(), args.join(" "));
        let output = Command::new(&self.flatpak_spawn)
            .args(&args)
            .output()
            .await
            .map_err(|error| crate::Error::SpawnFailed {
                program: self.flatpak_spawn.display().to_string(),
                error,
            })?;
        Ok(CommandOutcome {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn info(&self, flag: &str, reference: &str) -> crate::Result<CommandOutcome> {
        self.run(self.host_args(None, &["info", flag, reference])).await
    }
}

#[async_trait]
impl PackageManager for FlatpakHost {
    async fn installed(&self, reference: &str) -> crate::Result<Option<InstalledRef>> {
        let origin = self.info("--show-origin", reference).await?;
        if !origin.success() {
            return Ok(None);
        }

        // the reference is known to be installed, so this is expected to work
        let commit = self.info("--show-commit", reference).await?;
        if !commit.success() {
            return Err(crate::Error::PackageQueryFailed {
                reference: reference.to_string(),
                stderr: commit.indented_stderr(),
            });
        }

        Ok(Some(InstalledRef {
            origin: origin.stdout.trim().to_string(),
            commit: commit.stdout.trim().to_string(),
        }))
    }

    async fn install(
        &self,
        extension: &ExtensionSpec,
        remote: Option<&str>,
    ) -> crate::Result<CommandOutcome> {
        let mut flatpak_args = vec!["install", "--user", "--noninteractive", "--assumeyes"];
        flatpak_args.extend(remote);
        flatpak_args.push(&extension.flatpak_ref);
        self.run(self.host_args(Some(extension), &flatpak_args)).await
    }

    async fn update(
        &self,
        extension: &ExtensionSpec,
        commit: Option<&str>,
    ) -> crate::Result<CommandOutcome> {
        let commit_arg = commit.map(|c| format!("--commit={c}"));
        let mut flatpak_args = vec!["update", "--user", "--noninteractive", "--assumeyes"];
        flatpak_args.extend(commit_arg.as_deref());
        flatpak_args.push(&extension.flatpak_ref);
        self.run(self.host_args(Some(extension), &flatpak_args)).await
    }

    async fn remove(&self, extension: &ExtensionSpec) -> crate::Result<CommandOutcome> {
        let flatpak_args = [
            "uninstall",
            "--user",
            "--noninteractive",
            "--assumeyes",
            extension.flatpak_ref.as_str(),
        ];
        self.run(self.host_args(None, &flatpak_args)).await
    }

    async fn app_metadata(&self, app_id: &str) -> crate::Result<Option<AppMetadata>> {
        let outcome = self.info("--show-metadata", app_id).await?;
        if !outcome.success() {
            return Ok(None);
        }
        Ok(parse_app_metadata(&outcome.stdout))
    }
}

/// Read the `[Application]` group of a flatpak metadata keyfile.
pub fn parse_app_metadata(keyfile: &str) -> Option<AppMetadata> {
    let mut in_application = false;
    let mut command = None;
    let mut runtime = None;
    let mut sdk = None;

    for line in keyfile.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(group) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_application = group == "Application";
            continue;
        }
        if !in_application {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
        match key.trim() {
            "command" => command = value,
            "runtime" => runtime = value,
            "sdk" => sdk = value,
            _ => {}
        }
    }

    Some(AppMetadata {
        command: command?,
        runtime,
        sdk,
    })
}

/// Prefix every line of `text` with `prefix`.
pub fn indent(text: &str, prefix: &str) -> String {
    text.trim_end()
        .lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
