// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Bring installed extensions in line with the ones a config declares.

use serde::Serialize;

use crate::error::Operation;
use crate::package::{CommandOutcome, PackageManager};
use crate::spec::{CommitPin, ExtensionSpec};
use crate::{EnvSnapshot, Fingerprint};

#[cfg(test)]
#[path = "./reconcile_test.rs"]
mod reconcile_test;

/// Settings that change how extensions are reconciled.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Update every extension not pinned to `current_installed`.
    pub force_update: bool,
    /// Refuse removals and updates, which would pull files out from under
    /// the running environment.
    pub in_active_session: bool,
    /// The extension allowed a restore from its previous origin.
    pub base_extension_id: Option<String>,
    /// Only query, never change anything.
    pub dry_run: bool,
}

/// Result of reconciling a single extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionState {
    pub installed: bool,
    /// Whether the extension was (or in a dry run, would be) changed.
    pub changed: bool,
}

/// Summary of reconciling all extensions of a config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub changed: bool,
    /// The config fingerprint matched and nothing was checked.
    pub skipped: bool,
    /// Ids of the extensions that changed, in processing order.
    pub changed_extensions: Vec<String>,
}

/// Installs, repairs and updates extensions through a [`PackageManager`].
pub struct Reconciler<'a> {
    packages: &'a dyn PackageManager,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(packages: &'a dyn PackageManager, options: ReconcileOptions) -> Self {
        Self { packages, options }
    }

    /// Reconcile every extension, last declared first.
    ///
    /// When the environment already records `fingerprint` as the active
    /// config, the extensions are trusted to be in place and nothing is
    /// queried at all.
    pub async fn reconcile_all<'e, I>(
        &self,
        extensions: I,
        fingerprint: &Fingerprint,
        inherited: &EnvSnapshot,
    ) -> crate::Result<ReconcileReport>
    where
        I: IntoIterator<Item = &'e ExtensionSpec>,
        I::IntoIter: DoubleEndedIterator,
    {
        if fingerprint.matches_recorded(inherited) {
            tracing::info!("enve config unchanged, skipping extension checks");
            return Ok(ReconcileReport {
                skipped: true,
                ..Default::default()
            });
        }

        let mut report = ReconcileReport::default();
        for extension in extensions.into_iter().rev() {
            let state = self.reconcile(extension).await?;
            if state.changed {
                report.changed = true;
                report.changed_extensions.push(extension.id.clone());
            }
        }
        Ok(report)
    }

    /// Make sure a single extension is installed from the right source at
    /// the right commit.
    pub async fn reconcile(&self, extension: &ExtensionSpec) -> crate::Result<ExtensionState> {
        let Some(installed) = self.packages.installed(&extension.flatpak_ref).await? else {
            tracing::info!("{} extension not installed", extension.id);
            let changed = self.install(extension, None).await?;
            return Ok(ExtensionState {
                installed: !self.options.dry_run,
                changed,
            });
        };

        if let Some(remote) = extension.remote() {
            if remote != installed.origin {
                return self.replace(extension, installed.origin).await;
            }
        }

        let changed = self.verify_commit(extension, &installed.commit).await?;
        Ok(ExtensionState {
            installed: true,
            changed,
        })
    }

    /// Remove an extension installed from the wrong remote and install it
    /// again from the right one.
    async fn replace(
        &self,
        extension: &ExtensionSpec,
        origin: String,
    ) -> crate::Result<ExtensionState> {
        tracing::warn!(
            "{} extension installed from {origin:?} instead of {:?}",
            extension.id,
            extension.remote_source
        );
        if self.options.in_active_session {
            return Err(crate::Error::UnsafeMutation {
                id: extension.id.clone(),
                operation: Operation::Remove,
            });
        }
        if self.options.dry_run {
            return Ok(ExtensionState {
                installed: true,
                changed: true,
            });
        }

        let outcome = self.packages.remove(extension).await?;
        check(extension, Operation::Remove, &outcome)?;
        tracing::info!("removed {} extension installed from {origin:?}", extension.id);

        self.install(extension, Some(origin.as_str())).await?;
        Ok(ExtensionState {
            installed: true,
            changed: true,
        })
    }

    /// Install an extension that is not currently present.
    ///
    /// `previous_origin` is where it was installed from before being removed.
    async fn install(
        &self,
        extension: &ExtensionSpec,
        previous_origin: Option<&str>,
    ) -> crate::Result<bool> {
        if self.options.dry_run {
            tracing::info!("would install {} extension", extension.id);
            return Ok(true);
        }

        tracing::info!("installing {} extension", extension.id);
        let outcome = self.packages.install(extension, extension.remote()).await?;
        if !outcome.success() {
            if let Some(origin) = previous_origin.filter(|_| self.is_base(extension)) {
                self.restore(extension, origin).await?;
            }
            return check(extension, Operation::Install, &outcome).map(|_| true);
        }
        tracing::info!("{} extension installed", extension.id);

        if let Some(commit) = extension.commit_pin.commit() {
            match self.packages.installed(&extension.flatpak_ref).await? {
                Some(installed) if installed.commit.starts_with(commit) => {}
                Some(installed) => {
                    self.verify_commit(extension, &installed.commit).await?;
                }
                None => {
                    tracing::warn!(
                        "{} extension missing right after install, unable to check commit {commit}",
                        extension.id
                    );
                }
            }
        }
        Ok(true)
    }

    /// Best effort attempt to put the base extension back where it was.
    async fn restore(&self, extension: &ExtensionSpec, origin: &str) -> crate::Result<()> {
        tracing::warn!("restoring {} extension from {origin:?}", extension.id);
        let outcome = self.packages.install(extension, Some(origin)).await?;
        if outcome.success() {
            tracing::info!("{} extension restored from {origin:?}", extension.id);
        } else {
            tracing::error!(
                "unable to restore {} extension:\n{}",
                extension.id,
                outcome.indented_stderr()
            );
        }
        Ok(())
    }

    /// Update the extension when its commit pin demands it.
    async fn verify_commit(
        &self,
        extension: &ExtensionSpec,
        installed_commit: &str,
    ) -> crate::Result<bool> {
        let force = self.options.force_update;
        let target = match &extension.commit_pin {
            CommitPin::CurrentInstalled => None,
            CommitPin::Commit(commit) if force || !installed_commit.starts_with(commit.as_str()) => {
                Some(Some(commit.as_str()))
            }
            CommitPin::Commit(_) => None,
            CommitPin::Unpinned | CommitPin::Latest if force => Some(None),
            CommitPin::Unpinned | CommitPin::Latest => None,
        };

        let Some(commit) = target else {
            tracing::info!("{} extension verified", extension.id);
            return Ok(false);
        };

        match commit {
            Some(commit) => tracing::warn!(
                "{} extension at commit {installed_commit}, expected {commit}",
                extension.id
            ),
            None => tracing::info!("forcing update of {} extension", extension.id),
        }
        if self.options.in_active_session {
            return Err(crate::Error::UnsafeMutation {
                id: extension.id.clone(),
                operation: Operation::Update,
            });
        }
        if self.options.dry_run {
            return Ok(true);
        }

        let outcome = self.packages.update(extension, commit).await?;
        check(extension, Operation::Update, &outcome)?;
        tracing::info!("{} extension updated", extension.id);
        Ok(true)
    }

    fn is_base(&self, extension: &ExtensionSpec) -> bool {
        self.options.base_extension_id.as_deref() == Some(extension.id.as_str())
    }
}

/// Turn a failed package operation into an error, logging its output once.
fn check(
    extension: &ExtensionSpec,
    operation: Operation,
    outcome: &CommandOutcome,
) -> crate::Result<()> {
    if outcome.success() {
        return Ok(());
    }
    let stderr = outcome.indented_stderr();
    tracing::error!("{} extension {operation} failed:\n{stderr}", extension.id);
    Err(crate::Error::ExtensionUnavailable {
        id: extension.id.clone(),
        operation,
        stderr,
    })
}
