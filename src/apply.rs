// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manifest deployment.
//!
//! Place every mapping of a [`ResolvedManifest`] into the user's environment,
//! and then fetch every resource it lists. Mappings and resources are
//! processed one at a time in declaration order.
//!
//! # Remove Before Create
//!
//! By default the current destination of a mapping is removed before the
//! mapping is deployed again. A destination that does not exist is simply
//! skipped. Failing to remove a destination is not fatal, the deployment
//! step still runs and reports its own failure if the destination is still
//! in the way.
//!
//! # Failure Handling
//!
//! A mapping that cannot be deployed stops the whole run, leaving any earlier
//! mappings in place. A resource that cannot be fetched is only logged, and
//! the next resource is attempted.

use crate::{
    fetch::{fetch_resource, ResourceFetcher},
    manifest::MappingKind,
    path::{create_parent_dir, current_os, path_exists},
    template::{Template, TemplateError},
    transform::{ResolvedManifest, ResolvedMapping},
};

use std::{
    fs::{read_to_string, remove_dir, remove_file, write, File},
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Settings that control how a manifest is applied.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ApplyConfig {
    /// Remove destination of each mapping before deploying it.
    pub remove: bool,

    /// Only remove destinations, never deploy. Implies [`Self::remove`].
    pub remove_only: bool,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            remove: true,
            remove_only: false,
        }
    }
}

/// Tally of what happened during a run.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub struct ApplyReport {
    /// Mappings deployed as symlinks.
    pub linked: usize,

    /// Mappings deployed as copies.
    pub copied: usize,

    /// Destinations that were removed.
    pub removed: usize,

    /// Mappings skipped for targeting another operating system.
    pub skipped: usize,

    /// Resources fetched successfully.
    pub fetched: usize,

    /// Resources that failed to be fetched.
    pub failed: usize,
}

/// Deploy resolved manifests.
#[derive(Debug)]
pub struct Engine<F>
where
    F: ResourceFetcher,
{
    config: ApplyConfig,
    fetcher: F,
    os: String,
}

impl<F> Engine<F>
where
    F: ResourceFetcher,
{
    /// Construct new engine targeting current operating system.
    pub fn new(config: ApplyConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher,
            os: current_os().to_owned(),
        }
    }

    /// Target another operating system for mapping filters.
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Apply every mapping, then fetch every resource.
    ///
    /// # Errors
    ///
    /// - Return [`ApplyError`] for the first mapping that fails to deploy.
    ///   Nothing after that mapping is attempted.
    #[instrument(skip(self, manifest), level = "debug")]
    pub fn apply(&self, manifest: &ResolvedManifest) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();

        for mapping in manifest.mappings() {
            if !mapping.os.matches(&self.os) {
                debug!("not on {}, skipping {:?}", mapping.os, mapping.from.display());
                report.skipped += 1;
                continue;
            }

            if self.config.remove || self.config.remove_only {
                match unmap(mapping) {
                    Ok(true) => report.removed += 1,
                    Ok(false) => {}
                    Err(err) => warn!("{err}"),
                }

                if self.config.remove_only {
                    continue;
                }
            }

            domap(mapping)?;
            match mapping.kind {
                MappingKind::Link => report.linked += 1,
                MappingKind::Copy => report.copied += 1,
            }
        }

        for resource in manifest.resources() {
            match fetch_resource(&self.fetcher, resource) {
                Ok(path) => {
                    debug!("fetched {} into {:?}", resource.url, path.display());
                    report.fetched += 1;
                }
                Err(err) => {
                    warn!("error fetching resource {}: {err}", resource.url);
                    report.failed += 1;
                }
            }
        }

        info!(
            "linked {}, copied {}, removed {}, skipped {}, fetched {}, failed to fetch {}",
            report.linked,
            report.copied,
            report.removed,
            report.skipped,
            report.fetched,
            report.failed
        );

        Ok(report)
    }
}

/// Deploy single mapping.
///
/// Creates parent directory of destination if needed, and then links or
/// copies source into destination.
///
/// # Errors
///
/// - Return [`ApplyError::CreatePath`] if parent directory cannot be created.
/// - Return [`ApplyError::Link`] if symlink cannot be created.
/// - Return [`ApplyError::Copy`] if copying fails.
/// - Return [`ApplyError::Render`] if source cannot be rendered.
pub fn domap(mapping: &ResolvedMapping) -> Result<()> {
    create_parent_dir(&mapping.to).map_err(|err| ApplyError::CreatePath {
        source: err,
        path: mapping.to.clone(),
    })?;

    match mapping.kind {
        MappingKind::Link => link(mapping)?,
        MappingKind::Copy => copy(mapping)?,
    }

    debug!(
        "{} {:?} -> {:?}",
        mapping.kind.verb(),
        mapping.from.display(),
        mapping.to.display()
    );

    Ok(())
}

/// Remove destination of single mapping.
///
/// Returns whether something was removed. Missing destinations are skipped.
///
/// # Errors
///
/// - Return [`RemoveError`] if destination exists but cannot be removed.
pub fn unmap(mapping: &ResolvedMapping) -> Result<bool, RemoveError> {
    if !path_exists(&mapping.to) {
        debug!("rm {:?}: skipping, file not there", mapping.to.display());
        return Ok(false);
    }

    remove_target(&mapping.to).map_err(|err| RemoveError {
        source: err,
        path: mapping.to.clone(),
    })?;
    debug!("rm {:?}: success", mapping.to.display());

    Ok(true)
}

fn remove_target(path: &Path) -> io::Result<()> {
    // INVARIANT: Only descend into real directories, never through symlinks.
    let meta = path.symlink_metadata()?;
    if meta.is_dir() {
        remove_dir(path)
    } else {
        remove_file(path)
    }
}

fn link(mapping: &ResolvedMapping) -> Result<()> {
    if !path_exists(&mapping.from) {
        return Err(ApplyError::Link {
            source: io::Error::new(io::ErrorKind::NotFound, "source does not exist"),
            from: mapping.from.clone(),
            to: mapping.to.clone(),
        });
    }

    symlink(&mapping.from, &mapping.to).map_err(|err| ApplyError::Link {
        source: err,
        from: mapping.from.clone(),
        to: mapping.to.clone(),
    })
}

#[cfg(unix)]
fn symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(from, to)
}

#[cfg(windows)]
fn symlink(from: &Path, to: &Path) -> io::Result<()> {
    if from.is_dir() {
        std::os::windows::fs::symlink_dir(from, to)
    } else {
        std::os::windows::fs::symlink_file(from, to)
    }
}

fn copy(mapping: &ResolvedMapping) -> Result<()> {
    let copy_err = |err| ApplyError::Copy {
        source: err,
        from: mapping.from.clone(),
        to: mapping.to.clone(),
    };

    if mapping.with.is_empty() {
        let mut input = File::open(&mapping.from).map_err(copy_err)?;
        let mut output = File::create(&mapping.to).map_err(copy_err)?;
        io::copy(&mut input, &mut output).map_err(copy_err)?;
        return Ok(());
    }

    let contents = read_to_string(&mapping.from).map_err(copy_err)?;
    let rendered = Template::parse(contents)
        .and_then(|template| template.render(&mapping.with))
        .map_err(|err| ApplyError::Render {
            source: err,
            from: mapping.from.clone(),
        })?;
    write(&mapping.to, rendered).map_err(copy_err)
}

/// Destination could not be removed.
#[derive(Debug, thiserror::Error)]
#[error("failed removing {:?}", path.display())]
pub struct RemoveError {
    #[source]
    source: io::Error,
    path: PathBuf,
}

/// Deployment error types.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// Parent directory of destination cannot be created.
    #[error("failed creating path {:?}", path.display())]
    CreatePath {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Symlink cannot be created.
    #[error("failed linking {:?} -> {:?}", from.display(), to.display())]
    Link {
        #[source]
        source: io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Source cannot be copied.
    #[error("failed copying {:?} -> {:?}", from.display(), to.display())]
    Copy {
        #[source]
        source: io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Source cannot be rendered as template.
    #[error("failed rendering {:?}", from.display())]
    Render {
        #[source]
        source: TemplateError,
        from: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ApplyError> = std::result::Result<T, E>;
