// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Declarative dotfile deployment.
//!
//! Dotmap reads a __manifest__ that maps files of a dotfile repository onto
//! the user's environment, and deploys each of them either as a symlink or as
//! a copy. Copies can be rendered as templates along the way. A manifest can
//! also list external resources, like git repositories or single files behind
//! a URL, that should be fetched into place.
//!
//! # Pipeline
//!
//! Deployment always runs through the same stages:
//!
//! 1. [`Manifest`] decodes the manifest file.
//! 2. [`Transformer`] resolves every path and template of the manifest into
//!    a [`ResolvedManifest`].
//! 3. [`validate`](validate::validate) collects every mistake in the resolved
//!    manifest. Any mistake aborts the run before anything is touched.
//! 4. [`Engine`] removes stale destinations, deploys mappings, and fetches
//!    resources.
//!
//! Stages 1 through 3 are bundled up in [`load_manifest`].

pub mod apply;
pub mod fetch;
pub mod manifest;
pub mod path;
pub mod template;
pub mod transform;
pub mod validate;

pub use apply::{ApplyConfig, ApplyReport, Engine};
pub use fetch::{NetworkFetcher, ResourceFetcher};
pub use manifest::Manifest;
pub use transform::{ResolvedManifest, TransformContext, Transformer};

use std::path::Path;
use tracing::{debug, instrument};

/// Read, resolve, and validate manifest file.
///
/// # Errors
///
/// - Return [`LoadError::Manifest`] if manifest cannot be read or decoded.
/// - Return [`LoadError::Transform`] if manifest cannot be resolved.
/// - Return [`LoadError::Invalid`] with every violation found if resolved
///   manifest is invalid.
#[instrument(skip(path, context), level = "debug")]
pub fn load_manifest(path: impl AsRef<Path>, context: TransformContext) -> Result<ResolvedManifest> {
    debug!("load manifest {:?}", path.as_ref().display());
    let manifest = Manifest::load(path)?;
    let resolved = Transformer::new(context).transform(manifest)?;
    validate::ensure_valid(&resolved)?;

    Ok(resolved)
}

/// Manifest loading error types.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Manifest cannot be read or decoded.
    #[error(transparent)]
    Manifest(#[from] manifest::ManifestError),

    /// Manifest cannot be resolved.
    #[error(transparent)]
    Transform(#[from] transform::TransformError),

    /// Resolved manifest is invalid.
    #[error(transparent)]
    Invalid(#[from] validate::ValidationErrors),
}

/// Friendly result alias :3
pub type Result<T, E = LoadError> = std::result::Result<T, E>;
