// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manifest path resolution.
//!
//! Turn a freshly decoded [`Manifest`] into a [`ResolvedManifest`] whose paths
//! are all absolute, whose defaults are all filled in, and whose template
//! variables are all rendered. Nothing downstream needs to consult the
//! environment again.
//!
//! # Resolution Order
//!
//! Each mapping is resolved in the following order:
//!
//! 1. Expand or infer destination.
//! 2. Render template variables.
//! 3. Prefix source with `cd` option, cleaning up `.` and `..` along the way.
//! 4. Prefix source with current working directory if still relative.
//! 5. Default deployment method to link.
//!
//! Destination inference depends on the source path _as written_ in the
//! manifest. Thus, the destination must be resolved before the source gets
//! prefixed, e.g., `bashrc` with `cd: dots` maps to `~/.bashrc`, not to
//! `~/.dots/bashrc`.

use crate::{
    manifest::{FileMapping, Manifest, MappingKind, Options, OsFilter, Resource},
    path::{clean_join, current_os, expand_tilde, home_dir, NoWayHome},
    template::{Template, TemplateError, TemplateVars},
};

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Manifest with fully resolved mappings.
///
/// Can only be produced by [`Transformer::transform`], so every value in here
/// is guaranteed to have gone through resolution exactly once.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ResolvedManifest {
    options: Options,
    mappings: Vec<ResolvedMapping>,
    resources: Vec<Resource>,
}

impl ResolvedManifest {
    /// Global options the manifest was resolved with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Resolved file mappings in declaration order.
    pub fn mappings(&self) -> &[ResolvedMapping] {
        &self.mappings
    }

    /// Resources in declaration order with destinations expanded.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }
}

/// File mapping with resolved paths.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ResolvedMapping {
    /// Absolute source path.
    pub from: PathBuf,

    /// Expanded destination path.
    pub to: PathBuf,

    /// Deployment method.
    pub kind: MappingKind,

    /// Operating system filter.
    pub os: OsFilter,

    /// Rendered template variables.
    pub with: TemplateVars,
}

/// Environment that paths and templates are resolved against.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TransformContext {
    /// User's home directory.
    pub home: PathBuf,

    /// Directory that relative sources are relative to.
    pub cwd: PathBuf,

    /// Name of current operating system, exposed to templates as `Os`.
    pub os: String,

    /// Additional caller supplied template variables.
    pub vars: TemplateVars,
}

impl TransformContext {
    /// Construct new context from explicit paths.
    pub fn new(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            cwd: cwd.into(),
            os: current_os().to_owned(),
            vars: TemplateVars::new(),
        }
    }

    /// Construct new context from current process environment.
    ///
    /// # Errors
    ///
    /// - Return [`TransformError::NoWayHome`] if home directory is unknown.
    /// - Return [`TransformError::CurrentDir`] if current working directory
    ///   cannot be determined.
    pub fn from_env() -> Result<Self> {
        let home = home_dir()?;
        let cwd = std::env::current_dir().map_err(TransformError::CurrentDir)?;
        Ok(Self::new(home, cwd))
    }

    /// Add caller supplied template variables.
    ///
    /// Variables named `Os` are ignored, the current operating system always
    /// takes precedence.
    pub fn with_vars(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.vars.extend(vars);
        self
    }

    fn template_vars(&self) -> TemplateVars {
        let mut vars = self.vars.clone();
        vars.insert("Os".into(), self.os.clone());
        vars
    }
}

/// Resolve manifests against a [`TransformContext`].
#[derive(Debug, Clone)]
pub struct Transformer {
    context: TransformContext,
}

impl Transformer {
    /// Construct new transformer.
    pub fn new(context: TransformContext) -> Self {
        Self { context }
    }

    /// Resolve every mapping and resource of manifest.
    ///
    /// # Errors
    ///
    /// - Return [`TransformError::Template`] if a template variable of some
    ///   mapping cannot be parsed or rendered.
    #[instrument(skip(self, manifest), level = "debug")]
    pub fn transform(&self, manifest: Manifest) -> Result<ResolvedManifest> {
        let Manifest {
            options,
            mappings,
            resources,
        } = manifest;

        let mappings = mappings
            .into_iter()
            .map(|mapping| self.resolve_mapping(&options, mapping))
            .collect::<Result<Vec<_>>>()?;

        let resources = resources
            .into_iter()
            .map(|resource| self.resolve_resource(resource))
            .collect();

        Ok(ResolvedManifest {
            options,
            mappings,
            resources,
        })
    }

    fn resolve_mapping(&self, options: &Options, mapping: FileMapping) -> Result<ResolvedMapping> {
        // INVARIANT: Destination is resolved from source as written.
        let to = match mapping.to.as_deref() {
            Some(to) if !to.is_empty() => expand_tilde(to, &self.context.home),
            _ => infer_destination(&mapping.from, &self.context.home),
        };

        let with = if mapping.with.is_empty() {
            mapping.with
        } else {
            self.render_vars(&mapping.from, mapping.with)?
        };

        let mut from = PathBuf::from(&mapping.from);
        if !options.cd.is_empty() {
            from = clean_join(&options.cd, from);
        }
        if !from.is_absolute() {
            from = self.context.cwd.join(from);
        }

        let kind = mapping.kind.unwrap_or_default();
        debug!("resolved {:?} -> {:?} as {kind}", from.display(), to.display());

        Ok(ResolvedMapping {
            from,
            to,
            kind,
            os: mapping.os,
            with,
        })
    }

    fn render_vars(&self, from: &str, with: IndexMap<String, String>) -> Result<TemplateVars> {
        let env = self.context.template_vars();
        with.into_iter()
            .map(|(variable, source)| {
                Template::parse(source)
                    .and_then(|template| template.render(&env))
                    .map(|value| (variable.clone(), value))
                    .map_err(|err| TransformError::Template {
                        source: err,
                        from: from.to_owned(),
                        variable,
                    })
            })
            .collect()
    }

    fn resolve_resource(&self, mut resource: Resource) -> Resource {
        if !resource.to.is_empty() {
            // INVARIANT: Keep trailing separator, it marks a directory.
            resource.to = expand_tilde(&resource.to, &self.context.home)
                .to_string_lossy()
                .into_owned();
        }

        resource
    }
}

/// Infer destination of source path relative to home directory.
///
/// Source is placed at the top-level of the home directory as a hidden file,
/// i.e., `bashrc` and `.bashrc` both become `<home>/.bashrc`.
pub fn infer_destination(from: &str, home: impl AsRef<Path>) -> PathBuf {
    if from.starts_with('.') {
        home.as_ref().join(from)
    } else {
        home.as_ref().join(format!(".{from}"))
    }
}

/// Transformation error types.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// Home directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] NoWayHome),

    /// Current working directory cannot be determined.
    #[error("cannot determine current working directory")]
    CurrentDir(#[source] std::io::Error),

    /// Template variable of mapping cannot be evaluated.
    #[error("{from}: failed to evaluate template variable {variable:?}")]
    Template {
        #[source]
        source: TemplateError,
        from: String,
        variable: String,
    },
}

/// Friendly result alias :3
pub type Result<T, E = TransformError> = std::result::Result<T, E>;
