// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manifest validation.
//!
//! Check a [`ResolvedManifest`] for mistakes that would make deployment fail
//! halfway through. Validation never stops at the first problem. Every
//! violation is collected, so the user can fix all of them in one go.

use crate::{
    manifest::MappingKind,
    path::{is_directory, path_exists},
    transform::ResolvedManifest,
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
};

/// Collect every violation found in resolved manifest.
///
/// Mappings are checked first in declaration order, followed by resources.
/// An empty listing means the manifest can be deployed.
pub fn validate(manifest: &ResolvedManifest) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for mapping in manifest.mappings() {
        if !path_exists(&mapping.from) {
            errors.push(ValidationError::MissingSource {
                from: mapping.from.clone(),
            });
        } else if is_directory(&mapping.from) && mapping.kind == MappingKind::Copy {
            errors.push(ValidationError::CopyDirectory {
                from: mapping.from.clone(),
            });
        }

        if mapping.kind != MappingKind::Copy && !mapping.with.is_empty() {
            errors.push(ValidationError::TemplateWithoutCopy {
                from: mapping.from.clone(),
            });
        }
    }

    for resource in manifest.resources() {
        if resource.to.is_empty() {
            errors.push(ValidationError::MissingResourceDestination {
                url: resource.url.clone(),
            });
        }

        if resource.kind.is_none() {
            errors.push(ValidationError::MissingResourceKind {
                url: resource.url.clone(),
            });
        }
    }

    errors
}

/// Check resolved manifest, and fail if any violation was found.
///
/// # Errors
///
/// - Return [`ValidationErrors`] holding every violation found.
pub fn ensure_valid(manifest: &ResolvedManifest) -> Result<(), ValidationErrors> {
    let errors = validate(manifest);
    if errors.is_empty() {
        return Ok(());
    }

    Err(ValidationErrors(errors))
}

/// Single manifest violation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Mapping source does not exist.
    #[error("{}: path does not exist", from.display())]
    MissingSource { from: PathBuf },

    /// Mapping copies a directory.
    #[error("{}: cannot use copy type with directory", from.display())]
    CopyDirectory { from: PathBuf },

    /// Mapping uses template variables without copying.
    #[error("{}: templating is only supported in `copy` mode", from.display())]
    TemplateWithoutCopy { from: PathBuf },

    /// Resource has no destination.
    #[error("{url}: resource destination (`to`) cannot be empty")]
    MissingResourceDestination { url: String },

    /// Resource has no fetch method.
    #[error("{url}: resource type (`as`) cannot be empty")]
    MissingResourceKind { url: String },
}

/// Every violation found in a manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// Iterate through each violation.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "manifest has {} violation(s)", self.0.len())?;
        for error in &self.0 {
            write!(fmt, "\n  {error}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        manifest::{FileMapping, Manifest, Options, Resource, ResourceKind},
        transform::{TransformContext, Transformer},
    };
    use pretty_assertions::assert_eq;
    use std::fs::{create_dir, write};
    use tempfile::TempDir;

    fn scratch() -> anyhow::Result<TempDir> {
        let scratch = tempfile::tempdir()?;
        create_dir(scratch.path().join("examples"))?;
        write(scratch.path().join("examples/zshrc"), "export EDITOR=vim\n")?;
        Ok(scratch)
    }

    fn resolve(scratch: &TempDir, manifest: Manifest) -> anyhow::Result<ResolvedManifest> {
        let context = TransformContext::new(scratch.path().join("home"), scratch.path());
        Ok(Transformer::new(context).transform(manifest)?)
    }

    fn manifest_of(mappings: Vec<FileMapping>) -> Manifest {
        Manifest {
            mappings,
            ..Default::default()
        }
    }

    #[test]
    fn validate_accepts_good_manifest() -> anyhow::Result<()> {
        let scratch = scratch()?;
        let mut copy = FileMapping::new("examples/zshrc");
        copy.kind = Some(MappingKind::Copy);
        copy.with.insert("editor".into(), "vim".into());
        let manifest = resolve(
            &scratch,
            manifest_of(vec![
                FileMapping::new("examples/zshrc"),
                FileMapping::new("examples"),
                copy,
            ]),
        )?;

        assert!(validate(&manifest).is_empty());
        assert_eq!(ensure_valid(&manifest), Ok(()));

        Ok(())
    }

    #[test]
    fn validate_missing_source() -> anyhow::Result<()> {
        let scratch = scratch()?;
        let manifest = Manifest {
            options: Options { cd: "foo".into() },
            mappings: vec![FileMapping::new("examples/zshrc")],
            ..Default::default()
        };
        let manifest = resolve(&scratch, manifest)?;
        let result = validate(&manifest);

        let from = scratch.path().join("foo/examples/zshrc");
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].to_string(),
            format!("{}: path does not exist", from.display())
        );

        Ok(())
    }

    #[test]
    fn validate_copy_directory() -> anyhow::Result<()> {
        let scratch = scratch()?;
        let mut mapping = FileMapping::new("examples/");
        mapping.kind = Some(MappingKind::Copy);
        let manifest = resolve(&scratch, manifest_of(vec![mapping]))?;
        let result = validate(&manifest);

        let from = &manifest.mappings()[0].from;
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].to_string(),
            format!("{}: cannot use copy type with directory", from.display())
        );

        Ok(())
    }

    #[test]
    fn validate_template_needs_copy() -> anyhow::Result<()> {
        let scratch = scratch()?;
        let mut mapping = FileMapping::new("examples/zshrc");
        mapping.with.insert("editor".into(), "vim".into());
        let manifest = resolve(&scratch, manifest_of(vec![mapping]))?;
        let result = validate(&manifest);

        assert_eq!(
            result,
            vec![ValidationError::TemplateWithoutCopy {
                from: scratch.path().join("examples/zshrc"),
            }]
        );

        Ok(())
    }

    #[test]
    fn validate_collects_every_violation() -> anyhow::Result<()> {
        let scratch = scratch()?;
        let mut templated = FileMapping::new("missing");
        templated.with.insert("editor".into(), "vim".into());
        let manifest = Manifest {
            mappings: vec![templated, FileMapping::new("examples/zshrc")],
            resources: vec![
                Resource {
                    url: "https://blah.org/a".into(),
                    to: String::new(),
                    kind: None,
                },
                Resource {
                    url: "https://blah.org/b".into(),
                    to: "~/b".into(),
                    kind: Some(ResourceKind::File),
                },
            ],
            ..Default::default()
        };
        let manifest = resolve(&scratch, manifest)?;
        let result = validate(&manifest);

        let missing = scratch.path().join("missing");
        let expect = vec![
            ValidationError::MissingSource {
                from: missing.clone(),
            },
            ValidationError::TemplateWithoutCopy { from: missing },
            ValidationError::MissingResourceDestination {
                url: "https://blah.org/a".into(),
            },
            ValidationError::MissingResourceKind {
                url: "https://blah.org/a".into(),
            },
        ];
        assert_eq!(result, expect);
        assert_eq!(
            result[2].to_string(),
            "https://blah.org/a: resource destination (`to`) cannot be empty"
        );
        assert_eq!(
            result[3].to_string(),
            "https://blah.org/a: resource type (`as`) cannot be empty"
        );

        let errors = ensure_valid(&manifest).unwrap_err();
        assert_eq!(errors.iter().count(), 4);

        Ok(())
    }
}
