// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manifest layout.
//!
//! Specify the layout of the manifest file that declares what dotfiles to
//! deploy, and which external resources to fetch. This module only handles
//! decoding. Path resolution is done by [`transform`](crate::transform), and
//! semantic checks are done by [`validate`](crate::validate).
//!
//! # General Layout
//!
//! A manifest is a YAML document with three optional sections:
//!
//! ```yaml
//! opt:
//!   cd: dots/
//! map:
//!   bashrc:
//!   gitconfig:
//!     to: ~/.config/git/config
//!     as: copy
//!     with:
//!       email: "{{ email }}"
//! fetch:
//!   - url: https://github.com/tmux-plugins/tpm
//!     to: ~/.tmux/plugins/tpm
//!     as: git
//! ```
//!
//! The `map` section is keyed by source path. Each key becomes the source of
//! a [`FileMapping`] in the order it was written. Unknown keys at any level
//! are rejected.

use indexmap::IndexMap;
use serde::{de::IntoDeserializer, Deserialize, Deserializer, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Manifest of dotfiles to deploy.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(from = "ManifestLayout")]
pub struct Manifest {
    /// Global options.
    pub options: Options,

    /// File mappings in declaration order.
    pub mappings: Vec<FileMapping>,

    /// External resources in declaration order.
    pub resources: Vec<Resource>,
}

impl Manifest {
    /// Read and decode manifest file.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::Read`] if manifest file cannot be read.
    /// - Return [`ManifestError::Decode`] if manifest is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = read_to_string(path.as_ref()).map_err(|err| ManifestError::Read {
            source: err,
            path: path.as_ref().to_path_buf(),
        })?;

        data.parse()
    }
}

impl FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        serde_yaml::from_str(data).map_err(ManifestError::Decode)
    }
}

/// Manifest layout exactly as written on disk.
#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ManifestLayout {
    opt: Options,
    map: IndexMap<String, Option<MappingSpec>>,
    fetch: Vec<Resource>,
}

impl From<ManifestLayout> for Manifest {
    fn from(layout: ManifestLayout) -> Self {
        // INVARIANT: Mapping key becomes source path of its mapping.
        let mappings = layout
            .map
            .into_iter()
            .map(|(from, spec)| FileMapping::from_spec(from, spec.unwrap_or_default()))
            .collect();

        Self {
            options: layout.opt,
            mappings,
            resources: layout.fetch,
        }
    }
}

/// Global manifest options.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Directory prefix joined onto every relative mapping source.
    pub cd: String,
}

/// Value side of a mapping entry.
#[derive(Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MappingSpec {
    to: Option<String>,
    #[serde(rename = "as", deserialize_with = "empty_as_none")]
    kind: Option<MappingKind>,
    os: OsFilter,
    with: IndexMap<String, String>,
}

/// One declared file placement.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct FileMapping {
    /// Source path.
    pub from: String,

    /// Destination path. Inferred from source if missing.
    pub to: Option<String>,

    /// How to deploy source. Defaults to [`MappingKind::Link`] if missing.
    pub kind: Option<MappingKind>,

    /// Operating system the mapping applies to.
    pub os: OsFilter,

    /// Template variables, only usable with [`MappingKind::Copy`].
    pub with: IndexMap<String, String>,
}

impl FileMapping {
    /// Construct new mapping with nothing but a source path.
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            ..Default::default()
        }
    }

    fn from_spec(from: String, spec: MappingSpec) -> Self {
        Self {
            from,
            to: spec.to,
            kind: spec.kind,
            os: spec.os,
            with: spec.with,
        }
    }
}

/// Deployment method of a file mapping.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    /// Symlink destination to source.
    #[default]
    Link,

    /// Copy source to destination, rendering templates if any.
    Copy,
}

impl MappingKind {
    /// Verb describing the operation, used for logging.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Link => "linking",
            Self::Copy => "copying",
        }
    }
}

impl Display for MappingKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Link => fmt.write_str("link"),
            Self::Copy => fmt.write_str("copy"),
        }
    }
}

/// Operating system filter of a file mapping.
///
/// Uses the naming scheme of [`current_os`](crate::path::current_os). Both
/// `all` and the empty string match any operating system.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFilter {
    /// Match any operating system.
    #[default]
    #[serde(alias = "")]
    All,

    /// Match Linux.
    Linux,

    /// Match macOS.
    Macos,

    /// Match macOS by its kernel name.
    Darwin,
}

impl OsFilter {
    /// Check if filter matches target operating system name.
    pub fn matches(&self, os: &str) -> bool {
        match self {
            Self::All => true,
            Self::Linux => os == "linux",
            Self::Macos | Self::Darwin => os == "darwin",
        }
    }
}

impl Display for OsFilter {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::All => fmt.write_str("all"),
            Self::Linux => fmt.write_str("linux"),
            Self::Macos => fmt.write_str("macos"),
            Self::Darwin => fmt.write_str("darwin"),
        }
    }
}

/// External resource to fetch.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Resource {
    /// Location to fetch from.
    pub url: String,

    /// Destination path. A trailing separator marks a directory.
    pub to: String,

    /// How to fetch resource.
    #[serde(rename = "as", deserialize_with = "empty_as_none")]
    pub kind: Option<ResourceKind>,
}

/// Fetch method of an external resource.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Clone git repository.
    Git,

    /// Download single file over HTTP.
    #[serde(alias = "http")]
    File,
}

impl Display for ResourceKind {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Git => fmt.write_str("git"),
            Self::File => fmt.write_str("file"),
        }
    }
}

/// Treat empty string the same as a missing value.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.is_empty() => T::deserialize(value.into_deserializer()).map(Some),
        _ => Ok(None),
    }
}

/// Manifest error types.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file cannot be read.
    #[error("failed to read manifest at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Manifest is malformed or does not follow the layout.
    #[error("failed to decode manifest: {0}")]
    Decode(#[source] serde_yaml::Error),
}

/// Friendly result alias :3
pub type Result<T, E = ManifestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test]
    fn decode_full_manifest() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            opt:
              cd: foo
            map:
              bashrc:
              gitconfig:
                to: ~/.config/git/config
                as: copy
                os: linux
                with:
                  email: "{{ Os }}@blah.org"
                  name: John Doe
              vimrc:
                as: link
                os: ""
              zshrc:
                as: ""
            fetch:
              - url: https://blah.org/tpm.git
                to: ~/.tmux/plugins/tpm
                as: git
              - url: https://blah.org/plug.vim
                to: ~/.vim/autoload/
                as: http
        "#}
        .parse()?;

        let expect = Manifest {
            options: Options { cd: "foo".into() },
            mappings: vec![
                FileMapping::new("bashrc"),
                FileMapping {
                    from: "gitconfig".into(),
                    to: Some("~/.config/git/config".into()),
                    kind: Some(MappingKind::Copy),
                    os: OsFilter::Linux,
                    with: IndexMap::from([
                        ("email".into(), "{{ Os }}@blah.org".into()),
                        ("name".into(), "John Doe".into()),
                    ]),
                },
                FileMapping {
                    from: "vimrc".into(),
                    kind: Some(MappingKind::Link),
                    ..Default::default()
                },
                FileMapping::new("zshrc"),
            ],
            resources: vec![
                Resource {
                    url: "https://blah.org/tpm.git".into(),
                    to: "~/.tmux/plugins/tpm".into(),
                    kind: Some(ResourceKind::Git),
                },
                Resource {
                    url: "https://blah.org/plug.vim".into(),
                    to: "~/.vim/autoload/".into(),
                    kind: Some(ResourceKind::File),
                },
            ],
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn decode_keeps_mapping_key_order() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            map:
              f3:
              f1:
              f2:
            opt:
              cd: foo
        "#}
        .parse()?;

        let sources: Vec<_> = result.mappings.iter().map(|m| m.from.as_str()).collect();
        assert_eq!(sources, ["f3", "f1", "f2"]);
        assert_eq!(result.options.cd, "foo");
        assert!(result.resources.is_empty());

        Ok(())
    }

    #[test_case("blah: 1\n"; "unknown top level key")]
    #[test_case("opt:\n  cwd: foo\n"; "unknown option")]
    #[test_case("map:\n  bashrc:\n    too: ~/.bashrc\n"; "unknown mapping field")]
    #[test_case("fetch:\n  - url: x\n    into: y\n"; "unknown resource field")]
    #[test_case("map:\n  bashrc:\n    as: hardlink\n"; "unknown mapping kind")]
    #[test_case("map: [bashrc\n"; "malformed document")]
    #[test]
    fn decode_rejects_bad_manifest(data: &str) {
        assert!(matches!(
            data.parse::<Manifest>(),
            Err(ManifestError::Decode(_))
        ));
    }

    #[test_case(OsFilter::All, "linux", true; "all on linux")]
    #[test_case(OsFilter::All, "darwin", true; "all on darwin")]
    #[test_case(OsFilter::Linux, "linux", true; "linux on linux")]
    #[test_case(OsFilter::Linux, "darwin", false; "linux on darwin")]
    #[test_case(OsFilter::Macos, "darwin", true; "macos on darwin")]
    #[test_case(OsFilter::Macos, "linux", false; "macos on linux")]
    #[test_case(OsFilter::Darwin, "darwin", true; "darwin on darwin")]
    #[test_case(OsFilter::Darwin, "freebsd", false; "darwin on freebsd")]
    #[test]
    fn os_filter_equivalence(filter: OsFilter, os: &str, expect: bool) {
        pretty_assertions::assert_eq!(filter.matches(os), expect);
    }

    #[test]
    fn load_reports_missing_file() {
        let result = Manifest::load("/this/path/does/not/exist/dot.yml");
        assert!(matches!(result, Err(ManifestError::Read { .. })));
    }
}
