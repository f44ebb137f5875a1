// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for files that need to be deployed,
//! removed, or fetched into place. Nothing in here caches environment state,
//! so callers that need a stable view of the home directory should resolve it
//! once and pass it along.

use std::{
    fs::DirBuilder,
    io,
    path::{Component, Path, PathBuf},
};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Expand leading tilde of path into target home directory.
///
/// Only `~` by itself, or `~/` at the start of the path is expanded. Anything
/// else is returned as is, e.g., `~user/foo` or `foo/~/bar`.
pub fn expand_tilde(path: impl AsRef<str>, home: impl AsRef<Path>) -> PathBuf {
    let home = home.as_ref().to_string_lossy().into_owned();
    PathBuf::from(shellexpand::tilde_with_context(path.as_ref(), || Some(home)).into_owned())
}

/// Check if path exists without following symlinks.
///
/// A dangling symlink still counts as existing, because it still occupies
/// its spot on the file system.
pub fn path_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().symlink_metadata().is_ok()
}

/// Check if path points to a directory.
///
/// Follows symlinks. Missing paths are never directories.
pub fn is_directory(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .metadata()
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

/// Create parent directory of path if it is missing.
///
/// Parent directories are created recursively with permissions `0750` on
/// Unix-like systems.
///
/// # Errors
///
/// - Return [`io::Error`] if any directory along the way cannot be created.
pub fn create_parent_dir(path: impl AsRef<Path>) -> io::Result<()> {
    match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir(parent),
        _ => Ok(()),
    }
}

/// Create directory and all of its missing parents.
///
/// Uses the same permissions as [`create_parent_dir`].
///
/// # Errors
///
/// - Return [`io::Error`] if any directory along the way cannot be created.
pub fn create_dir(path: impl AsRef<Path>) -> io::Result<()> {
    if path_exists(path.as_ref()) {
        return Ok(());
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o750);
    }

    builder.create(path.as_ref())
}

/// Join `base` and `path` into one lexically cleaned path.
///
/// The `path` is always nested under `base`, even when it is absolute. The
/// `.` components are dropped, and `..` components consume the component
/// before them. A `..` that climbs past a relative start is kept, while one
/// that climbs past the root is dropped. Nothing is looked up on the file
/// system, so symlinks are never resolved.
pub fn clean_join(base: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
    let rooted = base.as_ref().has_root();
    let mut parts: Vec<Component<'_>> = Vec::new();

    // INVARIANT: Only the root of base counts, a root in path is stripped.
    for component in base.as_ref().components().chain(path.as_ref().components()) {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                None if rooted => {}
                _ => parts.push(component),
            },
            Component::Normal(_) => parts.push(component),
        }
    }

    let mut joined = if rooted {
        PathBuf::from(std::path::MAIN_SEPARATOR_STR)
    } else {
        PathBuf::new()
    };
    joined.extend(parts);
    if joined.as_os_str().is_empty() {
        joined.push(".");
    }

    joined
}

/// Name of current operating system.
///
/// Uses the naming scheme manifests use for OS filters, which calls macOS
/// "darwin". Every other system keeps the name Rust gives it.
pub fn current_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        os => os,
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
