// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External resource fetching.
//!
//! Resources are things that do not live next to the manifest, but still need
//! to be placed into the user's environment, e.g., plugin managers cloned from
//! a git remote, or single files downloaded over HTTP.
//!
//! All network access goes through the [`ResourceFetcher`] trait. The
//! [`NetworkFetcher`] is what gets used for real deployments. It clones
//! through libgit2, and downloads through a plain HTTP agent.

use crate::{
    manifest::{Resource, ResourceKind},
    path::{create_dir, create_parent_dir},
};

use auth_git2::{GitAuthenticator, Prompter};
use git2::{build::RepoBuilder, Config, FetchOptions, RemoteCallbacks};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf, MAIN_SEPARATOR},
    time::{Duration, Instant},
};
use tracing::{debug, info, instrument};

/// Layer of indirection for network access.
pub trait ResourceFetcher {
    /// Clone git repository at `url` into `to`.
    fn fetch_git(&self, url: &str, to: &Path) -> Result<()>;

    /// Download file at `url` into `to`.
    ///
    /// Returns path of the file that was written.
    fn fetch_file(&self, url: &str, to: &Path) -> Result<PathBuf>;
}

/// Fetch resource with fetch method it declares.
///
/// Returns path the resource was placed at.
///
/// # Errors
///
/// - Return [`FetchError::MissingKind`] if resource has no fetch method.
/// - Return [`FetchError`] if fetcher fails.
pub fn fetch_resource(fetcher: &impl ResourceFetcher, resource: &Resource) -> Result<PathBuf> {
    let to = Path::new(&resource.to);
    match resource.kind {
        Some(ResourceKind::Git) => fetcher.fetch_git(&resource.url, to).map(|()| to.into()),
        Some(ResourceKind::File) => fetcher.fetch_file(&resource.url, to),
        None => Err(FetchError::MissingKind {
            url: resource.url.clone(),
        }),
    }
}

/// Fetch resources over the network.
#[derive(Debug)]
pub struct NetworkFetcher {
    agent: ureq::Agent,
}

impl NetworkFetcher {
    /// Construct new network fetcher.
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

impl Default for NetworkFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceFetcher for NetworkFetcher {
    /// Clone git repository at `url` into `to`.
    ///
    /// Progress of the clone is displayed through a progress bar. If the
    /// remote requires credentials, then the user will be prompted for them,
    /// and the progress bar will be blocked for user input.
    ///
    /// # Errors
    ///
    /// - Return [`FetchError::CreatePath`] if parent of `to` cannot be
    ///   created.
    /// - Return [`FetchError::Git2`] if libgit2 operations fail.
    #[instrument(skip(self, to), level = "debug")]
    fn fetch_git(&self, url: &str, to: &Path) -> Result<()> {
        create_parent_dir(to).map_err(|err| FetchError::CreatePath {
            source: err,
            path: to.into(),
        })?;

        let bar = ProgressBar::no_length();
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(url.to_owned());
        bar.enable_steady_tick(Duration::from_millis(100));

        let prompter = IndicatifPrompter::new(bar.clone());
        let authenticator = GitAuthenticator::default().set_prompter(prompter);
        let config = Config::open_default()?;

        let mut throttle = Instant::now();
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));
        rc.transfer_progress(|progress| {
            if throttle.elapsed() > Duration::from_millis(10) {
                throttle = Instant::now();
                bar.set_length(progress.total_objects() as u64);
                bar.set_position(progress.received_objects() as u64);
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(rc);
        let result = RepoBuilder::new().fetch_options(fo).clone(url, to);
        bar.finish_and_clear();
        result?;

        info!("cloned {url} into {:?}", to.display());

        Ok(())
    }

    /// Download file at `url` into `to`.
    ///
    /// If `to` ends with a path separator, then it is treated as a directory,
    /// and the base name of the URL is used as the file name.
    ///
    /// # Errors
    ///
    /// - Return [`FetchError::Http`] if request cannot be made.
    /// - Return [`FetchError::Status`] if server does not reply with success.
    /// - Return [`FetchError::CreatePath`] if destination directories cannot
    ///   be created.
    /// - Return [`FetchError::NoFileName`] if `to` is a directory, but the
    ///   URL does not name a file.
    /// - Return [`FetchError::Write`] if response cannot be written.
    #[instrument(skip(self, to), level = "debug")]
    fn fetch_file(&self, url: &str, to: &Path) -> Result<PathBuf> {
        debug!("GET {url}");
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) => {
                return Err(FetchError::Status {
                    url: url.into(),
                    code,
                });
            }
            Err(err) => {
                return Err(FetchError::Http {
                    source: err,
                    url: url.into(),
                });
            }
        };

        let code = response.status().as_u16();
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.into(),
                code,
            });
        }

        let target = download_target(url, to)?;
        let mut file = File::create(&target).map_err(|err| FetchError::Write {
            source: err,
            path: target.clone(),
        })?;
        io::copy(&mut response.into_body().into_reader(), &mut file).map_err(|err| {
            FetchError::Write {
                source: err,
                path: target.clone(),
            }
        })?;

        info!("downloaded {url} into {:?}", target.display());

        Ok(target)
    }
}

/// Determine file to download into, creating missing directories on the way.
///
/// # Errors
///
/// - Return [`FetchError::CreatePath`] if directories cannot be created.
/// - Return [`FetchError::NoFileName`] if `to` is a directory, but the URL
///   does not name a file.
pub fn download_target(url: &str, to: &Path) -> Result<PathBuf> {
    if !names_directory(to) {
        create_parent_dir(to).map_err(|err| FetchError::CreatePath {
            source: err,
            path: to.into(),
        })?;

        return Ok(to.into());
    }

    let file_name = url_file_name(url).ok_or_else(|| FetchError::NoFileName { url: url.into() })?;
    create_dir(to).map_err(|err| FetchError::CreatePath {
        source: err,
        path: to.into(),
    })?;

    Ok(to.join(file_name))
}

/// Base file name of URL path, ignoring query and fragment.
pub fn url_file_name(url: &str) -> Option<&str> {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
}

fn names_directory(path: &Path) -> bool {
    let path = path.as_os_str().to_string_lossy();
    path.ends_with('/') || path.ends_with(MAIN_SEPARATOR)
}

/// Git2 authentication prompter for progress bar.
#[derive(Debug, Clone)]
pub struct IndicatifPrompter {
    bar: ProgressBar,
}

impl IndicatifPrompter {
    /// Construct new progress bar authenticator.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| -> Option<(String, String)> {
            let username = Text::new("username").prompt().ok()?;
            let password = Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()?;
            Some((username, password))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| -> Option<String> {
            Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| -> Option<String> {
            Password::new("passphrase")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }
}

/// Resource fetching error types.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Resource does not say how to fetch it.
    #[error("{url}: resource type (`as`) cannot be empty")]
    MissingKind { url: String },

    /// Destination directories cannot be created.
    #[error("failed to create path {:?}", path.display())]
    CreatePath {
        #[source]
        source: io::Error,
        path: PathBuf,
    },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// HTTP request cannot be made.
    #[error("failed to request {url}")]
    Http {
        #[source]
        source: ureq::Error,
        url: String,
    },

    /// Server replied without success.
    #[error("failed to request {url}: server replied with status {code}")]
    Status { url: String, code: u16 },

    /// Destination is a directory, but URL does not name a file.
    #[error("{url}: cannot determine file name to download into")]
    NoFileName { url: String },

    /// Downloaded content cannot be written.
    #[error("failed to write download to {:?}", path.display())]
    Write {
        #[source]
        source: io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = FetchError> = std::result::Result<T, E>;
