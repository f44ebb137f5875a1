// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotmap::{load_manifest, ApplyConfig, Engine, NetworkFetcher, TransformContext};

use anyhow::Result;
use clap::{ArgAction, Parser};
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// A simple dotfile manager.
#[derive(Debug, Clone, Parser)]
#[command(about, override_usage = "dotmap [options]", version)]
struct Cli {
    /// Manifest file to deploy.
    #[arg(long, value_name = "path", default_value = "dot.yml")]
    pub dot: PathBuf,

    /// Log every operation.
    #[arg(long)]
    pub verbose: bool,

    /// Remove destinations before deploying.
    #[arg(long, value_name = "bool", default_value_t = true, action = ArgAction::Set)]
    pub rm: bool,

    /// Only remove destinations, do not deploy.
    #[arg(long)]
    pub rm_only: bool,

    /// Only read and validate manifest.
    #[arg(long)]
    pub validate_only: bool,

    /// Extra template variable made available to every mapping.
    #[arg(long = "var", value_name = "key=value", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

impl Cli {
    fn run(self) -> Result<()> {
        let context = TransformContext::from_env()?.with_vars(self.vars);
        let manifest = load_manifest(&self.dot, context)?;

        if self.validate_only {
            info!("yay, dots file valid!");
            return Ok(());
        }

        let config = ApplyConfig {
            remove: self.rm,
            remove_only: self.rm_only,
        };
        Engine::new(config, NetworkFetcher::new()).apply(&manifest)?;

        Ok(())
    }
}

fn parse_var(arg: &str) -> Result<(String, String), String> {
    arg.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .ok_or_else(|| format!("expected key=value, found {arg:?}"))
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = if cli.verbose {
        EnvFilter::new("dotmap=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}
