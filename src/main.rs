// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! pipewright - Jenkins pipeline renderer
//!
//! Render typed pipeline templates into formatted Jenkins pipeline scripts.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipewright::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "pipewright=debug"
    } else {
        "pipewright=info"
    };

    // Logs go to stderr so rendered scripts on stdout stay clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if !pipewright::utils::should_use_colors() {
        colored::control::set_override(false);
    }

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Render(args) => pipewright::cli::render::run(args, cli.verbose).await,
        Commands::Validate { files, dir } => {
            pipewright::cli::validate::run(files, dir, cli.verbose).await
        }
        Commands::Vars {
            scm_type,
            image_repositories,
            format,
        } => pipewright::cli::vars::run(scm_type, image_repositories, format, cli.verbose).await,
    }
}
