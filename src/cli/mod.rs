// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for pipewright.

pub mod render;
pub mod validate;
pub mod vars;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::ScmType;

/// Jenkins pipeline renderer
///
/// Render typed pipeline templates into formatted Jenkins pipeline scripts.
#[derive(Parser, Debug)]
#[clap(
    name = "pipewright",
    version,
    about = "Render typed pipeline templates into formatted Jenkins pipeline scripts",
    long_about = None,
    after_help = "Examples:\n\
        pipewright render pipeline.yaml -t tasks/            Render to stdout\n\
        pipewright render pipeline.yaml --set timeout=300    Override an argument\n\
        pipewright validate -d templates/                    Check every manifest\n\
        pipewright vars --scm-type git                       List build variables\n\n\
        See 'pipewright <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a pipeline template into a Jenkins pipeline script
    Render(render::RenderArgs),

    /// Validate template manifests
    Validate {
        /// Manifest files to validate
        #[clap(short, long = "file", value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Validate every manifest under a directory
        #[clap(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// List the build variables available to pipeline scripts
    Vars {
        /// Source control of the pipeline (git, svn)
        #[clap(long, value_name = "TYPE")]
        scm_type: Option<ScmType>,

        /// Image repository that can trigger the pipeline
        #[clap(long = "image-repository", value_name = "REPO")]
        image_repositories: Vec<String>,

        /// Output format
        #[clap(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_vars() {
        let cli = Cli::parse_from([
            "pipewright",
            "vars",
            "--scm-type",
            "git",
            "--image-repository",
            "app",
            "-f",
            "json",
        ]);
        match cli.command {
            Commands::Vars {
                scm_type,
                image_repositories,
                format,
            } => {
                assert_eq!(scm_type, Some(ScmType::Git));
                assert_eq!(image_repositories, vec!["app"]);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_validate_files() {
        let cli = Cli::parse_from(["pipewright", "-v", "validate", "-f", "a.yaml", "-f", "b.yml"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Validate { ref files, dir: None } if files.len() == 2));
    }
}
