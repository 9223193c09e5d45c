// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Vars command - list build variables available to scripts

use colored::Colorize;
use miette::Result;

use super::OutputFormat;
use crate::errors::RenderError;
use crate::pipeline::{global_vars, ScmInfo, ScmType};
use crate::utils;

/// Run the vars command
pub async fn run(
    scm_type: Option<ScmType>,
    image_repositories: Vec<String>,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let scm = scm_type.map(|scm_type| ScmInfo {
        scm_type,
        repository_path: String::new(),
        credentials_id: String::new(),
        branch: String::new(),
    });
    let vars = global_vars(scm.as_ref(), &image_repositories);

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&vars).map_err(RenderError::from)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            utils::print_header("Build variables");
            let width = vars.iter().map(|v| v.name.len()).max().unwrap_or(0);
            for var in &vars {
                println!("  {}  {}", pad(&var.name, width).cyan(), var.description.en);
                if verbose {
                    println!("  {}  {}", pad("", width), var.description.zh_cn.dimmed());
                }
            }
        }
    }

    Ok(())
}

/// Left-align `text` in `width` columns before any colour codes are added
fn pad(text: &str, width: usize) -> String {
    format!("{:width$}", text, width = width)
}
