// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Validate command - check template manifests

use colored::Colorize;
use miette::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::arguments::TypeRegistry;
use crate::errors::RenderError;
use crate::manifest::{self, Manifest, ManifestKind};

/// Run the validate command
pub async fn run(files: Vec<PathBuf>, dir: Option<PathBuf>, verbose: bool) -> Result<()> {
    let mut paths = files;
    if let Some(dir) = &dir {
        paths.extend(manifest::manifest_files(dir)?);
    }

    if paths.is_empty() {
        return Err(miette::miette!(
            "Nothing to validate\n\n\
             Pass manifests with -f FILE or a directory with -d DIR."
        ));
    }

    println!("{}", "Validating manifests...".bold());
    println!();

    let registry = TypeRegistry::global();
    let mut failed = 0;
    let mut task_types = BTreeSet::new();
    let mut task_template_names = BTreeSet::new();

    for path in &paths {
        let result = Manifest::load_file(path).and_then(|manifest| {
            manifest.validate_definition(registry)?;
            Ok(manifest)
        });

        match result {
            Ok(manifest) => {
                println!("  {} {} ({})", "✓".green(), path.display(), manifest.kind);
                match manifest.kind() {
                    Some(ManifestKind::PipelineTemplate) => {
                        let template = manifest.pipeline_template()?;
                        task_types.extend(template.task_types().into_iter().map(String::from));
                    }
                    Some(ManifestKind::PipelineTaskTemplate) => {
                        task_template_names.insert(manifest.name().to_string());
                    }
                    None => {}
                }
            }
            Err(e) => {
                failed += 1;
                println!("  {} {}", "✗".red(), path.display());
                print_error(&e, verbose);
            }
        }
    }

    // Only meaningful when the task templates were validated alongside
    if dir.is_some() {
        let missing: Vec<_> = task_types.difference(&task_template_names).collect();
        if !missing.is_empty() {
            println!();
            println!("{}:", "Warnings".yellow().bold());
            for name in missing {
                println!("  {} no task template named '{}' was found", "⚠".yellow(), name);
            }
        }
    }

    println!();

    if failed > 0 {
        Err(miette::miette!(
            "{} of {} manifests failed validation",
            failed,
            paths.len()
        ))
    } else {
        println!("{}", "All manifests are valid!".green().bold());
        Ok(())
    }
}

fn print_error(error: &RenderError, verbose: bool) {
    match error {
        RenderError::Multiple { errors } => {
            for e in errors {
                println!("      {}", e);
            }
        }
        other => println!("      {}", other),
    }

    if verbose {
        if let Some(help) = miette::Diagnostic::help(error) {
            println!("      {} {}", "help:".dimmed(), help);
        }
    }
}
