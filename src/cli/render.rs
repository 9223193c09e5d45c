// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Render command - compose a pipeline template into a Jenkins script

use clap::Args;
use miette::Result;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::errors::{RenderError, RenderResult};
use crate::manifest::{self, Manifest, ManifestKind};
use crate::pipeline::{ScmInfo, ScmType};
use crate::utils;

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Pipeline template manifest
    pub pipeline: PathBuf,

    /// Directory holding task template manifests
    #[clap(short, long, env = "PIPEWRIGHT_TASK_TEMPLATES", value_name = "DIR")]
    pub task_templates: PathBuf,

    /// Argument value, parsed as YAML (repeatable)
    #[clap(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// File of argument values (.json, .yaml, .yml or .toml)
    #[clap(long, value_name = "FILE")]
    pub values: Option<PathBuf>,

    /// Source control type of the repository (git, svn)
    #[clap(long, value_name = "TYPE")]
    pub scm_type: Option<ScmType>,

    /// Repository address
    #[clap(long, value_name = "URL", requires = "scm_type")]
    pub scm_repo: Option<String>,

    /// Credential used to check out the repository
    #[clap(long, value_name = "ID", requires = "scm_type")]
    pub scm_credential: Option<String>,

    /// Branch to build
    #[clap(long, value_name = "BRANCH", requires = "scm_type")]
    pub scm_branch: Option<String>,

    /// Write the script to a file instead of stdout
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip re-indenting the rendered script
    #[clap(long)]
    pub no_format: bool,
}

impl RenderArgs {
    /// Source-control context, when a type was given
    pub fn scm(&self) -> Option<ScmInfo> {
        self.scm_type.map(|scm_type| ScmInfo {
            scm_type,
            repository_path: self.scm_repo.clone().unwrap_or_default(),
            credentials_id: self.scm_credential.clone().unwrap_or_default(),
            branch: self.scm_branch.clone().unwrap_or_default(),
        })
    }

    /// Values from the values file, overridden by `--set`
    pub fn argument_values(&self) -> RenderResult<Map<String, Value>> {
        let mut values = match &self.values {
            Some(path) => load_values(path)?,
            None => Map::new(),
        };

        for entry in &self.set {
            let (name, value) = parse_set(entry)?;
            values.insert(name, value);
        }

        Ok(values)
    }
}

/// Parse one `name=value` pair; the value is read as YAML
pub fn parse_set(entry: &str) -> RenderResult<(String, Value)> {
    let (name, raw) = entry.split_once('=').ok_or_else(|| {
        RenderError::validation(format!("--set {} should look like name=value", entry))
    })?;

    let name = name.trim();
    if name.is_empty() {
        return Err(RenderError::validation(format!(
            "--set {} has an empty name",
            entry
        )));
    }

    let value = if raw.trim().is_empty() {
        Value::String(String::new())
    } else {
        serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };

    Ok((name.to_string(), value))
}

/// Load argument values; the format follows the file extension
pub fn load_values(path: &Path) -> RenderResult<Map<String, Value>> {
    let content = std::fs::read_to_string(path).map_err(|e| RenderError::FileRead {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let value: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => {
            return Err(RenderError::UnsupportedFile {
                path: path.to_path_buf(),
            })
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(RenderError::validation(format!(
            "{} should hold a mapping of argument values, but got {}",
            path.display(),
            crate::value::type_name(&other)
        ))),
    }
}

/// Run the render command
pub async fn run(args: RenderArgs, verbose: bool) -> Result<()> {
    let manifest = Manifest::load_file(&args.pipeline)?;
    manifest.validate_envelope()?;
    if manifest.kind() != Some(ManifestKind::PipelineTemplate) {
        return Err(miette::miette!(
            "{} is a {}, expected a PipelineTemplate",
            args.pipeline.display(),
            manifest.kind
        ));
    }

    let template = manifest.pipeline_template()?;
    let task_templates = manifest::load_task_templates(&args.task_templates)?;
    let values = args.argument_values()?;
    let scm = args.scm();

    if verbose {
        utils::print_info(&format!(
            "{} with {} task templates",
            manifest.name(),
            task_templates.len()
        ));
    }

    let script = if args.no_format {
        template.render(&task_templates, &values, scm.as_ref())?
    } else {
        template.render_and_format(&task_templates, &values, scm.as_ref())?
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &script).await.map_err(RenderError::from)?;
            tracing::info!(pipeline = %manifest.name(), output = %path.display(), "rendered pipeline");
            if verbose {
                utils::print_success(&format!("Wrote {}", path.display()));
            }
        }
        None => print!("{}", script),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_set_reads_yaml_scalars() {
        assert_eq!(parse_set("timeout=300").unwrap(), ("timeout".into(), json!(300)));
        assert_eq!(parse_set("push=true").unwrap(), ("push".into(), json!(true)));
        assert_eq!(parse_set("image=app:1").unwrap(), ("image".into(), json!("app:1")));
        assert_eq!(parse_set("tags=[a, b]").unwrap(), ("tags".into(), json!(["a", "b"])));
        assert_eq!(parse_set("empty=").unwrap(), ("empty".into(), json!("")));
        assert_eq!(parse_set("url=a=b").unwrap(), ("url".into(), json!("a=b")));
    }

    #[test]
    fn test_parse_set_rejects_malformed_entries() {
        assert!(parse_set("timeout").unwrap_err().is_validation_error());
        assert!(parse_set("=3").unwrap_err().is_validation_error());
    }

    #[test]
    fn test_load_values_by_extension() {
        let dir = TempDir::new().unwrap();

        let json_file = dir.path().join("values.json");
        std::fs::write(&json_file, r#"{"timeout": 60}"#).unwrap();
        assert_eq!(load_values(&json_file).unwrap()["timeout"], json!(60));

        let toml_file = dir.path().join("values.toml");
        std::fs::write(&toml_file, "image = \"app\"\npush = true\n").unwrap();
        let values = load_values(&toml_file).unwrap();
        assert_eq!(values["image"], json!("app"));
        assert_eq!(values["push"], json!(true));

        let yaml_file = dir.path().join("values.yml");
        std::fs::write(&yaml_file, "- not\n- a mapping\n").unwrap();
        assert!(load_values(&yaml_file).unwrap_err().is_validation_error());

        let txt_file = dir.path().join("values.txt");
        std::fs::write(&txt_file, "").unwrap();
        assert!(matches!(
            load_values(&txt_file),
            Err(RenderError::UnsupportedFile { .. })
        ));
    }

    #[test]
    fn test_set_overrides_values_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("values.yaml");
        std::fs::write(&file, "timeout: 60\nimage: app\n").unwrap();

        let args = RenderArgs {
            pipeline: PathBuf::from("pipeline.yaml"),
            task_templates: PathBuf::from("tasks"),
            set: vec!["timeout=90".into()],
            values: Some(file),
            scm_type: Some(ScmType::Svn),
            scm_repo: Some("svn://repo".into()),
            scm_credential: None,
            scm_branch: None,
            output: None,
            no_format: false,
        };

        let values = args.argument_values().unwrap();
        assert_eq!(values["timeout"], json!(90));
        assert_eq!(values["image"], json!("app"));

        let scm = args.scm().unwrap();
        assert_eq!(scm.scm_type, ScmType::Svn);
        assert_eq!(scm.repository_path, "svn://repo");
        assert_eq!(scm.branch, "");
    }
}
