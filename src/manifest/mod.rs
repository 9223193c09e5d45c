// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Manifest envelopes
//!
//! Templates are stored as YAML documents with an `apiVersion`, a `kind`,
//! `metadata` and a `spec`. The envelope is checked on its own before the
//! spec is decoded into a [`PipelineTemplate`] or a [`TaskTemplate`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::arguments::TypeRegistry;
use crate::errors::{ErrorList, RenderError, RenderResult};
use crate::pipeline::{PipelineTemplate, TaskTemplate, TaskTemplates};

pub const API_VERSION_V1ALPHA1: &str = "devops.windcloud/v1alpha1";

pub const ANNOTATION_DISPLAY_NAME_ZH_CN: &str = "windcloud/displayName.zh-CN";
pub const ANNOTATION_DISPLAY_NAME_EN: &str = "windcloud/displayName.en";
pub const ANNOTATION_VERSION: &str = "windcloud/version";

const REQUIRED_ANNOTATIONS: [&str; 3] = [
    ANNOTATION_DISPLAY_NAME_ZH_CN,
    ANNOTATION_DISPLAY_NAME_EN,
    ANNOTATION_VERSION,
];

const NAME_PATTERN: &str = "^[a-zA-Z]([-a-zA-Z0-9]*[a-zA-Z0-9])?$";

/// Resource kinds a manifest can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManifestKind {
    PipelineTemplate,
    PipelineTaskTemplate,
}

impl std::str::FromStr for ManifestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PipelineTemplate" => Ok(Self::PipelineTemplate),
            "PipelineTaskTemplate" => Ok(Self::PipelineTaskTemplate),
            _ => Err(format!("kind {} is not supported", s)),
        }
    }
}

impl std::fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PipelineTemplate => write!(f, "PipelineTemplate"),
            Self::PipelineTaskTemplate => write!(f, "PipelineTaskTemplate"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub annotations: BTreeMap<String, Value>,

    #[serde(default)]
    pub labels: BTreeMap<String, Value>,
}

impl Metadata {
    /// A string annotation, empty when absent or not a string
    pub fn annotation(&self, key: &str) -> &str {
        self.annotations
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn validate_definition(&self) -> RenderResult<()> {
        if self.name.trim().is_empty() {
            return Err(RenderError::definition("metadata.name should be required"));
        }

        let mut errs = ErrorList::new();
        for key in REQUIRED_ANNOTATIONS {
            if self.annotation(key).trim().is_empty() {
                errs.push(RenderError::definition(format!(
                    "metadata.annotations.[{}] is required",
                    key
                )));
            }
        }

        let version = self.annotation(ANNOTATION_VERSION);
        if !version.is_empty() && !version.starts_with('v') {
            errs.push(RenderError::definition_with_help(
                format!("metadata.annotations.[{}] should start with \"v\"", ANNOTATION_VERSION),
                "versions look like v1.0.0",
            ));
        }

        errs.into_result()
    }
}

/// A template wrapped in its envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub api_version: String,

    /// Kept as text so an unknown kind is a definition error, not a parse error
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub metadata: Option<Metadata>,

    #[serde(default)]
    pub spec: Option<Value>,
}

impl Manifest {
    /// Load a manifest; only `.yaml` and `.yml` files are accepted
    pub fn load_file(path: &Path) -> RenderResult<Self> {
        if !path.exists() {
            return Err(RenderError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }

        if !is_manifest_file(path) {
            return Err(RenderError::UnsupportedFile {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| RenderError::FileRead {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "loaded manifest");
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> RenderResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    pub fn kind(&self) -> Option<ManifestKind> {
        self.kind.parse().ok()
    }

    pub fn name(&self) -> &str {
        self.metadata.as_ref().map(|m| m.name.as_str()).unwrap_or_default()
    }

    /// Check the envelope fields only
    pub fn validate_envelope(&self) -> RenderResult<()> {
        if self.api_version != API_VERSION_V1ALPHA1 {
            return Err(RenderError::definition(format!(
                "apiVersion {} is not supported",
                self.api_version
            )));
        }

        self.kind.parse::<ManifestKind>().map_err(RenderError::definition)?;

        if self.spec.is_none() {
            return Err(RenderError::definition("spec should be required"));
        }

        let metadata = self
            .metadata
            .as_ref()
            .ok_or_else(|| RenderError::definition("metadata should not be empty"))?;

        let name = Regex::new(NAME_PATTERN).map_err(|e| RenderError::definition(e.to_string()))?;
        if !name.is_match(&metadata.name) {
            return Err(RenderError::definition(format!(
                "name should match {}",
                NAME_PATTERN
            )));
        }

        Ok(())
    }

    /// Check the envelope, then the decoded spec and the metadata
    pub fn validate_definition(&self, registry: &TypeRegistry) -> RenderResult<()> {
        self.validate_envelope()?;

        match self.kind() {
            Some(ManifestKind::PipelineTemplate) => {
                self.pipeline_template()?.validate_definition(registry)?
            }
            Some(ManifestKind::PipelineTaskTemplate) => {
                self.task_template()?.validate_definition(registry)?
            }
            None => {}
        }

        self.metadata
            .as_ref()
            .map_or(Ok(()), Metadata::validate_definition)
    }

    /// Decode the `spec` field as a pipeline template
    pub fn pipeline_template(&self) -> RenderResult<PipelineTemplate> {
        self.decode_spec()
    }

    /// Decode the `spec` field as a task template
    pub fn task_template(&self) -> RenderResult<TaskTemplate> {
        self.decode_spec()
    }

    fn decode_spec<T: serde::de::DeserializeOwned>(&self) -> RenderResult<T> {
        let spec = self
            .spec
            .clone()
            .ok_or_else(|| RenderError::definition("spec should be required"))?;

        serde_json::from_value(spec).map_err(|e| {
            RenderError::definition(format!("cannot decode spec of {}: {}", self.name(), e))
        })
    }
}

fn is_manifest_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Every manifest file under a directory, sorted by path
pub fn manifest_files(dir: &Path) -> RenderResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in ["**/*.yaml", "**/*.yml"] {
        let full_pattern = dir.join(pattern).to_string_lossy().to_string();
        files.extend(glob::glob(&full_pattern)?.filter_map(Result::ok));
    }

    files.sort();
    Ok(files)
}

/// Load every manifest under a directory
pub fn load_dir(dir: &Path) -> RenderResult<Vec<(PathBuf, Manifest)>> {
    if !dir.is_dir() {
        return Err(RenderError::ManifestNotFound {
            path: dir.to_path_buf(),
        });
    }

    manifest_files(dir)?
        .into_iter()
        .map(|path| Manifest::load_file(&path).map(|m| (path, m)))
        .collect()
}

/// Task templates under a directory, keyed by `metadata.name`
///
/// Manifests of other kinds are skipped.
pub fn load_task_templates(dir: &Path) -> RenderResult<TaskTemplates> {
    let mut templates = TaskTemplates::new();
    let mut errs = ErrorList::new();

    for (path, manifest) in load_dir(dir)? {
        if manifest.kind() != Some(ManifestKind::PipelineTaskTemplate) {
            tracing::debug!(path = %path.display(), kind = %manifest.kind, "skipping manifest");
            continue;
        }

        if let Some(template) = errs.check(manifest.task_template()) {
            let name = manifest.name().to_string();
            if templates.insert(name.clone(), template).is_some() {
                tracing::warn!(name = %name, path = %path.display(), "task template defined more than once");
            }
        }
    }

    errs.into_result()?;
    tracing::debug!(count = templates.len(), "loaded task templates");
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PIPELINE: &str = r#"
apiVersion: devops.windcloud/v1alpha1
kind: PipelineTemplate
metadata:
  name: java-build
  annotations:
    windcloud/displayName.zh-CN: Java 构建
    windcloud/displayName.en: Java build
    windcloud/version: v1.2.0
spec:
  stages:
    - name: Build
      tasks:
        - name: build
          type: maven
"#;

    const TASK: &str = r#"
apiVersion: devops.windcloud/v1alpha1
kind: PipelineTaskTemplate
metadata:
  name: maven
  annotations:
    windcloud/displayName.zh-CN: Maven
    windcloud/displayName.en: Maven
    windcloud/version: v1
spec:
  body: sh 'mvn package'
"#;

    fn registry() -> &'static TypeRegistry {
        TypeRegistry::global()
    }

    #[test]
    fn test_valid_manifests() {
        let pipeline = Manifest::from_yaml(PIPELINE).unwrap();
        assert_eq!(pipeline.kind(), Some(ManifestKind::PipelineTemplate));
        assert_eq!(pipeline.name(), "java-build");
        assert!(pipeline.validate_definition(registry()).is_ok());
        assert_eq!(pipeline.pipeline_template().unwrap().stages.len(), 1);

        let task = Manifest::from_yaml(TASK).unwrap();
        assert!(task.validate_definition(registry()).is_ok());
        assert_eq!(task.task_template().unwrap().body, "sh 'mvn package'");
    }

    #[test]
    fn test_envelope_checks() {
        let cases = [
            ("devops.windcloud/v1alpha1", "v2"),
            ("kind: PipelineTemplate", "kind: Secret"),
            ("name: java-build", "name: 1java"),
            ("name: java-build", "name: java-"),
        ];
        for (from, to) in cases {
            let manifest = Manifest::from_yaml(&PIPELINE.replace(from, to)).unwrap();
            let err = manifest.validate_definition(registry()).unwrap_err();
            assert!(err.is_definition_error(), "{} -> {}", from, to);
        }

        let mut manifest = Manifest::from_yaml(PIPELINE).unwrap();
        manifest.spec = None;
        assert!(manifest
            .validate_definition(registry())
            .unwrap_err()
            .to_string()
            .contains("spec should be required"));
    }

    #[test]
    fn test_annotation_checks_are_aggregated() {
        let yaml = PIPELINE
            .replace("    windcloud/displayName.en: Java build\n", "")
            .replace("v1.2.0", "1.2.0");
        let err = Manifest::from_yaml(&yaml)
            .unwrap()
            .validate_definition(registry())
            .unwrap_err();
        assert_eq!(err.count(crate::errors::ErrorKind::Definition), 2);
    }

    #[test]
    fn test_spec_is_checked_before_metadata() {
        let yaml = PIPELINE.replace("          type: maven", "          type: \"\"");
        let err = Manifest::from_yaml(&yaml)
            .unwrap()
            .validate_definition(registry())
            .unwrap_err();
        assert!(err.to_string().contains("type should not be empty"));
    }

    #[test]
    fn test_undecodable_spec_is_definition_error() {
        let yaml = PIPELINE.replace("  stages:", "  stages: 3\n  unused:");
        let manifest = Manifest::from_yaml(&yaml).unwrap();
        assert!(manifest.pipeline_template().unwrap_err().is_definition_error());
    }

    #[test]
    fn test_load_file_checks_extension() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("pipeline.json");
        std::fs::write(&json, "{}").unwrap();
        assert!(matches!(
            Manifest::load_file(&json),
            Err(RenderError::UnsupportedFile { .. })
        ));

        assert!(matches!(
            Manifest::load_file(&dir.path().join("missing.yaml")),
            Err(RenderError::ManifestNotFound { .. })
        ));
    }

    #[test]
    fn test_load_task_templates() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pipeline.yaml"), PIPELINE).unwrap();
        std::fs::create_dir(dir.path().join("tasks")).unwrap();
        std::fs::write(dir.path().join("tasks/maven.yml"), TASK).unwrap();
        std::fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let templates = load_task_templates(dir.path()).unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates["maven"].body, "sh 'mvn package'");

        assert_eq!(load_dir(dir.path()).unwrap().len(), 2);
    }
}
