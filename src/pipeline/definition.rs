// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline template definition structures
//!
//! Defines the schema of a pipeline template spec: stages of tasks, post
//! conditions, constant task values and the argument sections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::arguments::{self, ArgumentDeclaration, ArgumentSection};
use crate::errors::{RenderError, RenderResult};
use crate::jenkinsfile::{Agent, Approve, Conditions, EnvVar, Options};
use crate::relation::Relation;

/// Argument key holding invocation-level context for every task template
pub const SYSTEM_ARG_KEY: &str = "_system_";

/// Name of the task that receives the source-control context
pub const CLONE_TASK_NAME: &str = "Clone";

/// Argument carrying the source-control context
pub const SCM_ARG_NAME: &str = "SCM";

/// Pipeline template spec
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineTemplate {
    /// Render engine; only the default graph engine exists
    #[serde(default)]
    pub engine: String,

    /// Inject the source-control argument bound to the clone task
    #[serde(default, rename = "withSCM")]
    pub with_scm: bool,

    #[serde(default)]
    pub agent: Option<Agent>,

    /// Stages in render order
    #[serde(default)]
    pub stages: Vec<Stage>,

    /// Post condition name to tasks
    #[serde(default)]
    pub post: Option<BTreeMap<String, Vec<Task>>>,

    /// Constant per-task values set by the template author
    #[serde(default, rename = "values")]
    pub const_values: Option<ConstValues>,

    #[serde(default)]
    pub options: Option<Options>,

    #[serde(default)]
    pub arguments: Vec<ArgumentSection>,

    #[serde(default)]
    pub environments: Vec<EnvVar>,
}

impl PipelineTemplate {
    /// Parse a spec from YAML; malformed specs are definition errors
    pub fn from_yaml(yaml: &str) -> RenderResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RenderError::definition(e.to_string()))
    }

    /// Tasks of all stages, in order
    pub fn stage_tasks(&self) -> impl Iterator<Item = &Task> {
        self.stages.iter().flat_map(|s| s.tasks.iter())
    }

    /// Tasks of all post conditions, by condition name
    pub fn post_tasks(&self) -> impl Iterator<Item = &Task> {
        self.post.iter().flat_map(|p| p.values()).flatten()
    }

    /// Stage tasks followed by post tasks
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.stage_tasks().chain(self.post_tasks())
    }

    /// Get a task by name
    pub fn get_task(&self, name: &str) -> Option<&Task> {
        self.all_tasks().find(|t| t.name == name)
    }

    /// Task template types referenced by any task, deduplicated in order
    pub fn task_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for task in self.all_tasks() {
            if !types.contains(&task.task_type.as_str()) {
                types.push(&task.task_type);
            }
        }
        types
    }

    /// All argument declarations, in section order
    pub fn all_arguments(&self) -> impl Iterator<Item = &ArgumentDeclaration> {
        arguments::all_arguments(&self.arguments)
    }

    /// Declared default values
    pub fn default_values(&self) -> Map<String, Value> {
        arguments::default_values(self.all_arguments())
    }

    /// Constant values for a task, if any
    pub fn const_values_for(&self, task: &str) -> Option<&TaskConstValue> {
        self.const_values.as_ref().and_then(|c| c.tasks.get(task))
    }
}

/// A stage: one task renders sequentially, several render in parallel
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Stage {
    #[serde(default)]
    pub name: String,

    /// `when` expressions for the stage
    #[serde(default)]
    pub conditions: Option<Conditions>,

    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Stage {
    pub fn is_parallel(&self) -> bool {
        self.tasks.len() > 1
    }
}

/// A reference to a task template plus per-task stage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Task name, unique across the template
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub agent: Option<Agent>,

    /// Name of the task template this task renders
    #[serde(rename = "type", default)]
    pub task_type: String,

    #[serde(default)]
    pub options: Option<Options>,

    #[serde(default)]
    pub conditions: Option<Conditions>,

    #[serde(default)]
    pub approve: Option<Approve>,

    #[serde(default)]
    pub environments: Vec<EnvVar>,

    #[serde(default)]
    pub relation: Option<Relation>,
}

impl Task {
    /// Whether the task takes part given the pipeline argument values
    pub fn is_visible(&self, values: &Map<String, Value>) -> bool {
        let visible = crate::relation::is_visible(self.relation.as_ref(), values);
        tracing::debug!(task = %self.name, visible, "task visibility");
        visible
    }
}

/// Constant values keyed by task name
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConstValues {
    #[serde(default)]
    pub tasks: HashMap<String, TaskConstValue>,
}

/// Constants applied to one task
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskConstValue {
    #[serde(default)]
    pub args: Map<String, Value>,

    #[serde(default)]
    pub options: Option<Options>,

    #[serde(default)]
    pub approve: Option<Approve>,
}

/// Kind of source-control repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScmType {
    #[serde(rename = "GIT")]
    Git,
    #[serde(rename = "SVN")]
    Svn,
}

impl FromStr for ScmType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "git" => Ok(ScmType::Git),
            "svn" => Ok(ScmType::Svn),
            other => Err(format!("unknown scm type '{}', expected git or svn", other)),
        }
    }
}

impl std::fmt::Display for ScmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScmType::Git => write!(f, "GIT"),
            ScmType::Svn => write!(f, "SVN"),
        }
    }
}

/// Source-control context of one render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScmInfo {
    #[serde(rename = "type")]
    pub scm_type: ScmType,

    #[serde(default)]
    pub repository_path: String,

    #[serde(default)]
    pub credentials_id: String,

    #[serde(default)]
    pub branch: String,
}

impl ScmInfo {
    /// Value handed to the clone task
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
