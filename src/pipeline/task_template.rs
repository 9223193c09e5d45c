// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Task templates
//!
//! A task template is a script body plus the arguments it declares. It is
//! validated and rendered on its own, from the argument values a pipeline
//! routes to the task.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::definition::SYSTEM_ARG_KEY;
use crate::arguments::{ArgumentDeclaration, TypeRegistry};
use crate::errors::{ErrorList, RenderError, RenderResult};
use crate::jenkinsfile::Agent;
use crate::script::Template;

/// Task templates by type name
pub type TaskTemplates = HashMap<String, TaskTemplate>;

/// A reusable task: agent, script body and argument declarations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskTemplate {
    /// Body engine; only the default substitution engine exists
    #[serde(default)]
    pub engine: String,

    #[serde(default)]
    pub agent: Option<Agent>,

    /// Script body with `{{ ... }}` substitutions
    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub arguments: Vec<ArgumentDeclaration>,
}

impl TaskTemplate {
    pub fn from_yaml(yaml: &str) -> RenderResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| RenderError::definition(e.to_string()))
    }

    /// Check the body and every argument declaration
    pub fn validate_definition(&self, registry: &TypeRegistry) -> RenderResult<()> {
        let mut errs = ErrorList::new();

        if self.body.trim().is_empty() {
            errs.push(RenderError::definition("task template body should not be empty"));
        }

        for arg in &self.arguments {
            errs.check(arg.validate_definition(registry));
        }

        errs.into_result()
    }

    /// Check the values of every visible argument
    ///
    /// Visibility is evaluated against the same values, so a hidden argument
    /// is never checked.
    pub fn validate_values(&self, values: &Map<String, Value>, registry: &TypeRegistry) -> RenderResult<()> {
        let mut errs = ErrorList::new();

        for arg in &self.arguments {
            if !arg.is_visible(values) {
                tracing::debug!(argument = %arg.name, "argument hidden, skipping value validation");
                continue;
            }
            errs.check(arg.validate_value(values.get(&arg.name), registry));
        }

        errs.into_result()
    }

    /// Values exposed to the body: every declared argument normalized, plus
    /// the system value when present
    pub fn values(&self, values: &Map<String, Value>, registry: &TypeRegistry) -> Map<String, Value> {
        let mut out: Map<String, Value> = self
            .arguments
            .iter()
            .map(|arg| (arg.name.clone(), arg.normalize(values.get(&arg.name), registry)))
            .collect();

        if let Some(system) = values.get(SYSTEM_ARG_KEY) {
            out.insert(SYSTEM_ARG_KEY.to_string(), system.clone());
        }

        out
    }

    /// Validate, normalize and substitute into the body
    pub fn render(&self, values: &Map<String, Value>, registry: &TypeRegistry) -> RenderResult<String> {
        self.validate_definition(registry)?;
        self.validate_values(values, registry)?;

        let data = Value::Object(self.values(values, registry));
        Template::parse(&self.body)?.render(&data)
    }
}
