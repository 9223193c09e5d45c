// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline template validation
//!
//! Checks a template definition before any values are bound to it.

use std::collections::HashSet;

use super::binding::BindingTarget;
use super::definition::{PipelineTemplate, Stage, Task, CLONE_TASK_NAME};
use crate::arguments::TypeRegistry;
use crate::errors::{ErrorList, RenderError, RenderResult};

/// Pipeline template validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline template definition
    pub fn validate(template: &PipelineTemplate, registry: &TypeRegistry) -> ValidationResult {
        let mut result = ValidationResult::new();

        if template.stages.is_empty() {
            result.add_error(RenderError::definition("stages should be one at least"));
        }

        let mut stage_names = HashSet::new();
        for stage in &template.stages {
            Self::validate_stage(stage, &mut result);
            if !stage.name.trim().is_empty() && !stage_names.insert(stage.name.as_str()) {
                result.add_warning(format!("Duplicate stage name: '{}'", stage.name));
            }
        }

        let mut task_names = HashSet::new();
        for task in template.all_tasks() {
            if !task_names.insert(task.name.as_str()) {
                result.add_error(RenderError::definition(format!(
                    "task name {} should be unique",
                    task.name
                )));
            }
            Self::validate_task(task, &mut result);
        }

        for arg in template.all_arguments() {
            if let Err(e) = arg.validate_definition(registry) {
                result.add_error(e);
            }

            for binding in &arg.binding {
                match BindingTarget::parse(&arg.name, binding) {
                    Ok(target) => {
                        let task = target.task();
                        if !task_names.contains(task) && task != CLONE_TASK_NAME {
                            result.add_warning(format!(
                                "Argument '{}' binds to unknown task '{}'",
                                arg.name, task
                            ));
                        }
                    }
                    Err(e) => result.add_error(e),
                }
            }
        }

        result
    }

    fn validate_stage(stage: &Stage, result: &mut ValidationResult) {
        if stage.name.trim().is_empty() {
            result.add_error(RenderError::definition("stage.name should not be empty"));
        }

        if stage.tasks.is_empty() {
            result.add_error(RenderError::definition(format!(
                "stage '{}' should have one task at least",
                stage.name
            )));
        }
    }

    fn validate_task(task: &Task, result: &mut ValidationResult) {
        if task.name.trim().is_empty() {
            result.add_error(RenderError::definition("task.name should not be empty"));
        }

        if task.task_type.trim().is_empty() {
            result.add_error(RenderError::definition(format!(
                "task {}.type should not be empty",
                task.name
            )));
        }

        if task.name.contains('.') {
            result.add_error(RenderError::definition_with_help(
                format!("task name {} should not contain a dot", task.name),
                "dots separate the segments of binding paths",
            ));
        }

        if let Some(relation) = &task.relation {
            if let Err(e) = relation.validate_definition() {
                result.add_error(e);
            }
        }
    }
}

/// Result of pipeline template validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: ErrorList,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: RenderError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Log the warnings and return the collected errors
    pub fn into_result(self) -> RenderResult<()> {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
        self.errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn task(name: &str, task_type: &str) -> Task {
        Task {
            name: name.into(),
            task_type: task_type.into(),
            ..Default::default()
        }
    }

    fn stage(name: &str, tasks: Vec<Task>) -> Stage {
        Stage {
            name: name.into(),
            tasks,
            ..Default::default()
        }
    }

    fn validate(template: &PipelineTemplate) -> ValidationResult {
        PipelineValidator::validate(template, TypeRegistry::global())
    }

    #[test]
    fn test_validate_empty_template() {
        let result = validate(&PipelineTemplate::default());
        assert!(!result.is_valid());
        let err = result.into_result().unwrap_err();
        assert!(err.to_string().contains("stages should be one at least"));
    }

    #[test]
    fn test_validate_duplicate_task_names() {
        let mut template = PipelineTemplate {
            stages: vec![
                stage("a", vec![task("build", "maven")]),
                stage("b", vec![task("test", "maven")]),
            ],
            ..Default::default()
        };
        template.post = Some([("always".to_string(), vec![task("build", "mail")])].into());

        let err = validate(&template).into_result().unwrap_err();
        assert!(err.to_string().contains("should be unique"));
    }

    #[test]
    fn test_validate_stage_and_task_shape() {
        let template = PipelineTemplate {
            stages: vec![
                stage("", vec![task("a.b", "")]),
                stage("empty", vec![]),
            ],
            ..Default::default()
        };

        let err = validate(&template).into_result().unwrap_err();
        // empty stage name, empty stage, dotted task name, empty type
        assert_eq!(err.count(ErrorKind::Definition), 4);
    }

    #[test]
    fn test_duplicate_stage_name_is_only_a_warning() {
        let template = PipelineTemplate {
            stages: vec![
                stage("build", vec![task("one", "maven")]),
                stage("build", vec![task("two", "maven")]),
            ],
            ..Default::default()
        };

        let result = validate(&template);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("Duplicate stage name")));
    }

    #[test]
    fn test_binding_checks() {
        let yaml = r#"
stages:
  - name: build
    tasks:
      - name: build
        type: maven
arguments:
  - items:
      - name: goal
        binding: ["build.args.goal", "deploy.args.goal", "oops"]
        schema:
          type: string
        display:
          type: string
          name:
            zh-CN: 目标
            en: Goal
"#;
        let template = PipelineTemplate::from_yaml(yaml).unwrap();
        let result = validate(&template);
        assert!(result.warnings.iter().any(|w| w.contains("unknown task 'deploy'")));
        assert!(result.into_result().unwrap_err().is_definition_error());
    }
}
