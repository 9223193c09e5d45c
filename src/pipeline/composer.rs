// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline composition
//!
//! Turns a pipeline template, its task templates and a set of argument
//! values into a [`jenkinsfile::Pipeline`]. Composition runs a fixed
//! sequence of [`Phase`]s and never mutates the template: per-task state
//! lives in [`ResolvedTask`] values owned by one composition.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::binding;
use super::definition::{
    PipelineTemplate, ScmInfo, Task, CLONE_TASK_NAME, SCM_ARG_NAME, SYSTEM_ARG_KEY,
};
use super::task_template::{TaskTemplate, TaskTemplates};
use super::validation::PipelineValidator;
use crate::arguments::{type_names, ArgumentDeclaration, ArgumentSchema, TypeRegistry};
use crate::errors::{ErrorList, RenderError, RenderResult};
use crate::jenkinsfile::{
    self, Approve, Options, PostCondition, StageBody, CLEAN_WORKSPACE_SCRIPT, POST_ALWAYS,
};
use crate::value;

/// Steps of one composition, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ValidateDefinition,
    MergeDefaults,
    InjectScm,
    ValidateValues,
    AttachTaskTemplates,
    ApplyConstants,
    ResolveBindings,
    MarkVisibility,
    BuildDocument,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::ValidateDefinition => "validate-definition",
            Phase::MergeDefaults => "merge-defaults",
            Phase::InjectScm => "inject-scm",
            Phase::ValidateValues => "validate-values",
            Phase::AttachTaskTemplates => "attach-task-templates",
            Phase::ApplyConstants => "apply-constants",
            Phase::ResolveBindings => "resolve-bindings",
            Phase::MarkVisibility => "mark-visibility",
            Phase::BuildDocument => "build-document",
        };
        write!(f, "{}", name)
    }
}

/// A task with everything one composition resolved for it
#[derive(Debug, Clone)]
pub struct ResolvedTask<'a> {
    pub task: &'a Task,
    pub template: &'a TaskTemplate,
    /// Task template argument values
    pub args: Map<String, Value>,
    pub options: Option<Options>,
    pub approve: Option<Approve>,
    pub visible: bool,
}

impl<'a> ResolvedTask<'a> {
    fn new(task: &'a Task, template: &'a TaskTemplate) -> Self {
        Self {
            task,
            template,
            args: Map::new(),
            options: task.options.clone(),
            approve: task.approve.clone(),
            visible: true,
        }
    }

    /// Constant args are set as is; constant timeouts replace the task's
    fn apply_constants(&mut self, template: &PipelineTemplate) {
        let Some(constants) = template.const_values_for(&self.task.name) else {
            return;
        };

        if let Some(options) = &constants.options {
            self.options.get_or_insert_with(Options::default).timeout = options.timeout;
        }
        if let Some(approve) = &constants.approve {
            self.approve.get_or_insert_with(Approve::default).timeout = approve.timeout;
        }
        for (key, v) in &constants.args {
            self.args.insert(key.clone(), v.clone());
        }
    }

    /// Layer bound values under the constants; the system value always lands
    fn apply_bindings(&mut self, bindings: binding::TaskBindings) -> RenderResult<()> {
        for (key, v) in bindings.template_args {
            if key == SYSTEM_ARG_KEY || !self.args.contains_key(&key) {
                self.args.insert(key, v);
            }
        }

        let mut errs = ErrorList::new();
        for (path, v) in &bindings.field_overrides {
            errs.check(self.apply_field_override(path, v));
        }
        errs.into_result()
    }

    /// Overwrite a task field through a direct binding; null leaves it alone
    fn apply_field_override(&mut self, path: &str, v: &Value) -> RenderResult<()> {
        if v.is_null() {
            return Ok(());
        }

        let task = self.task;
        let timeout = || {
            value::as_integer(v)
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| {
                    RenderError::validation(format!(
                        "{}.{}'s value {} should be int, but got {}",
                        task.name,
                        path,
                        value::display(v),
                        value::type_name(v)
                    ))
                })
        };

        match path {
            "options.timeout" => {
                let n = timeout()?;
                self.options.get_or_insert_with(Options::default).timeout = Some(n);
            }
            "approve.timeout" => {
                let n = timeout()?;
                self.approve.get_or_insert_with(Approve::default).timeout = n;
            }
            other => {
                tracing::warn!(task = %task.name, path = other, "ignoring unsupported binding path");
            }
        }
        Ok(())
    }

    /// Rendered script body of the task
    pub fn script(&self, registry: &TypeRegistry) -> RenderResult<String> {
        self.template.render(&self.args, registry)
    }

    /// Stage running this task's script
    pub fn to_stage(&self, registry: &TypeRegistry) -> RenderResult<jenkinsfile::Stage> {
        let script = self.script(registry)?;

        Ok(jenkinsfile::Stage {
            name: self.task.name.clone(),
            agent: self.task.agent.clone().or_else(|| self.template.agent.clone()),
            options: self.options.clone(),
            conditions: self.task.conditions.clone(),
            approve: self.approve.clone(),
            environments: self.task.environments.clone(),
            body: StageBody::Steps(script),
        })
    }
}

/// The implicit argument carrying source-control context to the clone task
fn scm_argument() -> ArgumentDeclaration {
    ArgumentDeclaration {
        name: SCM_ARG_NAME.to_string(),
        binding: vec![format!("{}.args.{}", CLONE_TASK_NAME, SCM_ARG_NAME)],
        schema: Some(ArgumentSchema {
            schema_type: type_names::OBJECT.to_string(),
            items: None,
        }),
        required: true,
        ..Default::default()
    }
}

/// Composes one pipeline template against task templates
pub struct Composer<'a> {
    template: &'a PipelineTemplate,
    task_templates: &'a TaskTemplates,
    registry: &'a TypeRegistry,
}

impl<'a> Composer<'a> {
    pub fn new(template: &'a PipelineTemplate, task_templates: &'a TaskTemplates) -> Self {
        Self {
            template,
            task_templates,
            registry: TypeRegistry::global(),
        }
    }

    /// Use a registry other than the built-in one
    pub fn with_registry(mut self, registry: &'a TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    fn enter(&self, phase: Phase) {
        tracing::debug!(phase = %phase, "composing pipeline");
    }

    /// Run every phase and build the render-ready document
    pub fn compose(
        &self,
        values: &Map<String, Value>,
        scm: Option<&ScmInfo>,
    ) -> RenderResult<jenkinsfile::Pipeline> {
        let template = self.template;

        self.enter(Phase::ValidateDefinition);
        PipelineValidator::validate(template, self.registry).into_result()?;

        self.enter(Phase::MergeDefaults);
        let mut values = merge_defaults(template.default_values(), values);

        self.enter(Phase::InjectScm);
        let scm_arg = template.with_scm.then(scm_argument);
        if scm_arg.is_some() {
            values.insert(
                SCM_ARG_NAME.to_string(),
                scm.map(ScmInfo::to_value).unwrap_or(Value::Null),
            );
        }
        let declarations: Vec<&ArgumentDeclaration> =
            template.all_arguments().chain(scm_arg.iter()).collect();

        self.enter(Phase::ValidateValues);
        self.validate_values(&declarations, &values)?;

        // errors from here on are collected per task and reported together
        let mut errs = ErrorList::new();

        self.enter(Phase::AttachTaskTemplates);
        let mut tasks: HashMap<&str, ResolvedTask<'_>> = HashMap::new();
        for task in template.all_tasks() {
            match self.task_templates.get(&task.task_type) {
                Some(task_template) => {
                    tasks.insert(task.name.as_str(), ResolvedTask::new(task, task_template));
                }
                None => errs.push(RenderError::validation(format!(
                    "require definition of task template named {}",
                    task.task_type
                ))),
            }
        }

        self.enter(Phase::ApplyConstants);
        for task in tasks.values_mut() {
            task.apply_constants(template);
        }

        self.enter(Phase::ResolveBindings);
        let bindings = binding::resolve(declarations.iter().copied(), &values)?;
        for name in bindings.task_names() {
            if template.get_task(name).is_none() {
                tracing::warn!(task = name, "binding targets a task that is not in the template");
            }
        }
        for task in tasks.values_mut() {
            errs.check(task.apply_bindings(bindings.for_task(&task.task.name)));
        }

        self.enter(Phase::MarkVisibility);
        for task in tasks.values_mut() {
            task.visible = task.task.is_visible(&values);
        }

        self.enter(Phase::BuildDocument);
        let stages = self.build_stages(&tasks, &mut errs);
        let post = self.build_post(&tasks, &mut errs);

        errs.into_result()?;

        Ok(jenkinsfile::Pipeline {
            agent: template.agent.clone(),
            options: template.options.clone(),
            environments: template.environments.clone(),
            stages,
            post,
        })
    }

    /// Check supplied values of every visible argument
    fn validate_values(
        &self,
        declarations: &[&ArgumentDeclaration],
        values: &Map<String, Value>,
    ) -> RenderResult<()> {
        let mut errs = ErrorList::new();
        for arg in declarations {
            if !arg.is_visible(values) {
                tracing::debug!(argument = %arg.name, "argument hidden, skipping value validation");
                continue;
            }
            errs.check(arg.validate_value(values.get(&arg.name), self.registry));
        }
        errs.into_result()
    }

    fn build_stages(
        &self,
        tasks: &HashMap<&str, ResolvedTask<'_>>,
        errs: &mut ErrorList,
    ) -> Vec<jenkinsfile::Stage> {
        let mut stages = Vec::new();

        for stage in &self.template.stages {
            if let [task] = stage.tasks.as_slice() {
                let Some(resolved) = tasks.get(task.name.as_str()) else {
                    continue;
                };
                if !resolved.visible {
                    tracing::debug!(task = %task.name, "task hidden, skipping stage");
                    continue;
                }
                if let Some(mut rendered) = errs.check(resolved.to_stage(self.registry)) {
                    if rendered.conditions.is_none() {
                        rendered.conditions = stage.conditions.clone();
                    }
                    stages.push(rendered);
                }
                continue;
            }

            let mut children = Vec::new();
            for task in &stage.tasks {
                let Some(resolved) = tasks.get(task.name.as_str()) else {
                    continue;
                };
                if !resolved.visible {
                    tracing::debug!(task = %task.name, stage = %stage.name, "task hidden, skipping parallel branch");
                    continue;
                }
                if let Some(rendered) = errs.check(resolved.to_stage(self.registry)) {
                    children.push(rendered);
                }
            }

            let mut group = jenkinsfile::Stage::new(stage.name.clone(), StageBody::Parallel(children));
            group.conditions = stage.conditions.clone();
            stages.push(group);
        }

        stages
    }

    /// Post conditions render every task regardless of visibility
    fn build_post(
        &self,
        tasks: &HashMap<&str, ResolvedTask<'_>>,
        errs: &mut ErrorList,
    ) -> Vec<PostCondition> {
        let Some(post) = self.template.post.as_ref().filter(|p| !p.is_empty()) else {
            return vec![PostCondition {
                name: POST_ALWAYS.to_string(),
                scripts: CLEAN_WORKSPACE_SCRIPT.to_string(),
            }];
        };

        post.iter()
            .map(|(name, post_tasks)| {
                let mut scripts = String::new();
                for task in post_tasks {
                    if let Some(resolved) = tasks.get(task.name.as_str()) {
                        if let Some(script) = errs.check(resolved.script(self.registry)) {
                            scripts.push_str(&script);
                        }
                    }
                }
                PostCondition {
                    name: name.clone(),
                    scripts,
                }
            })
            .collect()
    }

    /// Compose and render the pipeline script
    pub fn render(&self, values: &Map<String, Value>, scm: Option<&ScmInfo>) -> RenderResult<String> {
        Ok(self.compose(values, scm)?.render())
    }

    /// Compose, render and re-indent the pipeline script
    pub fn render_and_format(
        &self,
        values: &Map<String, Value>,
        scm: Option<&ScmInfo>,
    ) -> RenderResult<String> {
        Ok(self.compose(values, scm)?.render_and_format())
    }
}

/// Supplied values win over declared defaults
fn merge_defaults(defaults: Map<String, Value>, supplied: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults;
    for (key, v) in supplied {
        merged.insert(key.clone(), v.clone());
    }
    merged
}

impl PipelineTemplate {
    /// Check the template definition
    pub fn validate_definition(&self, registry: &TypeRegistry) -> RenderResult<()> {
        PipelineValidator::validate(self, registry).into_result()
    }

    /// Check argument values after merging defaults
    pub fn validate_values(&self, values: &Map<String, Value>, registry: &TypeRegistry) -> RenderResult<()> {
        let merged = merge_defaults(self.default_values(), values);
        let declarations: Vec<&ArgumentDeclaration> = self.all_arguments().collect();
        Composer::new(self, &TaskTemplates::new())
            .with_registry(registry)
            .validate_values(&declarations, &merged)
    }

    /// Render the pipeline script
    pub fn render(
        &self,
        task_templates: &TaskTemplates,
        values: &Map<String, Value>,
        scm: Option<&ScmInfo>,
    ) -> RenderResult<String> {
        Composer::new(self, task_templates).render(values, scm)
    }

    /// Render the pipeline script and re-indent it
    pub fn render_and_format(
        &self,
        task_templates: &TaskTemplates,
        values: &Map<String, Value>,
        scm: Option<&ScmInfo>,
    ) -> RenderResult<String> {
        Composer::new(self, task_templates).render_and_format(values, scm)
    }
}
