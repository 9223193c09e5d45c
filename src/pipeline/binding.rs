// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Binding resolution
//!
//! Routes pipeline argument values onto tasks through each argument's
//! binding paths. `task.args.field` sets a task template argument;
//! `task.some.path` overrides a task field such as `options.timeout`.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::definition::SYSTEM_ARG_KEY;
use crate::arguments::ArgumentDeclaration;
use crate::errors::{ErrorList, RenderError, RenderResult};

/// Scope segment that targets task template arguments
const ARGS_SCOPE: &str = "args";

/// Where one binding path points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    /// A task template argument
    TemplateArg { task: String, field: String },
    /// A dotted field path on the task itself
    Field { task: String, path: String },
}

impl BindingTarget {
    /// Parse `task.args.field` or `task.field.path`
    pub fn parse(argument: &str, binding: &str) -> RenderResult<Self> {
        let malformed = || {
            RenderError::definition_with_help(
                format!("{}'s binding {:?} is malformed", argument, binding),
                "bindings look like task.args.field or task.options.timeout",
            )
        };

        let segments: Vec<&str> = binding.split('.').collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(malformed());
        }

        let task = segments[0].to_string();
        if segments[1] == ARGS_SCOPE {
            let field = segments.get(2).ok_or_else(malformed)?;
            Ok(BindingTarget::TemplateArg {
                task,
                field: field.to_string(),
            })
        } else {
            Ok(BindingTarget::Field {
                task,
                path: segments[1..].join("."),
            })
        }
    }

    pub fn task(&self) -> &str {
        match self {
            BindingTarget::TemplateArg { task, .. } | BindingTarget::Field { task, .. } => task,
        }
    }
}

/// Values routed to one task
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskBindings {
    /// Task template argument values by field name
    pub template_args: Map<String, Value>,
    /// Direct field overrides by dotted path
    pub field_overrides: BTreeMap<String, Value>,
}

/// Bindings of every task plus the shared system value
#[derive(Debug, Clone, Default)]
pub struct ResolvedBindings {
    tasks: HashMap<String, TaskBindings>,
    system: Option<Value>,
}

impl ResolvedBindings {
    /// Bindings for a task; empty when nothing binds to it
    pub fn for_task(&self, task: &str) -> TaskBindings {
        let mut bindings = self.tasks.get(task).cloned().unwrap_or_default();
        if let Some(system) = &self.system {
            bindings
                .template_args
                .insert(SYSTEM_ARG_KEY.to_string(), system.clone());
        }
        bindings
    }

    /// Names of tasks that some binding points at
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }
}

/// Route argument values along every binding path
///
/// An argument without a value binds null. Malformed paths are collected
/// and reported together.
pub fn resolve<'a>(
    declarations: impl IntoIterator<Item = &'a ArgumentDeclaration>,
    values: &Map<String, Value>,
) -> RenderResult<ResolvedBindings> {
    let mut resolved = ResolvedBindings {
        tasks: HashMap::new(),
        system: values.get(SYSTEM_ARG_KEY).cloned(),
    };
    let mut errs = ErrorList::new();

    for declaration in declarations {
        let value = values.get(&declaration.name).cloned().unwrap_or(Value::Null);

        for binding in &declaration.binding {
            let Some(target) = errs.check(BindingTarget::parse(&declaration.name, binding)) else {
                continue;
            };

            let task = resolved.tasks.entry(target.task().to_string()).or_default();
            match target {
                BindingTarget::TemplateArg { field, .. } => {
                    task.template_args.insert(field, value.clone());
                }
                BindingTarget::Field { path, .. } => {
                    task.field_overrides.insert(path, value.clone());
                }
            }
        }
    }

    errs.into_result()?;
    Ok(resolved)
}
