// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Pipeline templates and their composition
//!
//! This module defines pipeline and task templates, routes argument values
//! onto tasks, and composes everything into a Jenkins pipeline document.

mod binding;
mod composer;
mod definition;
mod globals;
mod task_template;
mod validation;

pub use binding::{resolve as resolve_bindings, BindingTarget, ResolvedBindings, TaskBindings};
pub use composer::{Composer, Phase, ResolvedTask};
pub use definition::*;
pub use globals::{global_vars, GlobalVar};
pub use task_template::{TaskTemplate, TaskTemplates};
pub use validation::{PipelineValidator, ValidationResult};
