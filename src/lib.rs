// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! # pipewright - Jenkins pipeline renderer
//!
//! `pipewright` renders typed pipeline templates into formatted Jenkins
//! declarative pipeline scripts.
//!
//! ## Features
//!
//! - **Typed arguments** - A registry of scalar and composite argument types
//! - **Visibility relations** - Show or hide arguments and tasks from other values
//! - **Bindings** - Route one argument value to many task fields
//! - **Script bodies** - Task templates with a small substitution language
//! - **Formatting** - Brace-aware re-indentation of the rendered script
//!
//! ## Quick Start
//!
//! ```bash
//! # Render a pipeline template
//! pipewright render pipeline.yaml --task-templates tasks/ --set timeout=300
//!
//! # Check every manifest in a directory
//! pipewright validate -d templates/
//!
//! # List build variables for a git pipeline
//! pipewright vars --scm-type git
//! ```

pub mod arguments;
pub mod cli;
pub mod errors;
pub mod formatter;
pub mod jenkinsfile;
pub mod manifest;
pub mod pipeline;
pub mod relation;
pub mod script;
pub mod utils;
pub mod value;

// Re-export commonly used types
pub use arguments::{ArgumentDeclaration, TypeRegistry};
pub use errors::{ErrorKind, RenderError, RenderResult};
pub use manifest::Manifest;
pub use pipeline::{Composer, PipelineTemplate, ScmInfo, TaskTemplate, TaskTemplates};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
