// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Error types for template resolution and rendering
//!
//! Every failure produced while composing a pipeline falls into one of three
//! kinds (definition, validation, render). Errors of one pass are collected
//! into a composite [`RenderError::Multiple`] instead of failing fast, and the
//! composite can be asked whether it contains a given kind.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipewright operations
pub type RenderResult<T> = Result<T, RenderError>;

/// The flat error taxonomy of the render core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The template itself is structurally invalid
    Definition,
    /// A supplied runtime value breaks its declared contract
    Validation,
    /// Substituting values into a script body failed
    Render,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definition => write!(f, "definition"),
            Self::Validation => write!(f, "validation"),
            Self::Render => write!(f, "render"),
        }
    }
}

/// Main error type for pipewright
#[derive(Error, Debug, Diagnostic)]
pub enum RenderError {
    // ─────────────────────────────────────────────────────────────────────────
    // Core Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Template definition error: {message}")]
    #[diagnostic(code(pipewright::definition))]
    Definition {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Validation error: {message}")]
    #[diagnostic(code(pipewright::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("Template render error: {message}")]
    #[diagnostic(code(pipewright::render))]
    Render { message: String },

    #[error("{} errors occurred", .errors.len())]
    #[diagnostic(code(pipewright::multiple))]
    Multiple {
        #[related]
        errors: Vec<RenderError>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Manifest file not found: {path}")]
    #[diagnostic(
        code(pipewright::manifest_not_found),
        help("Check the path, or point --task-templates at the directory holding your task templates")
    )]
    ManifestNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(pipewright::file_read_error))]
    FileRead { path: PathBuf, error: String },

    #[error("Unsupported file '{path}'")]
    #[diagnostic(
        code(pipewright::unsupported_file),
        help("Only .yaml and .yml manifests are supported")
    )]
    UnsupportedFile { path: PathBuf },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(pipewright::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(pipewright::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(pipewright::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(pipewright::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(pipewright::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for RenderError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for RenderError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for RenderError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl RenderError {
    /// Create a definition error
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
            help: None,
        }
    }

    /// Create a definition error with a hint
    pub fn definition_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a render error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Kind of this error, `None` for composites and boundary errors
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Definition { .. } => Some(ErrorKind::Definition),
            Self::Validation { .. } => Some(ErrorKind::Validation),
            Self::Render { .. } => Some(ErrorKind::Render),
            _ => None,
        }
    }

    /// Whether this error, or any error nested in it, has the given kind
    pub fn contains(&self, kind: ErrorKind) -> bool {
        match self {
            Self::Multiple { errors } => errors.iter().any(|e| e.contains(kind)),
            other => other.kind() == Some(kind),
        }
    }

    /// Number of leaf errors of the given kind
    pub fn count(&self, kind: ErrorKind) -> usize {
        match self {
            Self::Multiple { errors } => errors.iter().map(|e| e.count(kind)).sum(),
            other => usize::from(other.kind() == Some(kind)),
        }
    }

    pub fn is_definition_error(&self) -> bool {
        self.contains(ErrorKind::Definition)
    }

    pub fn is_validation_error(&self) -> bool {
        self.contains(ErrorKind::Validation)
    }

    pub fn is_render_error(&self) -> bool {
        self.contains(ErrorKind::Render)
    }

    /// Leaf errors in order, with composites flattened
    pub fn leaves(&self) -> Vec<&RenderError> {
        match self {
            Self::Multiple { errors } => errors.iter().flat_map(|e| e.leaves()).collect(),
            other => vec![other],
        }
    }
}

/// Collects the errors of one pass
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<RenderError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error; nested composites are flattened
    pub fn push(&mut self, error: RenderError) {
        match error {
            RenderError::Multiple { errors } => {
                for e in errors {
                    self.push(e);
                }
            }
            other => self.errors.push(other),
        }
    }

    /// Record the error of a fallible step, if any
    pub fn check<T>(&mut self, result: RenderResult<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.push(e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// A single error is returned bare, several become a composite
    pub fn into_result(mut self) -> RenderResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(RenderError::Multiple {
                errors: self.errors,
            }),
        }
    }
}

impl Extend<RenderError> for ErrorList {
    fn extend<I: IntoIterator<Item = RenderError>>(&mut self, iter: I) {
        for e in iter {
            self.push(e);
        }
    }
}
