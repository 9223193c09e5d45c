// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Composite platform types
//!
//! These values arrive either as a map or as a JSON string holding one, and
//! must carry a fixed set of string fields. Their display type has to equal
//! their schema type.

use serde_json::Value;

use super::{type_names, ArgumentDeclaration, ArgumentType, TypeRegistry};
use crate::errors::{ErrorList, RenderError, RenderResult};
use crate::value;

fn check_display_type(arg: &ArgumentDeclaration, expected: &str) -> RenderResult<()> {
    if arg.display_type() != expected {
        return Err(RenderError::definition_with_help(
            format!("{}.display.type should be {}", arg.name, expected),
            "composite types are displayed with their own schema type",
        ));
    }
    Ok(())
}

/// Parse a serialized value; anything else is returned as is
fn decode(arg: &ArgumentDeclaration, value: &Value) -> RenderResult<Value> {
    match value {
        Value::String(text) => serde_json::from_str(text).map_err(|e| {
            RenderError::validation(format!(
                "argument {}({})'s value is not valid JSON: {}",
                arg.name,
                arg.schema_type(),
                e
            ))
        }),
        other => Ok(other.clone()),
    }
}

fn normalize(arg: &ArgumentDeclaration, value: Option<&Value>) -> Value {
    match value {
        Some(v) => decode(arg, v).unwrap_or(Value::Null),
        None => arg.default_or(Value::Null),
    }
}

/// A map type with required string fields
pub struct RequiredFieldsType {
    name: &'static str,
    fields: &'static [&'static str],
}

impl RequiredFieldsType {
    pub const fn new(name: &'static str, fields: &'static [&'static str]) -> Self {
        Self { name, fields }
    }
}

impl ArgumentType for RequiredFieldsType {
    fn name(&self) -> &str {
        self.name
    }

    fn validate_definition(
        &self,
        arg: &ArgumentDeclaration,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        check_display_type(arg, self.name)
    }

    fn validate_value(
        &self,
        arg: &ArgumentDeclaration,
        value: &Value,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        let decoded = decode(arg, value)?;
        if decoded.is_null() {
            return Ok(());
        }

        let Some(map) = decoded.as_object() else {
            return Err(RenderError::validation(format!(
                "argument {}({})'s value should be an object, but got {}",
                arg.name,
                self.name,
                value::type_name(&decoded)
            )));
        };

        for field in self.fields {
            match map.get(*field) {
                None => {
                    return Err(RenderError::validation(format!(
                        "{} is required for argument {}",
                        field, arg.name
                    )));
                }
                Some(Value::String(_)) => {}
                Some(other) => {
                    return Err(RenderError::validation(format!(
                        "argument {}.{} should be string, but got {}",
                        arg.name,
                        field,
                        value::type_name(other)
                    )));
                }
            }
        }

        Ok(())
    }

    fn normalize_value(&self, arg: &ArgumentDeclaration, value: Option<&Value>) -> Value {
        normalize(arg, value)
    }
}

/// `windcloud/k8senv`: a list of container environment entries
///
/// Each entry has a `name` and exactly one of `value` or
/// `valueFrom.configMapKeyRef` (with `name` and `key`).
pub struct K8sEnvType;

impl K8sEnvType {
    fn validate_entry(arg: &ArgumentDeclaration, index: usize, entry: &Value) -> RenderResult<()> {
        let Some(entry) = entry.as_object() else {
            return Err(RenderError::validation(format!(
                "argument {}[{}] should be an object, but got {}",
                arg.name,
                index,
                value::type_name(entry)
            )));
        };

        match entry.get("name") {
            None => {
                return Err(RenderError::validation(format!(
                    "[{}].name is required for argument {}",
                    index, arg.name
                )));
            }
            Some(name) if value::display(name).is_empty() => {
                return Err(RenderError::validation(format!(
                    "[{}].name should not be empty for argument {}",
                    index, arg.name
                )));
            }
            Some(_) => {}
        }

        match (entry.get("value"), entry.get("valueFrom")) {
            (Some(_), Some(_)) | (None, None) => Err(RenderError::validation(format!(
                "argument {}[{}] should set exactly one of value and valueFrom",
                arg.name, index
            ))),
            (Some(v), None) => {
                if value::display(v).is_empty() {
                    return Err(RenderError::validation(format!(
                        "[{}].value should not be empty for argument {}",
                        index, arg.name
                    )));
                }
                Ok(())
            }
            (None, Some(from)) => Self::validate_value_from(arg, index, from),
        }
    }

    fn validate_value_from(arg: &ArgumentDeclaration, index: usize, from: &Value) -> RenderResult<()> {
        let invalid = |why: &str| {
            RenderError::validation(format!(
                "argument {}[{}].valueFrom is invalid, {}",
                arg.name, index, why
            ))
        };

        let reference = from
            .as_object()
            .ok_or_else(|| invalid("it should be an object"))?
            .get("configMapKeyRef")
            .ok_or_else(|| invalid("configMapKeyRef is required"))?
            .as_object()
            .ok_or_else(|| invalid("configMapKeyRef should be an object"))?;

        let filled = |key: &str| {
            reference
                .get(key)
                .map(|v| !value::display(v).is_empty())
                .unwrap_or(false)
        };
        if !filled("name") || !filled("key") {
            return Err(invalid("configMapKeyRef needs name and key"));
        }

        Ok(())
    }
}

impl ArgumentType for K8sEnvType {
    fn name(&self) -> &str {
        type_names::K8S_ENV
    }

    fn validate_definition(
        &self,
        arg: &ArgumentDeclaration,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        check_display_type(arg, type_names::K8S_ENV)
    }

    fn validate_value(
        &self,
        arg: &ArgumentDeclaration,
        value: &Value,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        let decoded = decode(arg, value)?;
        if decoded.is_null() {
            return Ok(());
        }

        let Some(entries) = decoded.as_array() else {
            return Err(RenderError::validation(format!(
                "argument {}({})'s value should be an array, but got {}",
                arg.name,
                type_names::K8S_ENV,
                value::type_name(&decoded)
            )));
        };

        let mut errs = ErrorList::new();
        for (i, entry) in entries.iter().enumerate() {
            errs.check(Self::validate_entry(arg, i, entry));
        }
        errs.into_result()
    }

    fn normalize_value(&self, arg: &ArgumentDeclaration, value: Option<&Value>) -> Value {
        match normalize(arg, value) {
            Value::Null => arg.default_or(Value::Array(Vec::new())),
            v => v,
        }
    }
}
