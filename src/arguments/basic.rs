// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Scalar, object and array argument types

use regex::Regex;
use serde_json::{Map, Value};

use super::{type_names, ArgumentDeclaration, ArgumentType, TypeRegistry};
use crate::errors::{ErrorList, RenderError, RenderResult};
use crate::value;

/// `string`: trimmed text with optional pattern and length limits
pub struct StringType;

impl ArgumentType for StringType {
    fn name(&self) -> &str {
        type_names::STRING
    }

    fn validate_definition(
        &self,
        arg: &ArgumentDeclaration,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        if let Some(display) = &arg.display {
            if display.display_type == type_names::INTEGRATION_DISPLAY
                && !display.args.contains_key("types")
            {
                return Err(RenderError::definition(format!(
                    "{}.display.args requires key \"types\"",
                    arg.name
                )));
            }
        }

        if let Some(pattern) = arg.validation.as_ref().and_then(|v| v.pattern.as_deref()) {
            Regex::new(pattern).map_err(|e| {
                RenderError::definition(format!(
                    "{}.validation.pattern is not a valid regex: {}",
                    arg.name, e
                ))
            })?;
        }

        Ok(())
    }

    fn validate_value(
        &self,
        arg: &ArgumentDeclaration,
        value: &Value,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        let Some(text) = value.as_str() else {
            return Err(RenderError::validation(format!(
                "{} should be string, but got {}",
                arg.name,
                value::type_name(value)
            )));
        };

        let Some(validation) = &arg.validation else {
            return Ok(());
        };

        if let Some(max) = validation.max_length.filter(|m| *m > 0) {
            if text.chars().count() > max {
                return Err(RenderError::validation(format!(
                    "{} is too long, length should be at most {}",
                    arg.name, max
                )));
            }
        }

        if let Some(pattern) = validation.pattern.as_deref().filter(|p| !p.is_empty()) {
            let re = Regex::new(pattern).map_err(|e| {
                RenderError::definition(format!(
                    "{}.validation.pattern is not a valid regex: {}",
                    arg.name, e
                ))
            })?;
            if !re.is_match(text) {
                return Err(RenderError::validation(format!(
                    "{}'s value {} does not match the pattern {}",
                    arg.name, text, pattern
                )));
            }
        }

        Ok(())
    }

    fn normalize_value(&self, arg: &ArgumentDeclaration, value: Option<&Value>) -> Value {
        match value {
            Some(v) => Value::String(value::display(v).trim().to_string()),
            None => arg.default_or(Value::String(String::new())),
        }
    }
}

/// `boolean`: a bool, or a string spelling of one
pub struct BooleanType;

impl ArgumentType for BooleanType {
    fn name(&self) -> &str {
        type_names::BOOLEAN
    }

    fn validate_value(
        &self,
        arg: &ArgumentDeclaration,
        value: &Value,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        let ok = match value {
            Value::Bool(_) => true,
            Value::String(s) => value::parse_bool(s).is_some(),
            _ => false,
        };

        if ok {
            Ok(())
        } else {
            Err(RenderError::validation(format!(
                "{} should be boolean, but got {}",
                arg.name,
                value::type_name(value)
            )))
        }
    }

    fn normalize_value(&self, arg: &ArgumentDeclaration, value: Option<&Value>) -> Value {
        match value {
            Some(Value::String(s)) => value::parse_bool(s)
                .map(Value::Bool)
                .unwrap_or_else(|| Value::String(s.clone())),
            Some(v) => v.clone(),
            None => arg.default_or(Value::Bool(false)),
        }
    }
}

/// `int`: passed through unchecked
pub struct IntType;

impl ArgumentType for IntType {
    fn name(&self) -> &str {
        type_names::INT
    }

    fn validate_value(
        &self,
        _arg: &ArgumentDeclaration,
        _value: &Value,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        Ok(())
    }

    fn normalize_value(&self, arg: &ArgumentDeclaration, value: Option<&Value>) -> Value {
        value.cloned().unwrap_or_else(|| arg.default_or(Value::from(0)))
    }
}

/// `object`: accepts anything
pub struct ObjectType;

impl ArgumentType for ObjectType {
    fn name(&self) -> &str {
        type_names::OBJECT
    }

    fn validate_value(
        &self,
        _arg: &ArgumentDeclaration,
        _value: &Value,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        Ok(())
    }

    fn normalize_value(&self, arg: &ArgumentDeclaration, value: Option<&Value>) -> Value {
        value
            .cloned()
            .unwrap_or_else(|| arg.default_or(Value::Object(Map::new())))
    }
}

/// `array`: every element checked against `schema.items.type`
pub struct ArrayType;

impl ArrayType {
    fn item_type<'r>(
        arg: &ArgumentDeclaration,
        registry: &'r TypeRegistry,
    ) -> RenderResult<&'r dyn ArgumentType> {
        let items = arg
            .schema
            .as_ref()
            .and_then(|s| s.items.as_ref())
            .ok_or_else(|| {
                RenderError::definition(format!("{}.schema.items should not be empty", arg.name))
            })?;

        registry.get(&items.item_type).ok_or_else(|| {
            RenderError::definition(format!(
                "{}.schema.items.type={} is not supported",
                arg.name, items.item_type
            ))
        })
    }
}

impl ArgumentType for ArrayType {
    fn name(&self) -> &str {
        type_names::ARRAY
    }

    fn validate_definition(
        &self,
        arg: &ArgumentDeclaration,
        registry: &TypeRegistry,
    ) -> RenderResult<()> {
        let item_type = Self::item_type(arg, registry)?;
        if item_type.name() == type_names::ARRAY {
            return Err(RenderError::definition_with_help(
                format!("{}.schema.items.type should not be array", arg.name),
                "nested arrays are not supported, use an object item type",
            ));
        }
        item_type.validate_definition(arg, registry)
    }

    fn validate_value(
        &self,
        arg: &ArgumentDeclaration,
        value: &Value,
        registry: &TypeRegistry,
    ) -> RenderResult<()> {
        let Some(elements) = value.as_array() else {
            return Err(RenderError::validation(format!(
                "{}'s value should be an array, but got {}",
                arg.name,
                value::type_name(value)
            )));
        };

        let item_type = Self::item_type(arg, registry)?;
        let mut errs = ErrorList::new();
        for (i, element) in elements.iter().enumerate() {
            if let Err(e) = item_type.validate_value(arg, element, registry) {
                tracing::debug!(argument = %arg.name, index = i, "array element rejected");
                errs.push(e);
            }
        }
        errs.into_result()
    }

    fn normalize_value(&self, arg: &ArgumentDeclaration, value: Option<&Value>) -> Value {
        value
            .cloned()
            .unwrap_or_else(|| arg.default_or(Value::Null))
    }
}
