// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Typed argument declarations
//!
//! Pipeline and task templates declare the arguments they accept. Each
//! declaration names a schema type that is looked up in a [`TypeRegistry`]
//! for definition checks, value checks and value normalization.

mod basic;
mod composite;
mod registry;

pub use basic::{ArrayType, BooleanType, IntType, ObjectType, StringType};
pub use composite::{K8sEnvType, RequiredFieldsType};
pub use registry::{ArgumentType, TypeRegistry};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{RenderError, RenderResult};
use crate::relation::Relation;

/// Schema type identifiers of the built-in argument types
pub mod type_names {
    pub const STRING: &str = "string";
    pub const BOOLEAN: &str = "boolean";
    pub const INT: &str = "int";
    pub const OBJECT: &str = "object";
    pub const ARRAY: &str = "array";

    pub const IMAGE_REPOSITORY: &str = "windcloud/imagerepositorymix";
    pub const DOCKER_IMAGE_REPOSITORY: &str = "windcloud/dockerimagerepositorymix";
    pub const CODE_REPOSITORY: &str = "windcloud/coderepositorymix";
    pub const TOOL_BINDING: &str = "windcloud/toolbinding";
    pub const CONTAINER: &str = "windcloud/newk8scontainermix";
    pub const V1_CONTAINER: &str = "windcloud/v1newk8scontainermix";
    pub const K8S_ENV: &str = "windcloud/k8senv";

    /// Display type of string arguments bound to a platform integration
    pub const INTEGRATION_DISPLAY: &str = "windcloud/integration";
}

/// Text in the two languages the display layer supports
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalizedText {
    #[serde(rename = "zh-CN", default)]
    pub zh_cn: String,

    #[serde(default)]
    pub en: String,
}

impl LocalizedText {
    pub fn new(zh_cn: &str, en: &str) -> Self {
        Self {
            zh_cn: zh_cn.to_string(),
            en: en.to_string(),
        }
    }
}

/// How the argument is presented to whoever fills it in
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DisplayInfo {
    #[serde(rename = "type", default)]
    pub display_type: String,

    #[serde(default)]
    pub name: LocalizedText,

    #[serde(default)]
    pub args: Map<String, Value>,

    #[serde(default)]
    pub description: LocalizedText,
}

/// Schema type of an argument
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArgumentSchema {
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Element type, for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<SchemaItems>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaItems {
    #[serde(rename = "type")]
    pub item_type: String,
}

/// Extra constraints for string values
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentValidation {
    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(default)]
    pub max_length: Option<usize>,
}

/// A single declared argument
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArgumentDeclaration {
    /// Argument name, unique within its template
    pub name: String,

    /// Binding paths, `task.args.field` or `task.some.field`
    #[serde(default)]
    pub binding: Vec<String>,

    #[serde(default)]
    pub schema: Option<ArgumentSchema>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub validation: Option<ArgumentValidation>,

    #[serde(default)]
    pub display: Option<DisplayInfo>,

    #[serde(default)]
    pub relation: Option<Relation>,
}

impl ArgumentDeclaration {
    /// Declared schema type name, empty when no schema is set
    pub fn schema_type(&self) -> &str {
        self.schema
            .as_ref()
            .map(|s| s.schema_type.as_str())
            .unwrap_or_default()
    }

    /// Declared display type, empty when no display info is set
    pub fn display_type(&self) -> &str {
        self.display
            .as_ref()
            .map(|d| d.display_type.as_str())
            .unwrap_or_default()
    }

    /// Check the declaration itself
    pub fn validate_definition(&self, registry: &TypeRegistry) -> RenderResult<()> {
        if self.name.trim().is_empty() {
            return Err(RenderError::definition("argument name should not be empty"));
        }

        let Some(schema) = &self.schema else {
            return Err(RenderError::definition(format!(
                "{}.schema is required",
                self.name
            )));
        };

        let Some(ty) = registry.get(&schema.schema_type) else {
            return Err(RenderError::definition_with_help(
                format!(
                    "{}.schema.type={} is not supported",
                    self.name, schema.schema_type
                ),
                format!("Supported types: {}", registry.type_names().join(", ")),
            ));
        };

        let Some(display) = &self.display else {
            return Err(RenderError::definition(format!(
                "{}.display is required",
                self.name
            )));
        };
        if display.display_type.is_empty() {
            return Err(RenderError::definition(format!(
                "{}.display.type is required",
                self.name
            )));
        }
        if display.name.zh_cn.is_empty() {
            return Err(RenderError::definition(format!(
                "{}.display.name.zh-CN is required",
                self.name
            )));
        }
        if display.name.en.is_empty() {
            return Err(RenderError::definition(format!(
                "{}.display.name.en is required",
                self.name
            )));
        }

        if let Some(relation) = &self.relation {
            relation.validate_definition()?;
        }

        ty.validate_definition(self, registry)
    }

    /// Check a supplied value; `None` and null count as missing
    pub fn validate_value(&self, value: Option<&Value>, registry: &TypeRegistry) -> RenderResult<()> {
        let value = match value {
            Some(v) if !v.is_null() => v,
            _ if self.required => {
                return Err(RenderError::validation(format!("{} is required", self.name)));
            }
            _ => return Ok(()),
        };

        let ty = registry.get(self.schema_type()).ok_or_else(|| {
            RenderError::definition(format!(
                "{}.schema.type={} is not supported",
                self.name,
                self.schema_type()
            ))
        })?;

        ty.validate_value(self, value, registry)
    }

    /// Value handed to script bodies, with type defaults applied
    pub fn normalize(&self, value: Option<&Value>, registry: &TypeRegistry) -> Value {
        match registry.get(self.schema_type()) {
            Some(ty) => ty.normalize_value(self, value.filter(|v| !v.is_null())),
            None => value.cloned().unwrap_or(Value::Null),
        }
    }

    /// Whether this argument takes part given the other argument values
    pub fn is_visible(&self, values: &Map<String, Value>) -> bool {
        let visible = crate::relation::is_visible(self.relation.as_ref(), values);
        tracing::debug!(argument = %self.name, visible, "argument visibility");
        visible
    }

    /// Declared default, or the supplied fallback
    pub(crate) fn default_or(&self, fallback: Value) -> Value {
        self.default.clone().unwrap_or(fallback)
    }
}

/// A titled group of arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentSection {
    #[serde(default)]
    pub display_name: LocalizedText,

    #[serde(default)]
    pub items: Vec<ArgumentDeclaration>,
}

/// All argument declarations of a template, in section order
pub fn all_arguments(sections: &[ArgumentSection]) -> impl Iterator<Item = &ArgumentDeclaration> {
    sections.iter().flat_map(|s| s.items.iter())
}

/// Defaults of every declaration that has one
pub fn default_values<'a>(
    declarations: impl IntoIterator<Item = &'a ArgumentDeclaration>,
) -> Map<String, Value> {
    declarations
        .into_iter()
        .filter_map(|arg| arg.default.clone().map(|d| (arg.name.clone(), d)))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A declaration that passes the generic definition checks
    pub(crate) fn declaration(name: &str, schema_type: &str, display_type: &str) -> ArgumentDeclaration {
        ArgumentDeclaration {
            name: name.into(),
            schema: Some(ArgumentSchema {
                schema_type: schema_type.into(),
                items: None,
            }),
            display: Some(DisplayInfo {
                display_type: display_type.into(),
                name: LocalizedText::new("名称", "Name"),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_declaration_yaml() {
        let yaml = r#"
name: imageTag
binding:
  - build.args.tag
schema:
  type: string
required: true
default: latest
validation:
  pattern: "^[a-z0-9.-]+$"
  maxLength: 64
display:
  type: string
  name:
    zh-CN: 镜像标签
    en: Image tag
"#;
        let arg: ArgumentDeclaration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(arg.schema_type(), "string");
        assert_eq!(arg.binding, vec!["build.args.tag"]);
        assert_eq!(arg.default, Some(json!("latest")));
        assert_eq!(arg.validation.as_ref().unwrap().max_length, Some(64));
        assert!(arg.validate_definition(TypeRegistry::global()).is_ok());
    }

    #[test]
    fn test_unknown_type_is_definition_error() {
        let arg = declaration("x", "float", "float");
        let err = arg.validate_definition(TypeRegistry::global()).unwrap_err();
        assert!(err.is_definition_error());
    }

    #[test]
    fn test_missing_display_name_is_definition_error() {
        let mut arg = declaration("x", "string", "string");
        arg.display.as_mut().unwrap().name.en.clear();
        let err = arg.validate_definition(TypeRegistry::global()).unwrap_err();
        assert!(err.to_string().contains("display.name.en"));
    }

    #[test]
    fn test_required_null_is_validation_error_for_every_type() {
        let registry = TypeRegistry::global();
        for ty in registry.type_names() {
            let mut arg = declaration("x", &ty, &ty);
            arg.required = true;
            let err = arg.validate_value(Some(&Value::Null), registry).unwrap_err();
            assert!(err.is_validation_error(), "type {}", ty);
            let err = arg.validate_value(None, registry).unwrap_err();
            assert!(err.is_validation_error(), "type {}", ty);
        }
    }

    #[test]
    fn test_optional_null_is_accepted() {
        let arg = declaration("x", "string", "string");
        assert!(arg.validate_value(None, TypeRegistry::global()).is_ok());
    }

    #[test]
    fn test_sections_flatten_in_order() {
        let sections = vec![
            ArgumentSection {
                items: vec![declaration("a", "string", "string")],
                ..Default::default()
            },
            ArgumentSection {
                items: vec![
                    declaration("b", "int", "int"),
                    declaration("c", "boolean", "boolean"),
                ],
                ..Default::default()
            },
        ];
        let names: Vec<_> = all_arguments(&sections).map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_default_values() {
        let mut a = declaration("a", "string", "string");
        a.default = Some(json!("x"));
        let b = declaration("b", "int", "int");
        let defaults = default_values([&a, &b]);
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults["a"], json!("x"));
    }
}
