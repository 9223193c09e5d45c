// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Argument type registry

use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{
    type_names, ArgumentDeclaration, ArrayType, BooleanType, IntType, K8sEnvType, ObjectType,
    RequiredFieldsType, StringType,
};
use crate::errors::RenderResult;

/// Behaviour of one schema type
pub trait ArgumentType: Send + Sync {
    /// Schema type identifier this implementation is registered under
    fn name(&self) -> &str;

    /// Type-specific definition checks
    fn validate_definition(
        &self,
        _arg: &ArgumentDeclaration,
        _registry: &TypeRegistry,
    ) -> RenderResult<()> {
        Ok(())
    }

    /// Check a non-null supplied value
    fn validate_value(
        &self,
        arg: &ArgumentDeclaration,
        value: &Value,
        registry: &TypeRegistry,
    ) -> RenderResult<()>;

    /// Value exposed to script bodies; `None` when nothing was supplied
    fn normalize_value(&self, arg: &ArgumentDeclaration, value: Option<&Value>) -> Value;
}

/// Table of argument types by schema type name
pub struct TypeRegistry {
    types: HashMap<String, Box<dyn ArgumentType>>,
}

impl TypeRegistry {
    /// Registry without any types
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Registry with every built-in type
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        registry.register(StringType);
        registry.register(BooleanType);
        registry.register(IntType);
        registry.register(ObjectType);
        registry.register(ArrayType);

        registry.register(RequiredFieldsType::new(
            type_names::IMAGE_REPOSITORY,
            &["registry", "repository"],
        ));
        registry.register(RequiredFieldsType::new(
            type_names::DOCKER_IMAGE_REPOSITORY,
            &["repositoryPath", "credentialId", "tag"],
        ));
        registry.register(RequiredFieldsType::new(
            type_names::CODE_REPOSITORY,
            &["url", "kind", "credentialId"],
        ));
        registry.register(RequiredFieldsType::new(type_names::TOOL_BINDING, &["name"]));
        registry.register(RequiredFieldsType::new(
            type_names::CONTAINER,
            &["clusterName", "serviceName", "containerName", "namespace"],
        ));
        registry.register(RequiredFieldsType::new(
            type_names::V1_CONTAINER,
            &[
                "clusterName",
                "namespace",
                "applicationName",
                "componentName",
                "componentType",
                "containerName",
            ],
        ));
        registry.register(K8sEnvType);

        registry
    }

    /// Shared registry holding the built-in types
    pub fn global() -> &'static TypeRegistry {
        static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(TypeRegistry::with_builtins)
    }

    /// Register a type, replacing any type with the same name
    pub fn register<T: ArgumentType + 'static>(&mut self, ty: T) {
        self.types.insert(ty.name().to_string(), Box::new(ty));
    }

    /// Look up a type by schema type name
    pub fn get(&self, name: &str) -> Option<&dyn ArgumentType> {
        self.types.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
