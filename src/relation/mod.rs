// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Visibility relations
//!
//! A relation decides whether an argument or a task takes part in the
//! current render, based on the values other arguments were given.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::errors::{ErrorList, RenderError, RenderResult};
use crate::value;

/// What a relation does when its condition holds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RelationAction {
    Show,
    Hidden,
}

impl RelationAction {
    /// The opposite action, applied when the condition does not hold
    pub fn negation(self) -> Self {
        match self {
            Self::Show => Self::Hidden,
            Self::Hidden => Self::Show,
        }
    }
}

impl std::fmt::Display for RelationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Show => write!(f, "show"),
            Self::Hidden => write!(f, "hidden"),
        }
    }
}

/// A single `name == value` test
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WhenItem {
    pub name: String,

    #[serde(default)]
    pub value: Value,
}

impl WhenItem {
    /// Stringified equality, so `3` and `"3"` compare equal.
    /// A name missing from `values` never matches.
    pub fn matches(&self, values: &Map<String, Value>) -> bool {
        match values.get(&self.name) {
            Some(candidate) => value::display(candidate) == value::display(&self.value),
            None => false,
        }
    }
}

/// Condition of a relation entry
///
/// Exactly one of `name`/`value`, `all` or `any` may be set. None set means
/// the condition always holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct When {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub value: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<WhenItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<WhenItem>>,
}

impl When {
    /// Check that at most one condition form is used
    pub fn validate_definition(&self) -> RenderResult<()> {
        let forms = [
            self.all.is_some(),
            self.any.is_some(),
            self.name.as_deref().is_some_and(|n| !n.is_empty()),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if forms > 1 {
            return Err(RenderError::definition_with_help(
                "relation.when sets more than one condition form",
                "use only one of `name` and `value`, `all` or `any`",
            ));
        }

        let mut errs = ErrorList::new();
        for (key, items) in [("all", &self.all), ("any", &self.any)] {
            for (i, item) in items.iter().flatten().enumerate() {
                if item.name.trim().is_empty() {
                    errs.push(RenderError::definition(format!(
                        "relation.when.{}[{}].name should not be empty",
                        key, i
                    )));
                }
            }
        }
        errs.into_result()
    }

    /// Evaluate the condition against argument values
    pub fn matches(&self, values: &Map<String, Value>) -> bool {
        if let Some(all) = self.all.as_ref().filter(|items| !items.is_empty()) {
            return all.iter().fold(true, |acc, item| item.matches(values) & acc);
        }

        if let Some(any) = self.any.as_ref().filter(|items| !items.is_empty()) {
            return any.iter().fold(false, |acc, item| item.matches(values) | acc);
        }

        match self.name.as_deref() {
            Some(name) if !name.is_empty() => WhenItem {
                name: name.to_string(),
                value: self.value.clone(),
            }
            .matches(values),
            _ => true,
        }
    }
}

/// One `(action, when)` pair of a relation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationItem {
    pub action: RelationAction,

    #[serde(default)]
    pub when: Option<When>,
}

/// Ordered list of visibility rules for an argument or task
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Relation(pub Vec<RelationItem>);

impl Relation {
    pub fn new(items: Vec<RelationItem>) -> Self {
        Self(items)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// At most one entry per action, each with a well-formed condition
    pub fn validate_definition(&self) -> RenderResult<()> {
        let mut errs = ErrorList::new();
        let mut seen = HashMap::new();

        for item in &self.0 {
            if seen.insert(item.action, ()).is_some() {
                errs.push(RenderError::definition(format!(
                    "relation declares action `{}` more than once",
                    item.action
                )));
            }
            if let Some(when) = &item.when {
                errs.check(when.validate_definition());
            }
        }

        errs.into_result()
    }

    /// Whether the owner should be shown for these argument values
    pub fn evaluate(&self, values: &Map<String, Value>) -> bool {
        let Some(first) = self.0.first() else {
            return true;
        };

        let by_action: HashMap<RelationAction, &RelationItem> =
            self.0.iter().map(|item| (item.action, item)).collect();

        // `show` wins when both actions are declared
        let chosen = by_action
            .get(&RelationAction::Show)
            .filter(|_| by_action.len() > 1)
            .copied()
            .unwrap_or(first);

        // an entry without a condition never hides its owner
        let Some(when) = &chosen.when else {
            return true;
        };

        if when.matches(values) {
            chosen.action == RelationAction::Show
        } else {
            chosen.action.negation() == RelationAction::Show
        }
    }
}

/// Evaluate an optional relation; no relation means always visible
pub fn is_visible(relation: Option<&Relation>, values: &Map<String, Value>) -> bool {
    relation.map_or(true, |r| r.evaluate(values))
}
