// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Agent clauses

use serde::{Deserialize, Serialize};

/// Where a pipeline or stage runs
///
/// Written either as a raw agent expression (`any`, `none`, ...) or as a
/// map selecting a node label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Agent {
    Expression(String),
    Label {
        #[serde(default)]
        label: Option<String>,
    },
}

impl Agent {
    pub fn any() -> Self {
        Agent::Expression("any".to_string())
    }

    pub fn label(label: &str) -> Self {
        Agent::Label {
            label: Some(label.to_string()),
        }
    }

    /// Agent clause, or `fallback` when the agent selects nothing
    pub fn render_or(&self, fallback: &str) -> String {
        match self {
            Agent::Expression(expr) if !expr.is_empty() => format!("agent {}", expr),
            Agent::Label { label: Some(label) } if !label.is_empty() => {
                format!("agent {{label \"{}\"}}", label)
            }
            _ => fallback.to_string(),
        }
    }
}

/// Agent clause of the pipeline block; a missing agent means `agent any`
pub fn pipeline_agent(agent: Option<&Agent>) -> String {
    agent.map_or_else(|| Agent::any().render_or(""), |a| a.render_or("agent any"))
}

/// Agent clause of a stage, empty when it renders the same as the pipeline's
pub fn stage_agent(agent: Option<&Agent>, pipeline: Option<&Agent>) -> String {
    let rendered = agent.map(|a| a.render_or("")).unwrap_or_default();
    let inherited = pipeline_agent(pipeline);
    if rendered == inherited {
        String::new()
    } else {
        rendered
    }
}
