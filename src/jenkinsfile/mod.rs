// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Declarative pipeline script documents
//!
//! [`Pipeline`] is the render-ready tree built by the composer. Rendering
//! substitutes it into the fixed pipeline, stage and post layouts; the result
//! is usually passed through [`crate::formatter`] afterwards.

mod agent;

pub use agent::{pipeline_agent, stage_agent, Agent};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::value;

/// Post condition run whatever the build result
pub const POST_ALWAYS: &str = "always";

/// Body of the post condition added when a template declares none
pub const CLEAN_WORKSPACE_SCRIPT: &str = r#"
			script{
				echo "clean up workspace"
				deleteDir()
			}
"#;

/// Timeout option of a pipeline or stage, in seconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Manual approval gate in front of a stage's steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approve {
    #[serde(default)]
    pub timeout: u64,

    #[serde(default)]
    pub message: String,
}

/// Environment variable assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,

    #[serde(default)]
    pub value: Value,
}

/// `when` expressions keyed by `all` (joined with `&&`) or `any` (joined with `||`)
pub type Conditions = BTreeMap<String, Vec<String>>;

/// One named post condition and its concatenated scripts
#[derive(Debug, Clone, PartialEq)]
pub struct PostCondition {
    pub name: String,
    pub scripts: String,
}

/// What a stage runs
#[derive(Debug, Clone, PartialEq)]
pub enum StageBody {
    /// Rendered task script
    Steps(String),
    /// Child stages run in parallel
    Parallel(Vec<Stage>),
}

/// A rendered stage
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    pub agent: Option<Agent>,
    pub options: Option<Options>,
    pub conditions: Option<Conditions>,
    pub approve: Option<Approve>,
    pub environments: Vec<EnvVar>,
    pub body: StageBody,
}

impl Stage {
    /// Stage with only a name and body
    pub fn new(name: impl Into<String>, body: StageBody) -> Self {
        Self {
            name: name.into(),
            agent: None,
            options: None,
            conditions: None,
            approve: None,
            environments: Vec::new(),
            body,
        }
    }

    /// Children of a parallel stage
    pub fn parallel_stages(&self) -> &[Stage] {
        match &self.body {
            StageBody::Parallel(stages) => stages,
            StageBody::Steps(_) => &[],
        }
    }

    fn render_into(&self, out: &mut String, pipeline_agent: Option<&Agent>) {
        let _ = writeln!(out, "stage(\"{}\"){{", self.name);
        let _ = writeln!(out);
        let _ = writeln!(out, "\t{}", agent::stage_agent(self.agent.as_ref(), pipeline_agent));

        render_environment(out, &self.environments, "\t");

        if let Some(conditions) = self.conditions.as_ref().filter(|c| !c.is_empty()) {
            let _ = writeln!(out, "\twhen{{");
            let _ = writeln!(out, "\t\tbeforeAgent true");
            for (key, expressions) in conditions {
                let joined = match key.as_str() {
                    "all" => expressions.join(" && "),
                    "any" => expressions.join("||"),
                    other => {
                        tracing::warn!(stage = %self.name, key = other, "ignoring unknown condition key");
                        continue;
                    }
                };
                let _ = writeln!(out, "\t\texpression {{ {} }}", joined);
            }
            let _ = writeln!(out, "\t}}");
        }

        if let Some(timeout) = self.options.as_ref().and_then(|o| o.timeout) {
            let _ = writeln!(out, "\toptions{{");
            let _ = writeln!(out, "\t\ttimeout(time:{}, unit:'SECONDS')", timeout);
            let _ = writeln!(out, "\t}}");
        }

        match &self.body {
            StageBody::Parallel(stages) => {
                let _ = writeln!(out, "\tfailFast false");
                let _ = writeln!(out, "\tparallel{{");
                for stage in stages {
                    stage.render_into(out, pipeline_agent);
                }
                let _ = writeln!(out, "\t}}");
            }
            StageBody::Steps(script) => {
                let _ = writeln!(out, "\tsteps{{");
                if let Some(approve) = &self.approve {
                    let _ = writeln!(out, "\t\ttimeout(time:{}, unit:\"SECONDS\"){{", approve.timeout);
                    let _ = writeln!(out, "\t\t\tinput {{");
                    let _ = writeln!(out, "\t\t\t\tmessage \"{}\"", approve.message);
                    let _ = writeln!(out, "\t\t\t}}");
                    let _ = writeln!(out, "\t\t}}");
                }
                let _ = writeln!(out, "\t\t{}", script.trim_end());
                let _ = writeln!(out, "\t}}");
            }
        }

        let _ = writeln!(out, "}}");
    }
}

fn render_environment(out: &mut String, environments: &[EnvVar], indent: &str) {
    if environments.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}environment{{", indent);
    for env in environments {
        let _ = writeln!(out, "{}\t{} = \"{}\"", indent, env.name, value::display(&env.value));
    }
    let _ = writeln!(out, "{}}}", indent);
}

/// The whole rendered pipeline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub agent: Option<Agent>,
    pub options: Option<Options>,
    pub environments: Vec<EnvVar>,
    pub stages: Vec<Stage>,
    pub post: Vec<PostCondition>,
}

impl Pipeline {
    /// Pipeline script text, before formatting
    pub fn render(&self) -> String {
        let mut out = String::new();
        let agent = self.agent.as_ref();

        let _ = writeln!(out, "pipeline{{");
        let _ = writeln!(out);
        let _ = writeln!(out, "\t{}", agent::pipeline_agent(agent));

        render_environment(&mut out, &self.environments, "\t");

        let _ = writeln!(out);
        let _ = writeln!(out, "\toptions{{");
        let _ = writeln!(out, "\t\tdisableConcurrentBuilds()");
        let _ = writeln!(out, "\t\tbuildDiscarder(logRotator(numToKeepStr: '200'))");
        if let Some(timeout) = self.options.as_ref().and_then(|o| o.timeout) {
            let _ = writeln!(out, "\t\ttimeout(time:{}, unit:'SECONDS')", timeout);
        }
        let _ = writeln!(out, "\t}}");

        let _ = writeln!(out);
        let _ = writeln!(out, "\tstages{{");
        for stage in &self.stages {
            stage.render_into(&mut out, agent);
        }
        let _ = writeln!(out, "\t}}");

        let _ = writeln!(out);
        let _ = writeln!(out, "\tpost{{");
        for post in &self.post {
            let _ = writeln!(out, "{}{{", post.name);
            let _ = writeln!(out, "\t{}", post.scripts);
            let _ = writeln!(out, "}}");
        }
        let _ = writeln!(out, "\t}}");
        let _ = writeln!(out, "}}");

        out
    }

    /// Rendered and re-indented pipeline script
    pub fn render_and_format(&self) -> String {
        crate::formatter::format(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::Formatter;
    use serde_json::json;

    fn steps(name: &str, script: &str) -> Stage {
        Stage::new(name, StageBody::Steps(script.to_string()))
    }

    fn cleanup() -> PostCondition {
        PostCondition {
            name: POST_ALWAYS.into(),
            scripts: CLEAN_WORKSPACE_SCRIPT.into(),
        }
    }

    #[test]
    fn test_minimal_pipeline() {
        let pipeline = Pipeline {
            stages: vec![steps("build", "sh 'make'")],
            post: vec![cleanup()],
            ..Default::default()
        };

        insta::assert_snapshot!(pipeline.render_and_format(), @r###"
        pipeline {
            agent any
            options {
                disableConcurrentBuilds()
                buildDiscarder(logRotator(numToKeepStr: '200'))
            }
            stages {
                stage("build") {
                    steps {
                        sh 'make'
                    }
                }
            }
            post {
                always {
                    script {
                        echo "clean up workspace"
                        deleteDir()
                    }
                }
            }
        }
        "###);
    }

    #[test]
    fn test_stage_blocks() {
        let mut stage = steps("deploy", "sh 'kubectl apply'");
        stage.agent = Some(Agent::label("k8s"));
        stage.options = Some(Options { timeout: Some(600) });
        stage.approve = Some(Approve {
            timeout: 300,
            message: "Deploy?".into(),
        });
        stage.environments = vec![EnvVar {
            name: "MODE".into(),
            value: json!("prod"),
        }];
        stage.conditions = Some(Conditions::from([
            ("all".to_string(), vec!["a == 1".to_string(), "b".to_string()]),
            ("any".to_string(), vec!["c".to_string(), "d".to_string()]),
        ]));

        let pipeline = Pipeline {
            options: Some(Options { timeout: Some(3600) }),
            stages: vec![stage],
            ..Default::default()
        };
        assert!(pipeline.render().contains(r#"agent {label "k8s"}"#));

        let out = pipeline.render_and_format();
        assert!(out.contains("agent {\n                label \"k8s\"\n            }"));
        assert!(out.contains(r#"MODE = "prod""#));
        assert!(out.contains("beforeAgent true"));
        assert!(out.contains("a == 1 && b"));
        assert!(out.contains("c||d"));
        assert!(out.contains("timeout(time:600, unit:'SECONDS')"));
        assert!(out.contains("timeout(time:3600, unit:'SECONDS')"));
        assert!(out.contains(r#"timeout(time:300, unit:"SECONDS") {"#));
        assert!(out.contains(r#"message "Deploy?""#));
    }

    #[test]
    fn test_parallel_stage() {
        let group = Stage::new(
            "test",
            StageBody::Parallel(vec![steps("unit", "sh 'make test'"), steps("lint", "sh 'make lint'")]),
        );
        let pipeline = Pipeline {
            stages: vec![group],
            post: vec![cleanup()],
            ..Default::default()
        };

        let mut formatter = Formatter::new();
        let out = formatter.format(&pipeline.render());
        assert_eq!(formatter.depth(), 0);
        assert!(out.contains("failFast false"));
        assert!(out.contains("parallel {"));
        assert!(out.contains(r#"stage("unit") {"#));
        assert!(out.contains(r#"stage("lint") {"#));
    }

    #[test]
    fn test_stage_agent_same_as_pipeline_is_omitted() {
        let mut stage = steps("build", "sh 'make'");
        stage.agent = Some(Agent::label("java"));
        let pipeline = Pipeline {
            agent: Some(Agent::label("java")),
            stages: vec![stage],
            ..Default::default()
        };
        assert_eq!(pipeline.render().matches("agent {label \"java\"}").count(), 1);
    }
}
