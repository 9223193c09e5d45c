// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const PIPELINE: &str = r#"
apiVersion: devops.windcloud/v1alpha1
kind: PipelineTemplate
metadata:
  name: java-build
  annotations:
    windcloud/displayName.zh-CN: Java 构建
    windcloud/displayName.en: Java build
    windcloud/version: v1.0.0
spec:
  withSCM: true
  agent:
    label: java
  stages:
    - name: Clone
      tasks:
        - name: Clone
          type: clone
    - name: Build
      tasks:
        - name: build
          type: maven
    - name: Check
      tasks:
        - name: unit
          type: maven
        - name: lint
          type: maven
          relation:
            - action: show
              when:
                name: lint
                value: true
  arguments:
    - displayName:
        zh-CN: 构建
        en: Build
      items:
        - name: goal
          binding: ["build.args.goal"]
          default: package
          schema:
            type: string
          display:
            type: string
            name:
              zh-CN: 目标
              en: Goal
        - name: timeout
          binding: ["build.options.timeout"]
          schema:
            type: int
          display:
            type: int
            name:
              zh-CN: 超时
              en: Timeout
        - name: lint
          default: false
          schema:
            type: boolean
          display:
            type: boolean
            name:
              zh-CN: 检查
              en: Lint
"#;

const MAVEN: &str = r#"
apiVersion: devops.windcloud/v1alpha1
kind: PipelineTaskTemplate
metadata:
  name: maven
  annotations:
    windcloud/displayName.zh-CN: Maven
    windcloud/displayName.en: Maven
    windcloud/version: v1
spec:
  body: "sh 'mvn {{ .goal }}'"
  arguments:
    - name: goal
      default: verify
      schema:
        type: string
      display:
        type: string
        name:
          zh-CN: 目标
          en: Goal
"#;

const CLONE: &str = r#"
apiVersion: devops.windcloud/v1alpha1
kind: PipelineTaskTemplate
metadata:
  name: clone
  annotations:
    windcloud/displayName.zh-CN: 克隆
    windcloud/displayName.en: Clone
    windcloud/version: v1
spec:
  body: "git url: '{{ .SCM.repositoryPath }}', branch: '{{ .SCM.branch }}'"
  arguments:
    - name: SCM
      schema:
        type: object
      display:
        type: object
        name:
          zh-CN: 代码仓库
          en: SCM
"#;

fn fixtures() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pipeline.yaml", PIPELINE);
    std::fs::create_dir(dir.path().join("tasks")).unwrap();
    write(dir.path(), "tasks/maven.yaml", MAVEN);
    write(dir.path(), "tasks/clone.yml", CLONE);
    dir
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn pipewright(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pipewright").unwrap();
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("PIPEWRIGHT_TASK_TEMPLATES")
        .env_remove("RUST_LOG");
    cmd
}

fn render_args() -> Vec<&'static str> {
    vec![
        "render",
        "pipeline.yaml",
        "--task-templates",
        "tasks",
        "--scm-type",
        "git",
        "--scm-repo",
        "https://git.example.com/app.git",
        "--scm-branch",
        "main",
    ]
}

#[test]
fn test_render_formatted_script() {
    let dir = fixtures();
    let output = pipewright(&dir).args(render_args()).output().unwrap();
    assert!(output.status.success());

    let script = String::from_utf8(output.stdout).unwrap();
    assert!(script.starts_with("pipeline {\n"));
    assert!(script.ends_with("}\n"));
    assert!(!script.contains("\n\n"));
    assert!(script.contains("\n    agent {\n        label \"java\"\n    }\n"));
    assert!(script.contains("git url: 'https://git.example.com/app.git', branch: 'main'"));
    assert!(script.contains("sh 'mvn package'"));
    assert!(script.contains("sh 'mvn verify'"));
    assert!(!script.contains(r#"stage("lint")"#));
    assert!(script.contains("deleteDir()"));
}

#[test]
fn test_render_with_set_and_values_file() {
    let dir = fixtures();
    write(dir.path(), "values.json", r#"{"goal": "install", "lint": true}"#);

    let mut args = render_args();
    args.extend(["--values", "values.json", "--set", "timeout=120", "--set", "goal=deploy"]);

    pipewright(&dir)
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("sh 'mvn deploy'"))
        .stdout(predicate::str::contains("timeout(time:120, unit:'SECONDS')"))
        .stdout(predicate::str::contains(r#"stage("lint")"#));
}

#[test]
fn test_render_task_templates_from_env() {
    let dir = fixtures();
    let mut args = render_args();
    args.drain(2..4);

    pipewright(&dir)
        .env("PIPEWRIGHT_TASK_TEMPLATES", "tasks")
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("sh 'mvn package'"));
}

#[test]
fn test_render_to_output_file() {
    let dir = fixtures();
    let mut args = render_args();
    args.extend(["--output", "Jenkinsfile"]);

    pipewright(&dir).args(args).assert().success().stdout("");

    let script = std::fs::read_to_string(dir.path().join("Jenkinsfile")).unwrap();
    assert!(script.contains("stages {"));
}

#[test]
fn test_render_requires_scm_context() {
    let dir = fixtures();
    pipewright(&dir)
        .args(["render", "pipeline.yaml", "--task-templates", "tasks"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SCM is required"));
}

#[test]
fn test_render_rejects_bad_value() {
    let dir = fixtures();
    let mut args = render_args();
    args.extend(["--set", "timeout=soon"]);

    pipewright(&dir)
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout"));
}

#[test]
fn test_render_missing_task_template() {
    let dir = fixtures();
    std::fs::remove_file(dir.path().join("tasks/maven.yaml")).unwrap();

    pipewright(&dir)
        .args(render_args())
        .assert()
        .failure()
        .stderr(predicate::str::contains("3 errors occurred"))
        .stderr(predicate::str::contains("maven"));
}

#[test]
fn test_render_unformatted() {
    let dir = fixtures();
    let mut args = render_args();
    args.push("--no-format");

    pipewright(&dir)
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("pipeline{"));
}

#[test]
fn test_validate_directory() {
    let dir = fixtures();
    pipewright(&dir)
        .args(["validate", "-d", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("All manifests are valid!"));
}

#[test]
fn test_validate_reports_bad_manifest() {
    let dir = fixtures();
    write(
        dir.path(),
        "broken.yaml",
        &MAVEN.replace("windcloud/version: v1", "windcloud/version: 1"),
    );

    pipewright(&dir)
        .args(["validate", "-f", "broken.yaml", "-f", "pipeline.yaml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("should start with \"v\""))
        .stderr(predicate::str::contains("1 of 2 manifests failed validation"));
}

#[test]
fn test_validate_needs_input() {
    let dir = fixtures();
    pipewright(&dir).arg("validate").assert().failure();
}

#[test]
fn test_vars_json() {
    let dir = fixtures();
    let output = pipewright(&dir)
        .args(["vars", "--scm-type", "svn", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let vars: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = vars
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"SVN_REVISION"));
    assert!(!names.contains(&"GIT_COMMIT"));
    assert!(!names.contains(&"IMAGE_TAG"));
}

#[test]
fn test_vars_text() {
    let dir = fixtures();
    pipewright(&dir)
        .arg("vars")
        .assert()
        .success()
        .stdout(predicate::str::contains("BUILD_NUMBER"))
        .stdout(predicate::str::contains("REPOSITORY_PATH").not());
}
