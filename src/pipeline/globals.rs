// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Build variables available to pipeline scripts

use serde::Serialize;

use super::definition::{ScmInfo, ScmType};
use crate::arguments::LocalizedText;

/// A variable the build environment provides
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalVar {
    pub name: &'static str,
    pub description: LocalizedText,
}

fn var(name: &'static str, zh_cn: &str, en: &str) -> GlobalVar {
    GlobalVar {
        name,
        description: LocalizedText::new(zh_cn, en),
    }
}

fn build_vars() -> Vec<GlobalVar> {
    vec![
        var(
            "BUILD_NUMBER",
            "当前构建的jenkins编号, 例如 153",
            "The current build number, such as \"153\"",
        ),
        var("JOB_NAME", "当前流水线的名称", "Name of the project of this build"),
        var(
            "JOB_URL",
            "当前流水线所在Jenkins的地址, 例如http://server:port/jenkins/job/foo/ (需要在Jenkins配置Jenkins URL)",
            "Full URL of this job, like http://server:port/jenkins/job/foo/ (Jenkins URL must be set)",
        ),
        var(
            "BUILD_URL",
            "当前构建所在Jenkins的地址, 例如http://server:port/jenkins/job/foo/15 (需要在Jenkins配置Jenkins URL)",
            "Full URL of this build, like http://server:port/jenkins/job/foo/15 (Jenkins URL must be set)",
        ),
    ]
}

/// Variables available to a pipeline with the given context
///
/// Repository variables need source control; image variables need at least
/// one image repository that can trigger the pipeline.
pub fn global_vars(scm: Option<&ScmInfo>, image_repositories: &[String]) -> Vec<GlobalVar> {
    let mut vars = build_vars();

    if let Some(scm) = scm {
        vars.push(var("REPOSITORY_PATH", "代码仓库地址", "url of code repository"));
        match scm.scm_type {
            ScmType::Git => {
                vars.push(var(
                    "GIT_COMMIT",
                    "代码提交版本号, 例如: c68938922a3500a95b1f33883144196abc5a794d",
                    "GIT commit id of code repository, such as:\"c68938922a3500a95b1f33883144196abc5a794d\"",
                ));
                vars.push(var("GIT_BRANCH", "代码提交分支名称", "GIT branch name of code repository"));
            }
            ScmType::Svn => {
                vars.push(var(
                    "SVN_REVISION",
                    "svn 代码版本号,例如: 46",
                    "code version of svn repository, such as: \"46\"",
                ));
            }
        }
    }

    if !image_repositories.is_empty() {
        vars.push(var(
            "IMAGE_REPOSITORY",
            "流水线被镜像触发时的镜像名称",
            "repository of image when pipeline triggered by docker image",
        ));
        vars.push(var(
            "IMAGE_TAG",
            "流水线被镜像触发时的镜像TAG",
            "tag of image when pipeline triggered by docker image",
        ));
    }

    vars
}
