// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Pull request creation
//!
//! The agent produces a patch instead of pushing. This job checks out the
//! repository, applies the patch on a new branch and opens one pull request.

use super::{SafeOutput, SafeOutputContext, SafeOutputJobBuilder};
use crate::compiler::names;
use crate::errors::FlowgateResult;
use crate::jobs::{GeneratedStep, PermissionScope, Permissions};
use crate::workflow::{
    CommonOutputOptions, CreatePullRequestConfig, SafeOutputKind, SafeOutputsConfig,
};

pub struct CreatePullRequest;

impl SafeOutput for CreatePullRequest {
    type Config = CreatePullRequestConfig;

    const KIND: SafeOutputKind = SafeOutputKind::CreatePullRequest;
    const TITLE: &'static str = "Create pull request";
    const OUTPUTS: &'static [&'static str] =
        &["pull_request_number", "pull_request_url", "branch_name"];

    fn select(outputs: &SafeOutputsConfig) -> Option<&Self::Config> {
        outputs.create_pull_request.as_ref()
    }

    fn common(config: &Self::Config) -> &CommonOutputOptions {
        &config.common
    }

    fn permissions(_config: &Self::Config) -> Permissions {
        Permissions::none()
            .write(PermissionScope::Contents)
            .write(PermissionScope::Issues)
            .write(PermissionScope::PullRequests)
    }

    fn configure(
        config: &Self::Config,
        ctx: &SafeOutputContext<'_>,
        job: &mut SafeOutputJobBuilder,
    ) -> FlowgateResult<()> {
        let has_patch = names::job_output(ctx.main_job, names::AGENT_HAS_PATCH);
        let token = job.token().to_string();

        job.pre_step(
            GeneratedStep::uses("Download patch", names::DOWNLOAD_ARTIFACT_ACTION)
                .input("name", names::PATCH_ARTIFACT)
                .input("path", names::PATCH_DIR)
                .when(&crate::expr::equals(has_patch, "true")),
        )
        .pre_step(
            GeneratedStep::uses("Checkout repository", names::CHECKOUT_ACTION)
                .input("fetch-depth", "0")
                .input("token", token),
        )
        .pre_step(GeneratedStep::run(
            "Configure git identity",
            "git config --global user.email \"github-actions[bot]@users.noreply.github.com\"\n\
             git config --global user.name \"github-actions[bot]\"",
        ));

        job.env_opt("TITLE_PREFIX", config.title_prefix.as_deref())
            .env_list("LABELS", &config.labels)
            .env("DRAFT", config.draft.to_string())
            .env(
                "IF_NO_CHANGES",
                config.if_no_changes.as_deref().unwrap_or("warn"),
            )
            .env("BASE_BRANCH", "${{ github.ref_name }}");

        if !config.reviewers.is_empty() {
            let step = GeneratedStep::run(
                "Request reviewers",
                "gh pr edit \"$PR_NUMBER\" --add-reviewer \"$REVIEWERS\"",
            )
            .env("GH_TOKEN", job.token())
            .env("PR_NUMBER", job.main_output("pull_request_number"))
            .env("REVIEWERS", config.reviewers.join(","));
            job.post_step("pull_request_number", step);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{build, SafeOutputContext};
    use super::*;
    use crate::jobs::Step;

    fn compile(yaml: &str) -> crate::jobs::Job {
        let ir = workflow(yaml);
        let opts = options();
        let ctx = SafeOutputContext {
            ir: &ir,
            options: &opts,
            main_job: "agent",
            detection_job: None,
        };
        build::<CreatePullRequest>(CreatePullRequest::select(&ir.safe_outputs), &ctx).unwrap()
    }

    fn main_step(job: &crate::jobs::Job) -> &GeneratedStep {
        job.steps
            .iter()
            .find_map(|s| match s {
                Step::Generated(g) if g.id.as_deref() == Some("create_pull_request") => Some(g),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_max_is_clamped_to_one() {
        let job = compile("name: x\nsafe-outputs:\n  create-pull-request:\n    max: 7\n");
        assert_eq!(main_step(&job).env["FLOWGATE_CREATE_PULL_REQUEST_MAX"], "1");
    }

    #[test]
    fn test_checkout_precedes_main_step() {
        let job = compile("name: x\nsafe-outputs:\n  create-pull-request:\n    reviewers: [alice, bob]\n");
        let step_names: Vec<_> = job
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Generated(g) => Some(g.name.as_str()),
                Step::User(_) => None,
            })
            .collect();
        assert_eq!(
            step_names,
            vec![
                "Download agent output",
                "Download patch",
                "Checkout repository",
                "Configure git identity",
                "Create pull request",
                "Request reviewers",
            ]
        );
        assert_eq!(main_step(&job).env["FLOWGATE_CREATE_PULL_REQUEST_DRAFT"], "true");
    }

    #[test]
    fn test_kind_token_wins() {
        let job = compile(
            r#"
name: x
github-token: ${{ secrets.WF }}
safe-outputs:
  github-token: ${{ secrets.FAMILY }}
  create-pull-request:
    github-token: ${{ secrets.PR }}
"#,
        );
        assert_eq!(main_step(&job).with["github-token"], "${{ secrets.PR }}");
    }
}
