// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Issue creation

use super::{SafeOutput, SafeOutputContext, SafeOutputJobBuilder};
use crate::errors::FlowgateResult;
use crate::jobs::{GeneratedStep, PermissionScope, Permissions};
use crate::workflow::{CommonOutputOptions, CreateIssueConfig, SafeOutputKind, SafeOutputsConfig};

pub struct CreateIssue;

impl SafeOutput for CreateIssue {
    type Config = CreateIssueConfig;

    const KIND: SafeOutputKind = SafeOutputKind::CreateIssue;
    const TITLE: &'static str = "Create issue";
    const OUTPUTS: &'static [&'static str] = &["issue_number", "issue_url"];

    fn select(outputs: &SafeOutputsConfig) -> Option<&Self::Config> {
        outputs.create_issue.as_ref()
    }

    fn common(config: &Self::Config) -> &CommonOutputOptions {
        &config.common
    }

    fn permissions(_config: &Self::Config) -> Permissions {
        Permissions::none()
            .read(PermissionScope::Contents)
            .write(PermissionScope::Issues)
    }

    fn configure(
        config: &Self::Config,
        _ctx: &SafeOutputContext<'_>,
        job: &mut SafeOutputJobBuilder,
    ) -> FlowgateResult<()> {
        job.env_opt("TITLE_PREFIX", config.title_prefix.as_deref())
            .env_list("LABELS", &config.labels)
            .env_opt("TARGET_REPO", config.target_repo.as_deref());

        if !config.assignees.is_empty() {
            let step = GeneratedStep::run(
                "Assign issue",
                "gh issue edit \"$ISSUE_NUMBER\" --add-assignee \"$ASSIGNEES\"",
            )
            .env("GH_TOKEN", job.token())
            .env("ISSUE_NUMBER", job.main_output("issue_number"))
            .env("ASSIGNEES", config.assignees.join(","));
            job.post_step("issue_number", step);
        }

        Ok(())
    }
}
