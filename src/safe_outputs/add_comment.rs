// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Comments on the triggering issue, pull request or discussion

use super::{SafeOutput, SafeOutputContext, SafeOutputJobBuilder};
use crate::errors::FlowgateResult;
use crate::jobs::{PermissionScope, Permissions};
use crate::workflow::{AddCommentConfig, CommonOutputOptions, SafeOutputKind, SafeOutputsConfig};

pub struct AddComment;

impl SafeOutput for AddComment {
    type Config = AddCommentConfig;

    const KIND: SafeOutputKind = SafeOutputKind::AddComment;
    const TITLE: &'static str = "Add comment";
    const OUTPUTS: &'static [&'static str] = &["comment_id", "comment_url"];

    fn select(outputs: &SafeOutputsConfig) -> Option<&Self::Config> {
        outputs.add_comment.as_ref()
    }

    fn common(config: &Self::Config) -> &CommonOutputOptions {
        &config.common
    }

    fn permissions(config: &Self::Config) -> Permissions {
        let permissions = Permissions::none()
            .read(PermissionScope::Contents)
            .write(PermissionScope::Issues)
            .write(PermissionScope::PullRequests);
        if config.discussion {
            permissions.write(PermissionScope::Discussions)
        } else {
            permissions
        }
    }

    fn configure(
        config: &Self::Config,
        _ctx: &SafeOutputContext<'_>,
        job: &mut SafeOutputJobBuilder,
    ) -> FlowgateResult<()> {
        job.env("TARGET", config.target.as_deref().unwrap_or("triggering"));
        if config.discussion {
            job.env("DISCUSSION", "true");
        }
        Ok(())
    }
}
