// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

use super::{SafeOutput, SafeOutputContext, SafeOutputJobBuilder};
use crate::errors::FlowgateResult;
use crate::jobs::{PermissionScope, Permissions};
use crate::workflow::{
    CommonOutputOptions, CreateDiscussionConfig, SafeOutputKind, SafeOutputsConfig,
};

pub struct CreateDiscussion;

impl SafeOutput for CreateDiscussion {
    type Config = CreateDiscussionConfig;

    const KIND: SafeOutputKind = SafeOutputKind::CreateDiscussion;
    const TITLE: &'static str = "Create discussion";
    const OUTPUTS: &'static [&'static str] = &["discussion_number", "discussion_url"];

    fn select(outputs: &SafeOutputsConfig) -> Option<&Self::Config> {
        outputs.create_discussion.as_ref()
    }

    fn common(config: &Self::Config) -> &CommonOutputOptions {
        &config.common
    }

    fn permissions(_config: &Self::Config) -> Permissions {
        Permissions::none()
            .read(PermissionScope::Contents)
            .write(PermissionScope::Discussions)
    }

    fn configure(
        config: &Self::Config,
        _ctx: &SafeOutputContext<'_>,
        job: &mut SafeOutputJobBuilder,
    ) -> FlowgateResult<()> {
        job.env_opt("TITLE_PREFIX", config.title_prefix.as_deref())
            .env_opt("CATEGORY", config.category.as_deref())
            .env_list("LABELS", &config.labels);
        Ok(())
    }
}
