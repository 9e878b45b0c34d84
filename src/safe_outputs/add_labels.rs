// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

use super::{SafeOutput, SafeOutputContext, SafeOutputJobBuilder};
use crate::errors::FlowgateResult;
use crate::jobs::{PermissionScope, Permissions};
use crate::workflow::{AddLabelsConfig, CommonOutputOptions, SafeOutputKind, SafeOutputsConfig};

pub struct AddLabels;

impl SafeOutput for AddLabels {
    type Config = AddLabelsConfig;

    const KIND: SafeOutputKind = SafeOutputKind::AddLabels;
    const TITLE: &'static str = "Add labels";
    const OUTPUTS: &'static [&'static str] = &["labels_added"];

    fn select(outputs: &SafeOutputsConfig) -> Option<&Self::Config> {
        outputs.add_labels.as_ref()
    }

    fn common(config: &Self::Config) -> &CommonOutputOptions {
        &config.common
    }

    fn permissions(_config: &Self::Config) -> Permissions {
        Permissions::none()
            .read(PermissionScope::Contents)
            .write(PermissionScope::Issues)
            .write(PermissionScope::PullRequests)
    }

    fn configure(
        config: &Self::Config,
        _ctx: &SafeOutputContext<'_>,
        job: &mut SafeOutputJobBuilder,
    ) -> FlowgateResult<()> {
        job.env_list("ALLOWED", &config.allowed)
            .env("TARGET", config.target.as_deref().unwrap_or("triggering"));
        Ok(())
    }
}
