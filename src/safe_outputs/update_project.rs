// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Project board updates
//!
//! Projects are organisation-level, so this kind usually needs a token with
//! project scope configured through `github-token`.

use super::{SafeOutput, SafeOutputContext, SafeOutputJobBuilder};
use crate::errors::FlowgateResult;
use crate::jobs::{PermissionScope, Permissions};
use crate::workflow::{CommonOutputOptions, SafeOutputKind, SafeOutputsConfig, UpdateProjectConfig};

pub struct UpdateProject;

impl SafeOutput for UpdateProject {
    type Config = UpdateProjectConfig;

    const KIND: SafeOutputKind = SafeOutputKind::UpdateProject;
    const TITLE: &'static str = "Update project";
    const OUTPUTS: &'static [&'static str] = &["items_updated"];

    fn select(outputs: &SafeOutputsConfig) -> Option<&Self::Config> {
        outputs.update_project.as_ref()
    }

    fn common(config: &Self::Config) -> &CommonOutputOptions {
        &config.common
    }

    fn permissions(_config: &Self::Config) -> Permissions {
        Permissions::none()
            .read(PermissionScope::Contents)
            .write(PermissionScope::RepositoryProjects)
    }

    fn configure(
        config: &Self::Config,
        ctx: &SafeOutputContext<'_>,
        job: &mut SafeOutputJobBuilder,
    ) -> FlowgateResult<()> {
        let url = config
            .project
            .as_deref()
            .or_else(|| ctx.ir.project.as_ref().and_then(|p| p.url()));
        job.env_opt("URL", url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{build, SafeOutputContext};
    use super::*;
    use crate::jobs::Step;

    #[test]
    fn test_project_url_falls_back_to_workflow_project() {
        let ir = workflow(
            "name: x\nproject: https://github.com/orgs/acme/projects/7\nsafe-outputs:\n  update-project: {}\n",
        );
        let opts = options();
        let ctx = SafeOutputContext {
            ir: &ir,
            options: &opts,
            main_job: "agent",
            detection_job: None,
        };
        let job = build::<UpdateProject>(UpdateProject::select(&ir.safe_outputs), &ctx).unwrap();

        let Some(Step::Generated(main)) = job.steps.last() else {
            panic!("expected main step");
        };
        assert_eq!(
            main.env["FLOWGATE_UPDATE_PROJECT_URL"],
            "https://github.com/orgs/acme/projects/7"
        );
        assert_eq!(main.env["FLOWGATE_UPDATE_PROJECT_MAX"], "10");
    }
}
