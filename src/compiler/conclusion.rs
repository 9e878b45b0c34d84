// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Conclusion job
//!
//! Reports the outcome of the run back to the triggering item. It is the
//! last job of the graph.

use crate::compiler::names;
use crate::config::CompilerOptions;
use crate::expr;
use crate::jobs::{GeneratedStep, Job, PermissionScope, Permissions};
use crate::workflow::WorkflowIr;

pub const ENV_AGENT_CONCLUSION: &str = "FLOWGATE_AGENT_CONCLUSION";

/// Build the conclusion job needing `status_jobs`.
///
/// Persistence jobs are wired in afterwards through the deferred list.
pub fn build_conclusion(ir: &WorkflowIr, options: &CompilerOptions, status_jobs: &[String]) -> Job {
    let condition = expr::and(
        expr::always(),
        expr::not_equals(names::job_result(names::AGENT_JOB), "skipped"),
    );

    let mut permissions = Permissions::none().read(PermissionScope::Contents);
    if ir.command.is_some() || ir.reaction.is_some() {
        permissions = permissions
            .write(PermissionScope::Issues)
            .write(PermissionScope::PullRequests);
    }

    let mut job = Job::new(names::CONCLUSION_JOB, options.runs_on.clone())
        .needs(status_jobs.iter().cloned())
        .when(&condition)
        .permissions(permissions)
        .step(
            GeneratedStep::uses("Download agent output", names::DOWNLOAD_ARTIFACT_ACTION)
                .input("name", names::AGENT_OUTPUT_ARTIFACT)
                .input("path", names::AGENT_OUTPUT_DIR),
        )
        .step(
            GeneratedStep::uses("Report run outcome", names::GITHUB_SCRIPT_ACTION)
                .id("conclusion")
                .env(crate::safe_outputs::ENV_AGENT_OUTPUT, names::AGENT_OUTPUT_PATH)
                .env(ENV_AGENT_CONCLUSION, format!("${{{{ {} }}}}", names::job_result(names::AGENT_JOB)))
                .env(names::ENV_WORKFLOW_NAME, ir.name.as_str())
                .input("script", names::script_call("conclusion")),
        );
    job.timeout_minutes = Some(10);
    job
}
