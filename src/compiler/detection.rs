// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Threat detection job
//!
//! Reviews the agent output and patch before any safe-output job acts on
//! them. Safe-output jobs require its `success` output to be `'true'`.

use crate::compiler::names;
use crate::config::CompilerOptions;
use crate::errors::FlowgateResult;
use crate::expr;
use crate::jobs::{GeneratedStep, Job, PermissionScope, Permissions, Step};
use crate::workflow::{ThreatDetection, WorkflowIr};

pub const ENV_DETECTION_PROMPT: &str = "FLOWGATE_DETECTION_PROMPT";

pub fn build_detection(ir: &WorkflowIr, options: &CompilerOptions, agent: &Job) -> FlowgateResult<Job> {
    let condition = expr::and(
        expr::not_cancelled(),
        expr::equals(names::job_result(&agent.name), "success"),
    );

    let mut job = Job::new(names::DETECTION_JOB, options.runs_on.clone())
        .needs([agent.name.clone()])
        .when(&condition)
        .permissions(Permissions::none().read(PermissionScope::Contents));
    job.timeout_minutes = Some(10);

    job.steps.push(
        GeneratedStep::uses("Download agent output", names::DOWNLOAD_ARTIFACT_ACTION)
            .input("name", names::AGENT_OUTPUT_ARTIFACT)
            .input("path", names::AGENT_OUTPUT_DIR)
            .into(),
    );
    if ir.safe_outputs.create_pull_request.is_some() {
        job.steps.push(
            GeneratedStep::uses("Download patch", names::DOWNLOAD_ARTIFACT_ACTION)
                .when(&expr::equals(
                    names::job_output(&agent.name, names::AGENT_HAS_PATCH),
                    "true",
                ))
                .input("name", names::PATCH_ARTIFACT)
                .input("path", names::PATCH_DIR)
                .into(),
        );
    }

    let mut detect = GeneratedStep::uses("Detect threats", names::GITHUB_SCRIPT_ACTION)
        .id(names::DETECTION_STEP)
        .env(crate::safe_outputs::ENV_AGENT_OUTPUT, names::AGENT_OUTPUT_PATH)
        .env(names::ENV_WORKFLOW_NAME, ir.name.as_str())
        .input("script", names::script_call(names::DETECTION_STEP));

    if let Some(ThreatDetection::Config { prompt, steps, .. }) = &ir.safe_outputs.threat_detection {
        if let Some(prompt) = prompt {
            detect = detect.env(ENV_DETECTION_PROMPT, prompt.as_str());
        }
        job.steps.extend(steps.iter().cloned().map(Step::User));
    }

    job.steps.push(detect.into());
    job.outputs.insert(
        names::DETECTION_SUCCESS.to_string(),
        format!(
            "${{{{ {} }}}}",
            names::step_output(names::DETECTION_STEP, names::DETECTION_SUCCESS)
        ),
    );

    Ok(job)
}
