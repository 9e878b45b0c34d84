// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Job, step and output names shared with the runtime scripts.
//!
//! These strings are a wire contract: the scripts executed by the generated
//! jobs read outputs under exactly these names.

// Jobs
pub const PRE_ACTIVATION_JOB: &str = "pre_activation";
pub const ACTIVATION_JOB: &str = "activation";
pub const AGENT_JOB: &str = "agent";
pub const DETECTION_JOB: &str = "detection";
pub const PUSH_REPO_MEMORY_JOB: &str = "push_repo_memory";
pub const UPDATE_CACHE_MEMORY_JOB: &str = "update_cache_memory";
pub const CONCLUSION_JOB: &str = "conclusion";

// Gating checks: (step id, output name)
pub const CHECK_MEMBERSHIP: (&str, &str) = ("check_membership", "is_team_member");
pub const CHECK_STOP_TIME: (&str, &str) = ("check_stop_time", "stop_time_ok");
pub const CHECK_SKIP_IF_MATCH: (&str, &str) = ("check_skip_if_match", "skip_check_ok");
pub const CHECK_SKIP_IF_NO_MATCH: (&str, &str) =
    ("check_skip_if_no_match", "skip_no_match_check_ok");
pub const CHECK_COMMAND_POSITION: (&str, &str) =
    ("check_command_position", "command_position_ok");

// Gating job outputs
pub const ACTIVATED_OUTPUT: &str = "activated";
pub const MATCHED_COMMAND_OUTPUT: &str = "matched_command";

// Agent job outputs
pub const AGENT_OUTPUT: &str = "output";
pub const AGENT_OUTPUT_TYPES: &str = "output_types";
pub const AGENT_HAS_PATCH: &str = "has_patch";

// Detection job output
pub const DETECTION_SUCCESS: &str = "success";

// Generated step ids
pub const REACTION_STEP: &str = "react";
pub const COMPUTE_TEXT_STEP: &str = "compute_text";
pub const ENGINE_STEP: &str = "agentic_execution";
pub const COLLECT_OUTPUT_STEP: &str = "collect_output";
pub const DETECTION_STEP: &str = "detection";

// Environment variables
pub const ENV_STOP_TIME: &str = "FLOWGATE_STOP_TIME";
pub const ENV_REQUIRED_ROLES: &str = "FLOWGATE_REQUIRED_ROLES";
pub const ENV_ALLOWED_BOTS: &str = "FLOWGATE_ALLOWED_BOTS";
pub const ENV_SKIP_QUERY: &str = "FLOWGATE_SKIP_QUERY";
pub const ENV_SKIP_MAX_MATCHES: &str = "FLOWGATE_SKIP_MAX_MATCHES";
pub const ENV_SKIP_MIN_MATCHES: &str = "FLOWGATE_SKIP_MIN_MATCHES";
pub const ENV_COMMAND: &str = "FLOWGATE_COMMAND";
pub const ENV_REACTION: &str = "FLOWGATE_REACTION";
pub const ENV_WORKFLOW_NAME: &str = "FLOWGATE_WORKFLOW_NAME";

// Artifacts
pub const AGENT_OUTPUT_ARTIFACT: &str = "agent_output.json";
pub const AGENT_OUTPUT_DIR: &str = "/tmp/flowgate/safeoutputs/";
pub const AGENT_OUTPUT_PATH: &str = "/tmp/flowgate/safeoutputs/agent_output.json";
pub const PATCH_ARTIFACT: &str = "agent.patch";
pub const PATCH_DIR: &str = "/tmp/flowgate/";

// Actions
pub const CHECKOUT_ACTION: &str = "actions/checkout@v4";
pub const GITHUB_SCRIPT_ACTION: &str = "actions/github-script@v7";
pub const UPLOAD_ARTIFACT_ACTION: &str = "actions/upload-artifact@v4";
pub const DOWNLOAD_ARTIFACT_ACTION: &str = "actions/download-artifact@v4";
pub const CACHE_RESTORE_ACTION: &str = "actions/cache/restore@v4";
pub const CACHE_SAVE_ACTION: &str = "actions/cache/save@v4";

/// Script run by a github-script step
pub fn script_call(name: &str) -> String {
    format!(
        "const {{ main }} = require('/tmp/flowgate/actions/{}.cjs');\nawait main();",
        name
    )
}

/// `steps.<id>.outputs.<name>`
pub fn step_output(step: &str, output: &str) -> String {
    format!("steps.{}.outputs.{}", step, output)
}

/// `needs.<job>.outputs.<name>`
pub fn job_output(job: &str, output: &str) -> String {
    format!("needs.{}.outputs.{}", job, output)
}

/// `needs.<job>.result`
pub fn job_result(job: &str) -> String {
    format!("needs.{}.result", job)
}

/// Names the compiler reserves for its own jobs. `pre_activation` is not
/// listed: a user job of that name is merged into the gating job.
pub const RESERVED_JOBS: &[&str] = &[
    ACTIVATION_JOB,
    AGENT_JOB,
    DETECTION_JOB,
    PUSH_REPO_MEMORY_JOB,
    UPDATE_CACHE_MEMORY_JOB,
    CONCLUSION_JOB,
];
