// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Agent job
//!
//! Runs the engine with the workflow's own permissions. Everything the agent
//! wants to change is written to an output file that the safe-output jobs
//! read later.

use crate::compiler::names;
use crate::config::CompilerOptions;
use crate::errors::FlowgateResult;
use crate::expr;
use crate::jobs::{GeneratedStep, Job, Step};
use crate::workflow::{SafeOutputKind, WorkflowIr};

/// Default agent timeout in minutes
pub const DEFAULT_TIMEOUT_MINUTES: u32 = 20;

pub const ENV_ENGINE: &str = "FLOWGATE_ENGINE";
pub const ENV_MODEL: &str = "FLOWGATE_MODEL";
pub const ENV_MAX_TURNS: &str = "FLOWGATE_MAX_TURNS";
pub const ENV_SANDBOX: &str = "FLOWGATE_SANDBOX";
pub const ENV_MOUNTS: &str = "FLOWGATE_MOUNTS";
pub const ENV_ALLOWED_DOMAINS: &str = "FLOWGATE_ALLOWED_DOMAINS";
pub const ENV_SAFE_OUTPUTS: &str = "FLOWGATE_SAFE_OUTPUTS";

/// Directory a memory entry is checked out to inside the agent job
pub fn repo_memory_dir(id: &str) -> String {
    format!("/tmp/flowgate/repo-memory/{}", id)
}

pub fn cache_memory_dir(id: &str) -> String {
    format!("/tmp/flowgate/cache-memory/{}", id)
}

/// Cache key of a cache-memory entry
pub fn cache_key(id: &str, key: Option<&str>) -> String {
    key.map(str::to_string)
        .unwrap_or_else(|| format!("flowgate-memory-{}", id))
}

pub fn build_agent(ir: &WorkflowIr, options: &CompilerOptions, activation: &Job) -> FlowgateResult<Job> {
    let runs_on = ir.runs_on.clone().unwrap_or_else(|| options.runs_on.clone());
    let mut job = Job::new(names::AGENT_JOB, runs_on)
        .needs([activation.name.clone()])
        .permissions(ir.permissions.clone());
    job.timeout_minutes = Some(ir.timeout_minutes.unwrap_or(DEFAULT_TIMEOUT_MINUTES));
    job.env = ir.env.clone();

    job.steps.push(
        GeneratedStep::uses("Checkout repository", names::CHECKOUT_ACTION)
            .input("persist-credentials", "false")
            .into(),
    );

    for memory in ir.cache_memories() {
        let key = cache_key(&memory.id, memory.key.as_deref());
        job.steps.push(
            GeneratedStep::uses(format!("Restore cache memory ({})", memory.id), names::CACHE_RESTORE_ACTION)
                .input("key", format!("{}-${{{{ github.run_id }}}}", key))
                .input("restore-keys", format!("{}-", key))
                .input("path", cache_memory_dir(&memory.id))
                .into(),
        );
    }

    for memory in ir.repo_memories() {
        job.steps.push(
            GeneratedStep::run(
                format!("Clone repo memory ({})", memory.id),
                "git fetch origin \"$BRANCH\" && git worktree add \"$DIR\" \"origin/$BRANCH\" || mkdir -p \"$DIR\"",
            )
            .env("BRANCH", memory.branch())
            .env("DIR", repo_memory_dir(&memory.id))
            .into(),
        );
    }

    job.steps.extend(ir.steps.iter().cloned().map(Step::User));
    job.steps.push(engine_step(ir).into());

    job.steps.push(
        GeneratedStep::uses("Collect agent output", names::GITHUB_SCRIPT_ACTION)
            .id(names::COLLECT_OUTPUT_STEP)
            .env(
                crate::safe_outputs::ENV_AGENT_OUTPUT,
                names::AGENT_OUTPUT_PATH,
            )
            .input("script", names::script_call(names::COLLECT_OUTPUT_STEP))
            .into(),
    );
    job.steps.push(
        GeneratedStep::uses("Upload agent output", names::UPLOAD_ARTIFACT_ACTION)
            .when(&expr::always())
            .input("name", names::AGENT_OUTPUT_ARTIFACT)
            .input("path", names::AGENT_OUTPUT_PATH)
            .input("if-no-files-found", "warn")
            .into(),
    );

    if ir.safe_outputs.create_pull_request.is_some() {
        let has_patch = names::step_output(names::COLLECT_OUTPUT_STEP, names::AGENT_HAS_PATCH);
        job.steps.push(
            GeneratedStep::uses("Upload patch", names::UPLOAD_ARTIFACT_ACTION)
                .when(&expr::equals(has_patch, "true"))
                .input("name", names::PATCH_ARTIFACT)
                .input("path", format!("{}{}", names::PATCH_DIR, names::PATCH_ARTIFACT))
                .into(),
        );
    }

    for memory in ir.repo_memories() {
        job.steps.push(memory_upload("repo-memory", &memory.id, repo_memory_dir(&memory.id)).into());
    }
    for memory in ir.cache_memories() {
        job.steps.push(memory_upload("cache-memory", &memory.id, cache_memory_dir(&memory.id)).into());
    }

    for output in [names::AGENT_OUTPUT, names::AGENT_OUTPUT_TYPES, names::AGENT_HAS_PATCH] {
        job.outputs.insert(
            output.to_string(),
            format!("${{{{ {} }}}}", names::step_output(names::COLLECT_OUTPUT_STEP, output)),
        );
    }

    Ok(job)
}

fn engine_step(ir: &WorkflowIr) -> GeneratedStep {
    let engine = &ir.engine;
    let mut step = GeneratedStep::run(
        format!("Run {} agent", engine.id.as_str()),
        "/tmp/flowgate/actions/run_engine.sh",
    )
    .id(names::ENGINE_STEP)
    .env(ENV_ENGINE, engine.id.as_str())
    .env(ENV_SANDBOX, ir.sandbox.agent.as_str())
    .env(names::ENV_WORKFLOW_NAME, ir.name.as_str())
    .env(
        crate::safe_outputs::ENV_AGENT_OUTPUT,
        names::AGENT_OUTPUT_PATH,
    );

    if let Some(model) = &engine.model {
        step = step.env(ENV_MODEL, model.as_str());
    }
    if let Some(turns) = engine.max_turns {
        step = step.env(ENV_MAX_TURNS, turns.to_string());
    }
    if !ir.sandbox.mounts.is_empty() {
        let mounts: Vec<String> = ir.sandbox.mounts.iter().map(ToString::to_string).collect();
        step = step.env(ENV_MOUNTS, mounts.join(","));
    }
    if let Some(network) = &ir.network {
        step = step.env(ENV_ALLOWED_DOMAINS, network.allowed.join(","));
    }

    let kinds: Vec<&str> = ir
        .safe_outputs
        .enabled_kinds()
        .iter()
        .map(SafeOutputKind::as_str)
        .collect();
    if !kinds.is_empty() {
        step = step.env(ENV_SAFE_OUTPUTS, kinds.join(","));
    }
    step
}

fn memory_upload(kind: &str, id: &str, path: String) -> GeneratedStep {
    GeneratedStep::uses(format!("Upload {} ({})", kind, id), names::UPLOAD_ARTIFACT_ACTION)
        .when(&expr::always())
        .input("name", format!("{}-{}", kind, id))
        .input("path", path)
        .input("if-no-files-found", "ignore")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(yaml: &str) -> Job {
        let ir = WorkflowIr::from_yaml(yaml).unwrap();
        let activation = Job::new(names::ACTIVATION_JOB, "ubuntu-latest");
        build_agent(&ir, &CompilerOptions::default(), &activation).unwrap()
    }

    fn engine(job: &Job) -> &GeneratedStep {
        job.steps
            .iter()
            .find_map(|s| match s {
                Step::Generated(g) if g.id.as_deref() == Some(names::ENGINE_STEP) => Some(g),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_agent_shape() {
        let job = build(
            "name: x\npermissions:\n  contents: read\nsteps:\n  - id: setup\n    run: make deps\n",
        );
        assert_eq!(job.needs, vec!["activation"]);
        assert_eq!(job.timeout_minutes, Some(DEFAULT_TIMEOUT_MINUTES));
        assert!(job.steps.iter().any(|s| s.id() == Some("setup")));
        assert!(job.outputs.contains_key(names::AGENT_OUTPUT_TYPES));
        assert!(job.permissions.write_scopes().is_empty());
    }

    #[test]
    fn test_engine_env() {
        let job = build(
            r#"
name: x
engine:
  id: codex
  model: o4
sandbox:
  agent: srt
  mounts: ['/data:/mnt/data']
network:
  allowed: [defaults, python]
safe-outputs:
  add-comment: {}
  create-issue: {}
"#,
        );
        let step = engine(&job);
        assert_eq!(step.env[ENV_ENGINE], "codex");
        assert_eq!(step.env[ENV_MODEL], "o4");
        assert_eq!(step.env[ENV_SANDBOX], "srt");
        assert_eq!(step.env[ENV_MOUNTS], "/data:/mnt/data:ro");
        assert_eq!(step.env[ENV_ALLOWED_DOMAINS], "defaults,python");
        assert_eq!(step.env[ENV_SAFE_OUTPUTS], "create_issue,add_comment");
    }

    #[test]
    fn test_workflow_env_only_at_job_level() {
        let job = build("name: x\nenv:\n  LOG_LEVEL: debug\n");
        assert_eq!(job.env["LOG_LEVEL"], "debug");
        assert!(!engine(&job).env.contains_key("LOG_LEVEL"));
    }

    #[test]
    fn test_patch_upload_only_for_pull_requests() {
        let without = build("name: x\n");
        assert!(!without.steps.iter().any(|s| matches!(s, Step::Generated(g) if g.name == "Upload patch")));

        let with = build("name: x\nsafe-outputs:\n  create-pull-request: {}\n");
        assert!(with.steps.iter().any(|s| matches!(s, Step::Generated(g) if g.name == "Upload patch")));
    }

    #[test]
    fn test_memory_steps() {
        let job = build("name: x\nrepo-memory:\n  id: notes\ncache-memory:\n  - id: scratch\n    key: my-key\n");
        let step_names: Vec<&str> = job
            .steps
            .iter()
            .filter_map(|s| match s {
                Step::Generated(g) => Some(g.name.as_str()),
                Step::User(_) => None,
            })
            .collect();
        assert!(step_names.contains(&"Restore cache memory (scratch)"));
        assert!(step_names.contains(&"Clone repo memory (notes)"));
        assert!(step_names.contains(&"Upload repo-memory (notes)"));
        assert!(step_names.contains(&"Upload cache-memory (scratch)"));
        assert_eq!(cache_key("scratch", Some("my-key")), "my-key");
    }
}
