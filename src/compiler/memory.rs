// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Memory persistence jobs
//!
//! The agent runs without write access, so memory it changed is uploaded as
//! an artifact and persisted by these jobs afterwards. They run even when the
//! agent fails, so partial progress is kept.

use crate::compiler::agent::{cache_key, cache_memory_dir, repo_memory_dir};
use crate::compiler::names;
use crate::config::CompilerOptions;
use crate::expr::{self, ConditionNode};
use crate::jobs::{GeneratedStep, Job, PermissionScope, Permissions};
use crate::workflow::WorkflowIr;

pub const ENV_MEMORY_BRANCH: &str = "FLOWGATE_MEMORY_BRANCH";
pub const ENV_MEMORY_DIR: &str = "FLOWGATE_MEMORY_DIR";
pub const ENV_MEMORY_MAX_FILE_SIZE: &str = "FLOWGATE_MEMORY_MAX_FILE_SIZE";

fn persistence_condition(detection: Option<&str>) -> ConditionNode {
    match detection {
        Some(detection) => expr::and(
            expr::always(),
            expr::equals(names::job_output(detection, names::DETECTION_SUCCESS), "true"),
        ),
        None => expr::always(),
    }
}

fn persistence_job(name: &str, options: &CompilerOptions, agent: &str, detection: Option<&str>) -> Job {
    let mut needs = vec![agent.to_string()];
    needs.extend(detection.map(str::to_string));

    let mut job = Job::new(name, options.runs_on.clone())
        .needs(needs)
        .when(&persistence_condition(detection));
    job.timeout_minutes = Some(10);
    job
}

/// Job pushing repo-memory changes to their branches
pub fn build_push_repo_memory(
    ir: &WorkflowIr,
    options: &CompilerOptions,
    agent: &str,
    detection: Option<&str>,
) -> Option<Job> {
    let memories: Vec<_> = ir.repo_memories().collect();
    if memories.is_empty() {
        return None;
    }

    let mut job = persistence_job(names::PUSH_REPO_MEMORY_JOB, options, agent, detection)
        .permissions(Permissions::none().write(PermissionScope::Contents))
        .step(
            GeneratedStep::uses("Checkout repository", names::CHECKOUT_ACTION)
                .input("fetch-depth", "0"),
        );

    for memory in memories {
        let dir = repo_memory_dir(&memory.id);
        job = job
            .step(
                GeneratedStep::uses(
                    format!("Download repo-memory ({})", memory.id),
                    names::DOWNLOAD_ARTIFACT_ACTION,
                )
                .input("name", format!("repo-memory-{}", memory.id))
                .input("path", dir.as_str()),
            )
            .step({
                let mut step = GeneratedStep::uses(
                    format!("Push repo-memory ({})", memory.id),
                    names::GITHUB_SCRIPT_ACTION,
                )
                .env(ENV_MEMORY_BRANCH, memory.branch())
                .env(ENV_MEMORY_DIR, dir.as_str())
                .input("script", names::script_call("push_repo_memory"));
                if let Some(max) = memory.max_file_size {
                    step = step.env(ENV_MEMORY_MAX_FILE_SIZE, max.to_string());
                }
                step
            });
    }

    Some(job)
}

/// Job saving cache-memory directories to the actions cache
pub fn build_update_cache_memory(
    ir: &WorkflowIr,
    options: &CompilerOptions,
    agent: &str,
    detection: Option<&str>,
) -> Option<Job> {
    let memories: Vec<_> = ir.cache_memories().collect();
    if memories.is_empty() {
        return None;
    }

    let mut job = persistence_job(names::UPDATE_CACHE_MEMORY_JOB, options, agent, detection);

    for memory in memories {
        let dir = cache_memory_dir(&memory.id);
        let key = cache_key(&memory.id, memory.key.as_deref());
        job = job
            .step(
                GeneratedStep::uses(
                    format!("Download cache-memory ({})", memory.id),
                    names::DOWNLOAD_ARTIFACT_ACTION,
                )
                .input("name", format!("cache-memory-{}", memory.id))
                .input("path", dir.as_str()),
            )
            .step(
                GeneratedStep::uses(format!("Save cache-memory ({})", memory.id), names::CACHE_SAVE_ACTION)
                    .input("key", format!("{}-${{{{ github.run_id }}}}", key))
                    .input("path", dir),
            );
    }

    Some(job)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ir(yaml: &str) -> WorkflowIr {
        WorkflowIr::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_no_memory_no_jobs() {
        let ir = ir("name: x\n");
        let opts = CompilerOptions::default();
        assert!(build_push_repo_memory(&ir, &opts, "agent", None).is_none());
        assert!(build_update_cache_memory(&ir, &opts, "agent", None).is_none());
    }

    #[test]
    fn test_repo_memory_job() {
        let ir = ir("name: x\nrepo-memory:\n  - id: notes\n  - id: log\n    branch: bot/log\n");
        let job = build_push_repo_memory(&ir, &CompilerOptions::default(), "agent", Some("detection")).unwrap();

        assert_eq!(job.name, names::PUSH_REPO_MEMORY_JOB);
        assert_eq!(job.needs, vec!["agent", "detection"]);
        assert_eq!(
            job.if_condition.as_deref(),
            Some("(always()) && (needs.detection.outputs.success == 'true')")
        );
        // checkout + (download, push) per entry
        assert_eq!(job.steps.len(), 5);
        assert_eq!(job.permissions.write_scopes(), vec![PermissionScope::Contents]);
    }

    #[test]
    fn test_cache_memory_job() {
        let ir = ir("name: x\ncache-memory:\n  id: scratch\n");
        let job = build_update_cache_memory(&ir, &CompilerOptions::default(), "agent", None).unwrap();
        assert_eq!(job.if_condition.as_deref(), Some("always()"));
        assert!(job.permissions.is_empty());
        assert_eq!(job.steps.len(), 2);
    }
}
