// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Workflow compiler
//!
//! Turns a [`WorkflowIr`] into a job graph. Phases run in a fixed order and
//! each one only references jobs added by an earlier phase, so the store's
//! insertion order is always a valid execution order.

pub mod activation;
pub mod agent;
pub mod conclusion;
pub mod custom;
pub mod detection;
pub mod gating;
pub mod memory;
pub mod names;
pub mod triggers;

use serde_yaml::Mapping;
use tracing::{debug, info, info_span};

use crate::config::CompilerOptions;
use crate::errors::FlowgateResult;
use crate::jobs::JobGraphStore;
use crate::safe_outputs::{self, SafeOutputContext};
use crate::validation::PolicyValidator;
use crate::workflow::WorkflowIr;

/// Result of compiling one workflow
#[derive(Debug, Clone)]
pub struct CompiledWorkflow {
    pub name: String,
    /// The `on:` block
    pub on: Mapping,
    pub store: JobGraphStore,
    /// Policy warnings that did not stop compilation
    pub warnings: Vec<String>,
}

/// Compiles workflows with a fixed set of options
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile one workflow
    pub fn compile(&self, ir: &WorkflowIr) -> FlowgateResult<CompiledWorkflow> {
        let span = info_span!("compile", workflow = %ir.name);
        let _guard = span.enter();
        let options = &self.options;

        let warnings = PolicyValidator::check(ir, options)?;
        let mut store = JobGraphStore::new();

        // Gating and activation
        let gate = gating::build_pre_activation(ir, options)?;
        let activation = activation::build_activation(ir, options, gate.as_ref())?;
        if let Some(gate) = gate {
            store.add_job(gate)?;
        }

        // Agent
        let agent = agent::build_agent(ir, options, &activation)?;
        store.add_job(activation)?;
        let agent_name = agent.name.clone();

        let detection = if ir.safe_outputs.threat_detection_enabled() {
            Some(detection::build_detection(ir, options, &agent)?)
        } else {
            None
        };
        store.add_job(agent)?;

        let detection_name = detection.as_ref().map(|job| job.name.clone());
        if let Some(detection) = detection {
            store.add_job(detection)?;
        }

        // Safe outputs
        let ctx = SafeOutputContext {
            ir,
            options,
            main_job: &agent_name,
            detection_job: detection_name.as_deref(),
        };
        for kind in ir.safe_outputs.enabled_kinds() {
            store.add_job(safe_outputs::build_kind(kind, &ctx)?)?;
        }
        debug!(jobs = store.len(), "safe-output phase done");

        // Custom jobs
        for (name, decl) in custom::ordered_custom_jobs(ir, &store)? {
            store.add_job(custom::build_custom_job(name, decl, options)?)?;
        }

        // Everything added so far affects the run status
        let status_jobs: Vec<String> = store.job_names().into_iter().map(str::to_string).collect();

        // Persistence jobs join the conclusion in one pass at the end
        let mut deferred = Vec::new();
        let persistence = [
            memory::build_push_repo_memory(ir, options, &agent_name, detection_name.as_deref()),
            memory::build_update_cache_memory(ir, options, &agent_name, detection_name.as_deref()),
        ];
        for job in persistence.into_iter().flatten() {
            deferred.push(job.name.clone());
            store.add_job(job)?;
        }

        store.add_job(conclusion::build_conclusion(ir, options, &status_jobs))?;
        let appended = store.append_needs(names::CONCLUSION_JOB, &deferred)?;
        debug!(appended, "wired deferred jobs into conclusion");

        info!(jobs = store.len(), warnings = warnings.len(), "compiled workflow");
        Ok(CompiledWorkflow {
            name: ir.name.clone(),
            on: triggers::build_triggers(ir),
            store,
            warnings,
        })
    }
}
