// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Activation job
//!
//! Always present. It runs once the gating checks pass and prepares the
//! sanitized triggering text for the agent.

use crate::compiler::{gating, names};
use crate::config::CompilerOptions;
use crate::errors::FlowgateResult;
use crate::expr::{self, ConditionNode};
use crate::jobs::{GeneratedStep, Job, PermissionScope, Permissions};
use crate::workflow::{TriggerEvent, WorkflowIr};

/// Guard that stops a `workflow_run` from another repository (such as a
/// fork) from activating this workflow
pub fn same_repository_guard() -> ConditionNode {
    expr::or(
        expr::not_equals("github.event_name", TriggerEvent::WorkflowRun.as_str()),
        expr::and(
            expr::comparison(
                expr::property("github.event.workflow_run.repository.id"),
                expr::property("github.repository_id"),
            ),
            expr::not(expr::property("github.event.workflow_run.repository.fork")),
        ),
    )
}

/// The activation job's condition, or `None` when it always runs
pub fn activation_condition(ir: &WorkflowIr, gate: Option<&Job>) -> FlowgateResult<Option<ConditionNode>> {
    let mut parts = Vec::new();

    if let Some(gate) = gate {
        if gate.outputs.contains_key(names::ACTIVATED_OUTPUT) {
            parts.push(expr::equals(
                names::job_output(&gate.name, names::ACTIVATED_OUTPUT),
                "true",
            ));
        }
    }
    if let Some(user) = ir.if_condition.as_deref().filter(|c| !expr::strip_markers(c).is_empty()) {
        parts.push(expr::expression(user));
    }
    if ir.has_trigger(TriggerEvent::WorkflowRun) {
        parts.push(same_repository_guard());
    }

    if parts.is_empty() {
        return Ok(None);
    }
    Ok(Some(expr::conjunction(parts)?))
}

pub fn build_activation(
    ir: &WorkflowIr,
    options: &CompilerOptions,
    gate: Option<&Job>,
) -> FlowgateResult<Job> {
    let mut permissions = Permissions::none().read(PermissionScope::Contents);
    let mut job = Job::new(names::ACTIVATION_JOB, options.runs_on.clone());

    if let Some(gate) = gate {
        job.add_need(gate.name.clone());
    }
    if let Some(condition) = activation_condition(ir, gate)? {
        job = job.when(&condition);
    }

    // Without a gating job the reaction is added here instead
    if ir.reaction.is_some() && gate.is_none() {
        job.steps.push(gating::reaction_step(ir).into());
        permissions = permissions.merge(&gating::reaction_permissions(ir));
    }

    job.steps.push(
        GeneratedStep::uses("Compute current body text", names::GITHUB_SCRIPT_ACTION)
            .id(names::COMPUTE_TEXT_STEP)
            .input("script", names::script_call(names::COMPUTE_TEXT_STEP))
            .into(),
    );
    job.outputs.insert(
        "text".to_string(),
        format!("${{{{ {} }}}}", names::step_output(names::COMPUTE_TEXT_STEP, "text")),
    );

    if let (Some(gate), Some(_)) = (gate, &ir.command) {
        job.outputs.insert(
            names::MATCHED_COMMAND_OUTPUT.to_string(),
            format!(
                "${{{{ {} }}}}",
                names::job_output(&gate.name, names::MATCHED_COMMAND_OUTPUT)
            ),
        );
    }

    job.permissions = permissions;
    job.timeout_minutes = Some(5);
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Step;

    fn ir(yaml: &str) -> WorkflowIr {
        WorkflowIr::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_no_gate_no_condition() {
        let ir = ir("name: x\nroles: all\n");
        let job = build_activation(&ir, &CompilerOptions::default(), None).unwrap();
        assert!(job.needs.is_empty());
        assert!(job.if_condition.is_none());
    }

    #[test]
    fn test_depends_on_gate() {
        let ir = ir("name: x\nstop-after: '+1d'\n");
        let gate = Job::new(names::PRE_ACTIVATION_JOB, "ubuntu-latest")
            .output(names::ACTIVATED_OUTPUT, "${{ true }}");
        let job = build_activation(&ir, &CompilerOptions::default(), Some(&gate)).unwrap();
        assert_eq!(job.needs, vec!["pre_activation"]);
        assert_eq!(
            job.if_condition.as_deref(),
            Some("needs.pre_activation.outputs.activated == 'true'")
        );
    }

    #[test]
    fn test_workflow_run_guard() {
        let ir = ir("name: x\nroles: all\non:\n  - event: workflow_run\n    config:\n      workflows: [CI]\n");
        let job = build_activation(&ir, &CompilerOptions::default(), None).unwrap();
        insta::assert_snapshot!(
            job.if_condition.unwrap(),
            @"(!(github.event_name == 'workflow_run')) || ((github.event.workflow_run.repository.id == github.repository_id) && (!github.event.workflow_run.repository.fork))"
        );
    }

    #[test]
    fn test_user_condition_and_gate() {
        let ir = ir("name: x\nif: ${{ github.actor != 'dependabot[bot]' }}\n");
        let gate = Job::new(names::PRE_ACTIVATION_JOB, "ubuntu-latest")
            .output(names::ACTIVATED_OUTPUT, "${{ true }}");
        let condition = activation_condition(&ir, Some(&gate)).unwrap().unwrap();
        assert_eq!(
            condition.render(),
            "(needs.pre_activation.outputs.activated == 'true') && (github.actor != 'dependabot[bot]')"
        );
    }

    #[test]
    fn test_reaction_moves_here_without_gate() {
        let ir = ir("name: x\nroles: all\nreaction: rocket\n");
        let job = build_activation(&ir, &CompilerOptions::default(), None).unwrap();
        let Step::Generated(first) = &job.steps[0] else {
            panic!("expected generated step");
        };
        assert_eq!(first.id.as_deref(), Some(names::REACTION_STEP));
        assert_eq!(first.env[names::ENV_REACTION], "rocket");
        assert!(!job.permissions.write_scopes().is_empty());
    }
}
