// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! User-declared job checks

use super::ValidationResult;
use crate::compiler::names;
use crate::errors::FlowgateError;
use crate::workflow::{SafeOutputKind, WorkflowIr};

/// Whether `name` is a job the compiler generates itself
pub fn is_reserved(name: &str) -> bool {
    names::RESERVED_JOBS.contains(&name) || SafeOutputKind::ALL.iter().any(|k| k.as_str() == name)
}

pub fn check_custom_jobs(ir: &WorkflowIr, result: &mut ValidationResult) {
    for (name, job) in &ir.jobs {
        if is_reserved(name) {
            result.add_error(FlowgateError::InvalidCustomJob {
                job: name.clone(),
                reason: "the name is reserved for a generated job".into(),
            });
            continue;
        }

        if job.uses.is_some() && !job.steps.is_empty() {
            result.add_error(FlowgateError::UsesWithSteps { job: name.clone() });
        }

        // pre_activation only contributes to the gating job
        if name != names::PRE_ACTIVATION_JOB && job.uses.is_none() && job.steps.is_empty() {
            result.add_error(FlowgateError::InvalidCustomJob {
                job: name.clone(),
                reason: "declare either 'steps' or 'uses'".into(),
            });
        }

        if name == names::PRE_ACTIVATION_JOB && job.uses.is_some() {
            result.add_error(FlowgateError::InvalidCustomJob {
                job: name.clone(),
                reason: "it is merged into the gating job and cannot call a reusable workflow"
                    .into(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(yaml: &str) -> ValidationResult {
        let ir = WorkflowIr::from_yaml(yaml).unwrap();
        let mut result = ValidationResult::new();
        check_custom_jobs(&ir, &mut result);
        result
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved("agent"));
        assert!(is_reserved("create_issue"));
        assert!(!is_reserved("pre_activation"));
        assert!(!is_reserved("lint"));

        let result = check("name: x\njobs:\n  conclusion:\n    steps:\n      - run: echo\n");
        assert!(matches!(
            result.errors[0],
            FlowgateError::InvalidCustomJob { .. }
        ));
    }

    #[test]
    fn test_uses_with_steps() {
        let result = check(
            "name: x\njobs:\n  deploy:\n    uses: org/repo/.github/workflows/d.yml@main\n    steps:\n      - run: echo\n",
        );
        assert!(matches!(result.errors[0], FlowgateError::UsesWithSteps { .. }));
    }

    #[test]
    fn test_empty_job() {
        let result = check("name: x\njobs:\n  lint: {}\n");
        assert!(!result.is_valid());

        let result = check("name: x\njobs:\n  pre_activation:\n    outputs:\n      ready: 'yes'\n");
        assert!(result.is_valid());
    }
}
