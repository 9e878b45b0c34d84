// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Compilation gate validators
//!
//! Pre-flight policy checks run before any job is built. A failed check
//! aborts compilation with a structured error; softer findings are returned
//! as warnings.

mod campaign;
mod custom;
mod permissions;
mod strict;
mod tools;

pub use campaign::{campaign_reason, check_campaign_project, CAMPAIGN_LABELS};
pub use custom::check_custom_jobs;
pub use permissions::check_dangerous_permissions;
pub use strict::{check_strict_policy, ecosystem_of, ECOSYSTEMS};
pub use tools::check_github_mode;

use tracing::{debug, warn};

use crate::config::CompilerOptions;
use crate::errors::{FlowgateError, FlowgateResult};
use crate::workflow::WorkflowIr;

/// Workflow policy validator
pub struct PolicyValidator;

impl PolicyValidator {
    /// Run every check and collect the findings
    pub fn validate(ir: &WorkflowIr, options: &CompilerOptions) -> ValidationResult {
        let mut result = ValidationResult::new();
        let strict = ir.is_strict(options.strict);

        check_dangerous_permissions(ir, &mut result);
        check_campaign_project(ir, &mut result);
        check_strict_policy(ir, strict, &mut result);
        check_github_mode(ir, &mut result);
        check_custom_jobs(ir, &mut result);

        debug!(
            workflow = %ir.name,
            strict,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "validated workflow policy"
        );
        result
    }

    /// Validate and fail on the first error, returning warnings otherwise
    pub fn check(ir: &WorkflowIr, options: &CompilerOptions) -> FlowgateResult<Vec<String>> {
        Self::validate(ir, options).into_result()
    }
}

/// Result of policy validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<FlowgateError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: FlowgateError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// First error, or the warnings when there is none
    pub fn into_result(self) -> FlowgateResult<Vec<String>> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.warnings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(yaml: &str) -> ValidationResult {
        let ir = WorkflowIr::from_yaml(yaml).unwrap();
        PolicyValidator::validate(&ir, &CompilerOptions::default())
    }

    #[test]
    fn test_clean_workflow_is_valid() {
        let result = validate("name: ok\npermissions:\n  contents: read\n");
        assert!(result.is_valid());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_first_error_is_returned() {
        let result = validate(
            "name: bad\npermissions:\n  issues: write\ntools:\n  github:\n    mode: hybrid\n",
        );
        assert_eq!(result.errors.len(), 2);
        assert!(matches!(
            result.into_result(),
            Err(FlowgateError::DangerousPermissions { .. })
        ));
    }

    #[test]
    fn test_options_force_strict_mode() {
        let ir = WorkflowIr::from_yaml("name: x\nsandbox: false\n").unwrap();

        let relaxed = PolicyValidator::validate(&ir, &CompilerOptions::default());
        assert!(relaxed.is_valid());
        assert!(relaxed.has_warnings());

        let strict = PolicyValidator::check(&ir, &CompilerOptions::default().with_strict(true));
        assert!(matches!(strict, Err(FlowgateError::StrictSandboxDisabled)));
    }
}
