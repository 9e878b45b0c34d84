// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

use super::ValidationResult;
use crate::errors::FlowgateError;
use crate::jobs::PermissionScope;
use crate::workflow::WorkflowIr;

/// Scopes that are harmless even at write level
const ALWAYS_SAFE: [PermissionScope; 2] = [PermissionScope::Metadata, PermissionScope::IdToken];

/// Reject write access in the top-level permissions unless the workflow
/// opted in. Job-local permissions of generated jobs are not inspected;
/// their builders scope them minimally.
pub fn check_dangerous_permissions(ir: &WorkflowIr, result: &mut ValidationResult) {
    if ir.features.dangerous_permissions_write {
        return;
    }

    let scopes: Vec<&str> = ir
        .permissions
        .write_scopes()
        .into_iter()
        .filter(|s| !ALWAYS_SAFE.contains(s))
        .map(|s| s.as_str())
        .collect();

    if !scopes.is_empty() {
        result.add_error(FlowgateError::DangerousPermissions {
            scopes: scopes.join(", "),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(yaml: &str) -> ValidationResult {
        let ir = WorkflowIr::from_yaml(yaml).unwrap();
        let mut result = ValidationResult::new();
        check_dangerous_permissions(&ir, &mut result);
        result
    }

    #[test]
    fn test_write_scope_rejected() {
        let result = check("name: x\npermissions:\n  contents: read\n  pull-requests: write\n");
        let err = result.errors.first().unwrap();
        assert!(err.to_string().contains("pull-requests"));
    }

    #[test]
    fn test_metadata_and_id_token_are_allowed() {
        let result = check("name: x\npermissions:\n  id-token: write\n  metadata: write\n");
        assert!(result.is_valid());
    }

    #[test]
    fn test_write_all_rejected() {
        let result = check("name: x\npermissions: write-all\n");
        let FlowgateError::DangerousPermissions { scopes } = &result.errors[0] else {
            panic!("expected dangerous permissions error");
        };
        assert!(scopes.contains("contents"));
        assert!(!scopes.contains("id-token"));
    }

    #[test]
    fn test_opt_in_allows_writes() {
        let result = check(
            "name: x\npermissions:\n  issues: write\nfeatures:\n  dangerous-permissions-write: true\n",
        );
        assert!(result.is_valid());
    }
}
