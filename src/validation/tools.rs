// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

use super::ValidationResult;
use crate::errors::FlowgateError;
use crate::workflow::WorkflowIr;

const GITHUB_MODES: [&str; 2] = ["local", "remote"];

pub fn check_github_mode(ir: &WorkflowIr, result: &mut ValidationResult) {
    if let Some(github) = &ir.tools.github {
        if !GITHUB_MODES.contains(&github.mode.as_str()) {
            result.add_error(FlowgateError::InvalidGithubMode {
                mode: github.mode.clone(),
            });
        }
    }
}
