// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Validate command - check a workflow against compilation policies
//!
//! Validation runs the policy checks and then a full compile without writing
//! anything, so graph wiring errors (bad `needs`, cycles, stop times) are
//! reported here as well.

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::ReportFormat;
use crate::compiler::{CompiledWorkflow, Compiler};
use crate::config::CompilerOptions;
use crate::errors::FlowgateError;
use crate::utils::{print_info, print_section, print_success};
use crate::validation::{PolicyValidator, ValidationResult};
use crate::workflow::WorkflowIr;

/// Policy checks followed by a dry-run compile
///
/// The compile only runs when the policy checks pass; its error, if any, is
/// added to the result.
pub fn check_workflow(
    ir: &WorkflowIr,
    options: &CompilerOptions,
) -> (ValidationResult, Option<CompiledWorkflow>) {
    let mut validation = PolicyValidator::validate(ir, options);
    if !validation.is_valid() {
        return (validation, None);
    }

    match Compiler::new(options.clone()).compile(ir) {
        Ok(compiled) => (validation, Some(compiled)),
        Err(err) => {
            validation.add_error(err);
            (validation, None)
        }
    }
}

/// Machine-readable report
fn json_report(
    workflow_path: &std::path::Path,
    validation: &ValidationResult,
    compiled: Option<&CompiledWorkflow>,
) -> serde_json::Value {
    serde_json::json!({
        "workflow": workflow_path.display().to_string(),
        "valid": validation.is_valid(),
        "errors": validation.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        "warnings": validation.warnings,
        "jobs": compiled
            .map(|c| c.store.job_names().into_iter().map(str::to_string).collect::<Vec<_>>())
            .unwrap_or_default(),
    })
}

/// Run the validate command
pub async fn run(
    workflow_path: PathBuf,
    strict: bool,
    format: ReportFormat,
    verbose: bool,
) -> Result<()> {
    let text = format == ReportFormat::Text;
    if text {
        println!("{}", "Validating workflow...".bold());
        println!();
    }

    if !workflow_path.exists() {
        return Err(miette::miette!(
            "Workflow file not found: {}",
            workflow_path.display()
        ));
    }

    let cwd = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let options = CompilerOptions::load_from_project(&cwd)?.with_strict(strict);

    let ir = match WorkflowIr::from_file(&workflow_path) {
        Ok(ir) => ir,
        Err(e) => {
            if text {
                eprintln!("  {} Failed to parse workflow", "✗".red());
                eprintln!();
            }
            return Err(e.into());
        }
    };

    let (validation, compiled) = check_workflow(&ir, &options);

    if !text {
        let report = json_report(&workflow_path, &validation, compiled.as_ref());
        let rendered = serde_json::to_string_pretty(&report).map_err(FlowgateError::from)?;
        println!("{}", rendered);
        if !validation.is_valid() {
            return Err(miette::miette!(
                "Workflow validation failed with {} error(s)",
                validation.errors.len()
            ));
        }
        return Ok(());
    }

    print_success("Workflow file is valid YAML");

    if !validation.warnings.is_empty() {
        print_section(&"Warnings".yellow().bold().to_string());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        print_section("Workflow summary");
        println!("  Name: {}", ir.name);
        println!("  Engine: {}", ir.engine.id.as_str());
        println!("  Strict: {}", ir.is_strict(options.strict));
        let kinds: Vec<&str> = ir
            .safe_outputs
            .enabled_kinds()
            .iter()
            .map(|k| k.as_str())
            .collect();
        if !kinds.is_empty() {
            print_info(&format!("Safe outputs: {}", kinds.join(", ")));
        }
        if let Some(compiled) = &compiled {
            print_info(&format!("Jobs: {}", compiled.store.job_names().join(", ")));
        }
    }

    println!();

    if !validation.is_valid() {
        print_section(&"Errors".red().bold().to_string());
        let count = validation.errors.len();
        for error in validation.errors {
            let guidance = if verbose { error.guidance() } else { None };
            eprintln!("{:?}", miette::Report::new(error));
            if let Some(guidance) = guidance {
                eprintln!("{}", guidance);
            }
        }
        return Err(miette::miette!("Workflow validation failed with {} error(s)", count));
    }

    if validation.has_warnings() {
        println!("{}", "Workflow is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Workflow is valid!".green().bold());
    }
    Ok(())
}
