// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Graph command - show the compiled job graph

use miette::Result;
use std::path::PathBuf;

use super::GraphFormat;
use crate::compiler::Compiler;
use crate::config::CompilerOptions;
use crate::workflow::WorkflowIr;

/// Run the graph command
pub async fn run(workflow_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    if !workflow_path.exists() {
        return Err(miette::miette!(
            "Workflow file not found: {}",
            workflow_path.display()
        ));
    }

    let cwd = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let options = CompilerOptions::load_from_project(&cwd)?;

    let ir = WorkflowIr::from_file(&workflow_path)?;
    let compiled = Compiler::new(options).compile(&ir)?;

    let output = match format {
        GraphFormat::Text => compiled.store.to_text(),
        GraphFormat::Dot => compiled.store.to_dot(),
        GraphFormat::Mermaid => compiled.store.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
