// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Compile command - turn workflow files into lock files

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

use super::lock_path;
use crate::compiler::Compiler;
use crate::config::CompilerOptions;
use crate::emit;
use crate::errors::{FlowgateError, FlowgateResult};
use crate::utils::{create_progress_bar, print_error, print_success, print_warning, resolve_globs};
use crate::workflow::WorkflowIr;

/// What happened to one workflow file
#[derive(Debug)]
struct Outcome {
    lock: PathBuf,
    jobs: usize,
    warnings: Vec<String>,
    changed: bool,
}

/// Run the compile command
pub async fn run(
    patterns: Vec<String>,
    strict: bool,
    output_dir: Option<PathBuf>,
    check: bool,
    verbose: bool,
) -> Result<()> {
    let cwd = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;

    let mut options = CompilerOptions::load_from_project(&cwd)?.with_strict(strict);
    if output_dir.is_some() {
        options.output_dir = output_dir;
    }
    let options = Arc::new(options);

    let files = resolve_globs(&patterns, &cwd)?;
    let pb = create_progress_bar(files.len() as u64, "Compiling");

    let mut set = JoinSet::new();
    for file in files {
        let options = Arc::clone(&options);
        set.spawn_blocking(move || {
            let outcome = compile_file(&file, &options, check);
            (file, outcome)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        let result = joined.map_err(|e| miette::miette!("Compilation task failed: {}", e))?;
        pb.inc(1);
        results.push(result);
    }
    pb.finish_and_clear();

    // Tasks finish in any order; report in path order
    results.sort_by(|a, b| a.0.cmp(&b.0));

    let mut failures = 0;
    for (file, outcome) in results {
        let display = file.strip_prefix(&cwd).unwrap_or(&file).display().to_string();
        match outcome {
            Ok(outcome) => {
                let verb = match (check, outcome.changed) {
                    (true, _) => "up to date",
                    (false, true) => "written",
                    (false, false) => "unchanged",
                };
                print_success(&format!(
                    "{} → {} ({}, {} jobs)",
                    display,
                    outcome.lock.display(),
                    verb,
                    outcome.jobs
                ));
                for warning in &outcome.warnings {
                    print_warning(warning);
                }
            }
            Err(err) => {
                failures += 1;
                print_error(&display);
                let guidance = if verbose { err.guidance() } else { None };
                eprintln!("{:?}", miette::Report::new(err));
                if let Some(guidance) = guidance {
                    eprintln!("{}", guidance);
                }
            }
        }
    }

    if failures > 0 {
        return Err(miette::miette!("{} workflow(s) failed to compile", failures));
    }

    println!();
    println!("{}", "All workflows compiled.".green().bold());
    Ok(())
}

/// Compile one file and write (or, with `check`, verify) its lock file
fn compile_file(path: &Path, options: &CompilerOptions, check: bool) -> FlowgateResult<Outcome> {
    if !path.exists() {
        return Err(FlowgateError::WorkflowNotFound {
            path: path.to_path_buf(),
        });
    }

    let ir = WorkflowIr::from_file(path)?;
    let compiler = Compiler::new(options.clone());
    let compiled = compiler.compile(&ir)?;

    if check {
        let again = compiler.compile(&ir)?;
        if compiled.store.fingerprint()? != again.store.fingerprint()? {
            return Err(FlowgateError::contract(format!(
                "compiling '{}' twice produced different job graphs",
                path.display()
            )));
        }
    }

    let rendered = emit::to_yaml(&compiled, options.header())?;
    let lock = lock_path(path, options.output_dir.as_deref());
    let existing = std::fs::read_to_string(&lock).ok();
    let changed = existing.as_deref() != Some(rendered.as_str());

    if check {
        if changed {
            return Err(FlowgateError::LockFileOutdated { path: lock });
        }
    } else if changed {
        if let Some(parent) = lock.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FlowgateError::FileWriteError {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }
        std::fs::write(&lock, &rendered).map_err(|e| FlowgateError::FileWriteError {
            path: lock.clone(),
            error: e.to_string(),
        })?;
        debug!(lock = %lock.display(), "wrote lock file");
    }

    Ok(Outcome {
        lock,
        jobs: compiled.store.len(),
        warnings: compiled.warnings,
        changed,
    })
}
