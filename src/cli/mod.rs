// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! CLI command definitions and handlers

pub mod compile;
pub mod graph;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agentic workflow compiler
///
/// Compiles workflow definitions into gated CI job graphs.
#[derive(Parser, Debug)]
#[clap(
    name = "flowgate",
    version,
    about = "Compile agentic workflow definitions into gated, acyclic CI job graphs",
    long_about = None,
    after_help = "Examples:\n\
        flowgate compile                       Compile every *.workflow.yaml\n\
        flowgate compile triage.workflow.yaml  Compile one workflow\n\
        flowgate compile --check               Fail if lock files are stale\n\
        flowgate graph triage.workflow.yaml    Show the job graph\n\n\
        See 'flowgate <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile workflows into lock files
    Compile {
        /// Workflow files or glob patterns
        #[clap(default_value = "*.workflow.yaml")]
        patterns: Vec<String>,

        /// Enforce strict network and sandbox policy
        #[clap(long)]
        strict: bool,

        /// Directory for the lock files (defaults to next to each workflow)
        #[clap(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Verify that compilation is deterministic and lock files are current
        #[clap(long)]
        check: bool,
    },

    /// Check a workflow against compilation policies
    Validate {
        /// Workflow file to validate
        workflow: PathBuf,

        /// Enforce strict network and sandbox policy
        #[clap(long)]
        strict: bool,

        /// Report format (text, json)
        #[clap(short, long, default_value = "text")]
        format: ReportFormat,
    },

    /// Show the compiled job graph
    Graph {
        /// Workflow file
        workflow: PathBuf,

        /// Output format (text, dot, mermaid)
        #[clap(short, long, default_value = "text")]
        format: GraphFormat,
    },
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

impl std::str::FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "dot" => Ok(Self::Dot),
            "mermaid" => Ok(Self::Mermaid),
            _ => Err(format!("Unknown graph format: {}", s)),
        }
    }
}

/// Validation report format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// Lock file path for a workflow file: `triage.workflow.yaml` becomes
/// `triage.lock.yml`
pub fn lock_path(workflow: &std::path::Path, output_dir: Option<&std::path::Path>) -> PathBuf {
    let file_name = workflow
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workflow");
    let stem = file_name
        .strip_suffix(".workflow.yaml")
        .or_else(|| file_name.strip_suffix(".workflow.yml"))
        .or_else(|| file_name.strip_suffix(".yaml"))
        .or_else(|| file_name.strip_suffix(".yml"))
        .unwrap_or(file_name);

    let dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => workflow.parent().map(|p| p.to_path_buf()).unwrap_or_default(),
    };
    dir.join(format!("{}.lock.yml", stem))
}
