// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! # flowgate - agentic workflow compiler
//!
//! `flowgate` compiles a typed workflow description into a CI job graph:
//! a gating job that decides whether the run may proceed, the agent job,
//! privileged safe-output jobs that act on the agent's output, and a
//! conclusion job.
//!
//! ## Features
//!
//! - **Gating** - role, stop-time, search and command checks folded into one condition
//! - **Safe outputs** - writes happen in separate, minimally-permissioned jobs
//! - **Policy gates** - dangerous permissions, campaigns and strict network rules
//! - **Acyclic by construction** - jobs may only need jobs added before them
//!
//! ## Quick Start
//!
//! ```bash
//! # Compile every workflow in the current directory
//! flowgate compile
//!
//! # Fail CI when lock files are stale
//! flowgate compile --check
//!
//! # Inspect the job graph
//! flowgate graph triage.workflow.yaml --format mermaid
//! ```

pub mod cli;
pub mod compiler;
pub mod config;
pub mod emit;
pub mod errors;
pub mod expr;
pub mod jobs;
pub mod safe_outputs;
pub mod utils;
pub mod validation;
pub mod workflow;

// Re-export commonly used types
pub use compiler::{CompiledWorkflow, Compiler};
pub use config::CompilerOptions;
pub use errors::{FlowgateError, FlowgateResult};
pub use expr::ConditionNode;
pub use jobs::{Job, JobGraphStore};
pub use workflow::WorkflowIr;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
