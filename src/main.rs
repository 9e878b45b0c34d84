// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! flowgate - agentic workflow compiler

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowgate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    match cli.command {
        Commands::Compile {
            patterns,
            strict,
            output_dir,
            check,
        } => flowgate::cli::compile::run(patterns, strict, output_dir, check, cli.verbose).await,
        Commands::Validate {
            workflow,
            strict,
            format,
        } => flowgate::cli::validate::run(workflow, strict, format, cli.verbose).await,
        Commands::Graph { workflow, format } => {
            flowgate::cli::graph::run(workflow, format, cli.verbose).await
        }
    }
}
