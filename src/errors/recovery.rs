// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for recovering from errors.

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest fixing a circular dependency between custom jobs
    pub fn fix_circular_dependency(jobs: &[String]) -> Self {
        Self {
            action: "Remove circular dependency".into(),
            steps: vec![
                format!("Detected cycle: {}", jobs.join(" → ")),
                "Review the 'needs' of the jobs listed above".into(),
                "Custom jobs must form a directed acyclic graph (DAG)".into(),
            ],
            commands: vec![
                "# Visualize the compiled job graph:".into(),
                "flowgate graph <workflow> --format mermaid".into(),
            ],
        }
    }

    /// Suggest adding a tracking project to a campaign workflow
    pub fn add_project_url() -> Self {
        Self {
            action: "Link the workflow to a GitHub Project".into(),
            steps: vec![
                "Create (or pick) the project that tracks this campaign".into(),
                "Add its URL under 'project' in the workflow".into(),
                "Or remove the campaign labels / campaign-id if this is not a campaign".into(),
            ],
            commands: vec![],
        }
    }

    /// Suggest replacing write permissions with safe outputs
    pub fn reduce_permissions(scopes: &str) -> Self {
        Self {
            action: "Downgrade write permissions to read".into(),
            steps: vec![
                format!("Change these scopes to 'read': {}", scopes),
                "Configure the matching safe-outputs to perform the writes".into(),
            ],
            commands: vec![
                "# Check the result:".into(),
                "flowgate validate <workflow>".into(),
            ],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
