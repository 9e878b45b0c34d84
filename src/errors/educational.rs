// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Educational error messages
//!
//! Provides detailed explanations for policy failures so users learn why a
//! requirement was triggered, not just that it was.

/// Educational message with explanation and examples
#[derive(Debug, Clone)]
pub struct EducationalMessage {
    /// Short summary of the issue
    pub summary: String,
    /// Detailed explanation
    pub explanation: String,
    /// Example of correct usage
    pub example: Option<String>,
    /// Link to documentation
    pub docs_url: Option<String>,
}

impl EducationalMessage {
    /// Explain why a campaign workflow needs a project
    pub fn campaign_requires_project(reason: &str) -> Self {
        Self {
            summary: format!("Campaign workflows need a GitHub Project ({})", reason),
            explanation: format!(
                "This workflow was classified as a campaign because of its {}.\n\n\
                 Campaign workflows coordinate work across many runs, and the\n\
                 tracking project is where that work is aggregated. Without it\n\
                 the issues and pull requests they create cannot be followed up.",
                reason
            ),
            example: Some(
                "# Either a bare URL:\n\
                 project: https://github.com/orgs/my-org/projects/7\n\n\
                 # Or an object:\n\
                 project:\n  url: https://github.com/orgs/my-org/projects/7"
                    .into(),
            ),
            docs_url: Some("https://flowgate.dev/docs/campaigns/".into()),
        }
    }

    /// Explain the dangerous-permission policy
    pub fn dangerous_permissions(scopes: &str) -> Self {
        Self {
            summary: format!("Write access requested for: {}", scopes),
            explanation: "The agent job runs untrusted model output. Giving it write\n\
                          tokens means a prompt injection can change your repository.\n\n\
                          Declare read permissions for the agent and use safe-outputs:\n\
                          they run in separate, minimally scoped jobs after the agent\n\
                          finishes."
                .into(),
            example: Some(
                "permissions:\n  contents: read\n  issues: read\n\n\
                 safe-outputs:\n  create-issue:\n    max: 1"
                    .into(),
            ),
            docs_url: Some("https://flowgate.dev/docs/permissions/".into()),
        }
    }

    /// Explain strict-mode network restrictions
    pub fn strict_network(domain: &str) -> Self {
        Self {
            summary: format!("'{}' is not allowed in strict mode", domain),
            explanation: "Strict mode only accepts ecosystem identifiers (or domains\n\
                          that belong to them) so that every allowed host is part of a\n\
                          reviewed, known set."
                .into(),
            example: Some("network:\n  allowed:\n    - defaults\n    - python".into()),
            docs_url: Some("https://flowgate.dev/docs/network/".into()),
        }
    }
}

impl std::fmt::Display for EducationalMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.summary)?;
        writeln!(f)?;
        writeln!(f, "{}", self.explanation)?;

        if let Some(ref example) = self.example {
            writeln!(f)?;
            writeln!(f, "Example:")?;
            writeln!(f, "────────")?;
            writeln!(f, "{}", example)?;
        }

        if let Some(ref url) = self.docs_url {
            writeln!(f)?;
            writeln!(f, "Learn more: {}", url)?;
        }

        Ok(())
    }
}
