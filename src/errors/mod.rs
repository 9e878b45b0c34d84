// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Error types with educational messages
//!
//! Configuration problems are reported with the offending field, the reason
//! a requirement was triggered and a suggested fix, so that users can repair
//! their workflow without reading compiler internals.

mod educational;
mod recovery;

pub use educational::EducationalMessage;
pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for flowgate operations
pub type FlowgateResult<T> = Result<T, FlowgateError>;

/// Main error type for flowgate
#[derive(Error, Debug, Diagnostic)]
pub enum FlowgateError {
    // ─────────────────────────────────────────────────────────────────────────
    // Policy / configuration errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Write permissions are not allowed by default: {scopes}")]
    #[diagnostic(
        code(flowgate::dangerous_permissions),
        help(
            "Use read permissions and let safe-outputs perform writes, \
             or opt in with 'features: {{ dangerous-permissions-write: true }}'"
        )
    )]
    DangerousPermissions { scopes: String },

    #[error(
        "Campaign workflow detected ({reason}) but no GitHub Project URL is configured"
    )]
    #[diagnostic(
        code(flowgate::campaign_project_missing),
        help("Add 'project: https://github.com/orgs/<org>/projects/<number>' to the workflow")
    )]
    CampaignProjectMissing { reason: String },

    #[error(
        "Campaign workflow detected ({reason}) but the GitHub Project URL is empty; \
         'project' must be a non-empty URL"
    )]
    #[diagnostic(
        code(flowgate::campaign_project_empty),
        help("Set 'project' (or 'project.url') to the URL of the tracking project")
    )]
    CampaignProjectEmpty { reason: String },

    #[error("Strict mode: network domain '{domain}' is not a known ecosystem identifier")]
    #[diagnostic(code(flowgate::strict_network))]
    StrictNetwork {
        domain: String,
        #[help]
        help: Option<String>,
    },

    #[error("Strict mode: the agent sandbox cannot be disabled")]
    #[diagnostic(
        code(flowgate::strict_sandbox_disabled),
        help("Remove 'sandbox.agent: false' or turn off strict mode")
    )]
    StrictSandboxDisabled,

    #[error("Engine '{engine}' does not support network firewalling")]
    #[diagnostic(
        code(flowgate::firewall_unsupported),
        help("Use an engine with firewall support or allow all network access with '*'")
    )]
    FirewallUnsupported { engine: String },

    #[error("Invalid tools.github.mode '{mode}'")]
    #[diagnostic(
        code(flowgate::invalid_github_mode),
        help("Valid modes are 'local' and 'remote'")
    )]
    InvalidGithubMode { mode: String },

    #[error("Invalid mount '{mount}': {reason}")]
    #[diagnostic(
        code(flowgate::invalid_mount),
        help("Mounts use the form 'source:target' or 'source:target:ro|rw'")
    )]
    InvalidMount { mount: String, reason: String },

    #[error("Invalid stop-after value '{value}': {reason}")]
    #[diagnostic(
        code(flowgate::invalid_stop_time),
        help("Use an absolute time ('2026-12-31 23:59:59') or a relative one ('+25h', '+7d')")
    )]
    InvalidStopTime { value: String, reason: String },

    #[error("Custom job '{job}' is invalid: {reason}")]
    #[diagnostic(code(flowgate::invalid_custom_job))]
    InvalidCustomJob { job: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Graph errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Job '{job}' already exists in the graph")]
    #[diagnostic(code(flowgate::duplicate_job))]
    DuplicateJob { job: String },

    #[error("Job '{job}' depends on '{dependency}', which has not been added to the graph")]
    #[diagnostic(
        code(flowgate::unknown_dependency),
        help("Check that '{dependency}' is defined and does not depend on '{job}'")
    )]
    UnknownDependency { job: String, dependency: String },

    #[error("Circular dependency detected")]
    #[diagnostic(
        code(flowgate::circular_dependency),
        help("Review the 'needs' of your custom jobs to remove the cycle")
    )]
    CircularDependency { jobs: Vec<String> },

    #[error("Job '{job}' calls a reusable workflow and cannot also declare steps")]
    #[diagnostic(code(flowgate::uses_with_steps))]
    UsesWithSteps { job: String },

    #[error("Job '{job}' not found in the graph")]
    #[diagnostic(code(flowgate::job_not_found))]
    JobNotFound { job: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Contract errors (defects in calling code)
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Safe output '{kind}' was built without a configuration")]
    #[diagnostic(code(flowgate::safe_output_not_configured))]
    SafeOutputNotConfigured { kind: String },

    #[error("Internal contract violated: {message}")]
    #[diagnostic(code(flowgate::contract_violation))]
    ContractViolation { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Workflow file not found: {path}")]
    #[diagnostic(code(flowgate::workflow_not_found))]
    WorkflowNotFound { path: PathBuf },

    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(flowgate::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(flowgate::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    #[error("No workflow files matched pattern: {pattern}")]
    #[diagnostic(
        code(flowgate::no_input_files),
        help("Check that files matching '{pattern}' exist in your project")
    )]
    NoInputFiles { pattern: String },

    #[error("Lock file is out of date: {path}")]
    #[diagnostic(
        code(flowgate::lock_file_outdated),
        help("Run 'flowgate compile' and commit the regenerated lock file")
    )]
    LockFileOutdated { path: PathBuf },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(flowgate::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(flowgate::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(flowgate::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(flowgate::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(flowgate::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for FlowgateError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for FlowgateError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for FlowgateError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for FlowgateError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for FlowgateError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl FlowgateError {
    /// Create a strict-mode network error, suggesting the ecosystem the
    /// domain belongs to when one is close enough to be useful.
    pub fn strict_network(domain: &str, ecosystem_hint: Option<&str>) -> Self {
        let help = match ecosystem_hint {
            Some(eco) => Some(format!(
                "Replace '{}' with the '{}' ecosystem identifier",
                domain, eco
            )),
            None => Some(
                "Use ecosystem identifiers such as 'defaults', 'github', 'python' or 'node'".into(),
            ),
        };

        Self::StrictNetwork {
            domain: domain.to_string(),
            help,
        }
    }

    /// Create a contract violation error
    pub fn contract(message: impl Into<String>) -> Self {
        Self::ContractViolation {
            message: message.into(),
        }
    }

    /// Whether this error comes from user configuration (as opposed to
    /// graph wiring, contract or IO failures).
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::DangerousPermissions { .. }
                | Self::CampaignProjectMissing { .. }
                | Self::CampaignProjectEmpty { .. }
                | Self::StrictNetwork { .. }
                | Self::StrictSandboxDisabled
                | Self::FirewallUnsupported { .. }
                | Self::InvalidGithubMode { .. }
                | Self::InvalidMount { .. }
                | Self::InvalidStopTime { .. }
                | Self::InvalidCustomJob { .. }
        )
    }

    /// Educational explanation for errors that benefit from one
    pub fn explain(&self) -> Option<EducationalMessage> {
        match self {
            Self::CampaignProjectMissing { reason } | Self::CampaignProjectEmpty { reason } => {
                Some(EducationalMessage::campaign_requires_project(reason))
            }
            Self::DangerousPermissions { scopes } => {
                Some(EducationalMessage::dangerous_permissions(scopes))
            }
            Self::StrictNetwork { domain, .. } => Some(EducationalMessage::strict_network(domain)),
            _ => None,
        }
    }

    /// Recovery suggestion for errors that have a concrete fix
    pub fn recovery(&self) -> Option<RecoverySuggestion> {
        match self {
            Self::CircularDependency { jobs } => {
                Some(RecoverySuggestion::fix_circular_dependency(jobs))
            }
            Self::CampaignProjectMissing { .. } | Self::CampaignProjectEmpty { .. } => {
                Some(RecoverySuggestion::add_project_url())
            }
            Self::DangerousPermissions { scopes } => {
                Some(RecoverySuggestion::reduce_permissions(scopes))
            }
            _ => None,
        }
    }

    /// Explanation and recovery steps rendered for the terminal, if any
    pub fn guidance(&self) -> Option<String> {
        let mut out = String::new();
        if let Some(message) = self.explain() {
            out.push_str(&message.to_string());
        }
        if let Some(suggestion) = self.recovery() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&suggestion.to_string());
        }
        (!out.is_empty()).then_some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_missing_message() {
        let err = FlowgateError::CampaignProjectMissing {
            reason: "campaign labels".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("GitHub Project URL"));
        assert!(msg.contains("campaign labels"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_campaign_empty_message_is_distinct() {
        let err = FlowgateError::CampaignProjectEmpty {
            reason: "campaign-id".into(),
        };
        assert!(err.to_string().contains("non-empty"));
        assert!(err.to_string().contains("campaign-id"));
    }

    #[test]
    fn test_contract_errors_are_not_configuration_errors() {
        let err = FlowgateError::SafeOutputNotConfigured {
            kind: "create_issue".into(),
        };
        assert!(!err.is_configuration_error());
        assert!(FlowgateError::contract("empty fold").to_string().contains("empty fold"));
    }

    #[test]
    fn test_strict_network_help() {
        match FlowgateError::strict_network("pypi.org", Some("python")) {
            FlowgateError::StrictNetwork { help, .. } => {
                assert!(help.unwrap().contains("'python'"));
            }
            _ => panic!("Expected StrictNetwork"),
        }
    }

    #[test]
    fn test_guidance_combines_explanation_and_recovery() {
        let err = FlowgateError::DangerousPermissions {
            scopes: "contents".into(),
        };
        let text = err.guidance().unwrap();
        assert!(text.contains("Write access requested for: contents"));
        assert!(text.contains("→ Downgrade write permissions to read"));

        let cycle = FlowgateError::CircularDependency {
            jobs: vec!["a".into(), "b".into()],
        };
        assert!(cycle.guidance().unwrap().starts_with("→ Remove circular dependency"));

        assert!(FlowgateError::contract("x").guidance().is_none());
    }
}
