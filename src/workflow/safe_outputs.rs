// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Safe-output configuration
//!
//! Safe outputs are the privileged actions an agent may request. The agent
//! itself runs with read permissions; each configured kind gets its own job
//! with the minimal write scope it needs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output kinds, in the order their jobs are built
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafeOutputKind {
    CreateIssue,
    CreateDiscussion,
    AddComment,
    AddLabels,
    CreatePullRequest,
    UpdateProject,
}

impl SafeOutputKind {
    pub const ALL: [SafeOutputKind; 6] = [
        Self::CreateIssue,
        Self::CreateDiscussion,
        Self::AddComment,
        Self::AddLabels,
        Self::CreatePullRequest,
        Self::UpdateProject,
    ];

    /// Job name and output-type marker
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateIssue => "create_issue",
            Self::CreateDiscussion => "create_discussion",
            Self::AddComment => "add_comment",
            Self::AddLabels => "add_labels",
            Self::CreatePullRequest => "create_pull_request",
            Self::UpdateProject => "update_project",
        }
    }

    /// Prefix of the kind's environment variables
    pub fn env_prefix(&self) -> String {
        format!("FLOWGATE_{}", self.as_str().to_uppercase())
    }

    /// Cap applied when the user does not set `max`
    pub fn default_max(&self) -> u32 {
        match self {
            Self::AddLabels => 3,
            Self::UpdateProject => 10,
            _ => 1,
        }
    }

    /// Kinds that can only sensibly produce one result
    pub fn is_single_result(&self) -> bool {
        matches!(self, Self::CreatePullRequest)
    }
}

impl fmt::Display for SafeOutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options every kind accepts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommonOutputOptions {
    #[serde(default)]
    pub max: Option<u32>,

    #[serde(default)]
    pub github_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateIssueConfig {
    #[serde(flatten)]
    pub common: CommonOutputOptions,
    #[serde(default)]
    pub title_prefix: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub target_repo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreateDiscussionConfig {
    #[serde(flatten)]
    pub common: CommonOutputOptions,
    #[serde(default)]
    pub title_prefix: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddCommentConfig {
    #[serde(flatten)]
    pub common: CommonOutputOptions,
    /// `triggering` (default), `*`, or an explicit issue number
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub discussion: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AddLabelsConfig {
    #[serde(flatten)]
    pub common: CommonOutputOptions,
    /// Labels the agent may apply; empty allows any
    #[serde(default)]
    pub allowed: Vec<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CreatePullRequestConfig {
    #[serde(flatten)]
    pub common: CommonOutputOptions,
    #[serde(default)]
    pub title_prefix: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default = "default_true")]
    pub draft: bool,
    /// `warn` (default), `error` or `ignore`
    #[serde(default)]
    pub if_no_changes: Option<String>,
}

impl Default for CreatePullRequestConfig {
    fn default() -> Self {
        Self {
            common: CommonOutputOptions::default(),
            title_prefix: None,
            labels: Vec::new(),
            reviewers: Vec::new(),
            draft: true,
            if_no_changes: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UpdateProjectConfig {
    #[serde(flatten)]
    pub common: CommonOutputOptions,
    /// Project to update; defaults to the workflow's `project`
    #[serde(default)]
    pub project: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Threat detection run between the agent and the safe-output jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreatDetection {
    Enabled(bool),
    Config {
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        steps: Vec<serde_yaml::Value>,
    },
}

/// All safe-output configuration of a workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SafeOutputsConfig {
    #[serde(default)]
    pub create_issue: Option<CreateIssueConfig>,
    #[serde(default)]
    pub create_discussion: Option<CreateDiscussionConfig>,
    #[serde(default)]
    pub add_comment: Option<AddCommentConfig>,
    #[serde(default)]
    pub add_labels: Option<AddLabelsConfig>,
    #[serde(default)]
    pub create_pull_request: Option<CreatePullRequestConfig>,
    #[serde(default)]
    pub update_project: Option<UpdateProjectConfig>,

    /// Token shared by every kind
    #[serde(default)]
    pub github_token: Option<String>,

    /// Preview mode: jobs report what they would do without writing
    #[serde(default)]
    pub staged: bool,

    #[serde(default)]
    pub threat_detection: Option<ThreatDetection>,
}

impl SafeOutputsConfig {
    /// Configured kinds, in build order
    pub fn enabled_kinds(&self) -> Vec<SafeOutputKind> {
        SafeOutputKind::ALL
            .iter()
            .copied()
            .filter(|k| self.common(*k).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled_kinds().is_empty()
    }

    /// Shared options of a kind, when that kind is configured
    pub fn common(&self, kind: SafeOutputKind) -> Option<&CommonOutputOptions> {
        match kind {
            SafeOutputKind::CreateIssue => self.create_issue.as_ref().map(|c| &c.common),
            SafeOutputKind::CreateDiscussion => self.create_discussion.as_ref().map(|c| &c.common),
            SafeOutputKind::AddComment => self.add_comment.as_ref().map(|c| &c.common),
            SafeOutputKind::AddLabels => self.add_labels.as_ref().map(|c| &c.common),
            SafeOutputKind::CreatePullRequest => {
                self.create_pull_request.as_ref().map(|c| &c.common)
            }
            SafeOutputKind::UpdateProject => self.update_project.as_ref().map(|c| &c.common),
        }
    }

    /// Labels a kind may apply, for kinds that carry labels
    pub fn labels(&self, kind: SafeOutputKind) -> &[String] {
        match kind {
            SafeOutputKind::CreateIssue => self.create_issue.as_ref().map(|c| c.labels.as_slice()),
            SafeOutputKind::CreateDiscussion => {
                self.create_discussion.as_ref().map(|c| c.labels.as_slice())
            }
            SafeOutputKind::CreatePullRequest => {
                self.create_pull_request.as_ref().map(|c| c.labels.as_slice())
            }
            SafeOutputKind::AddLabels => self.add_labels.as_ref().map(|c| c.allowed.as_slice()),
            SafeOutputKind::AddComment | SafeOutputKind::UpdateProject => None,
        }
        .unwrap_or(&[])
    }

    /// Whether a threat detection job runs before the safe-output jobs
    pub fn threat_detection_enabled(&self) -> bool {
        if self.is_empty() {
            return false;
        }
        match &self.threat_detection {
            None => false,
            Some(ThreatDetection::Enabled(enabled)) => *enabled,
            Some(ThreatDetection::Config { enabled, .. }) => *enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_kinds_follow_build_order() {
        let cfg: SafeOutputsConfig = serde_yaml::from_str(
            "update-project: {}\ncreate-issue:\n  labels: [bug]\nadd-comment: {}\n",
        )
        .unwrap();
        assert_eq!(
            cfg.enabled_kinds(),
            vec![
                SafeOutputKind::CreateIssue,
                SafeOutputKind::AddComment,
                SafeOutputKind::UpdateProject
            ]
        );
        assert_eq!(cfg.labels(SafeOutputKind::CreateIssue), ["bug".to_string()]);
    }

    #[test]
    fn test_common_options_are_flattened() {
        let cfg: SafeOutputsConfig = serde_yaml::from_str(
            "create-pull-request:\n  max: 5\n  github-token: ${{ secrets.PR_TOKEN }}\n",
        )
        .unwrap();
        let common = cfg.common(SafeOutputKind::CreatePullRequest).unwrap();
        assert_eq!(common.max, Some(5));
        assert_eq!(common.github_token.as_deref(), Some("${{ secrets.PR_TOKEN }}"));
        assert!(cfg.create_pull_request.unwrap().draft);
    }

    #[test]
    fn test_threat_detection_requires_outputs() {
        let cfg: SafeOutputsConfig = serde_yaml::from_str("threat-detection: true\n").unwrap();
        assert!(!cfg.threat_detection_enabled());

        let cfg: SafeOutputsConfig =
            serde_yaml::from_str("threat-detection: {}\nadd-comment: {}\n").unwrap();
        assert!(cfg.threat_detection_enabled());

        let cfg: SafeOutputsConfig =
            serde_yaml::from_str("threat-detection: false\nadd-comment: {}\n").unwrap();
        assert!(!cfg.threat_detection_enabled());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SafeOutputKind::AddLabels.env_prefix(), "FLOWGATE_ADD_LABELS");
        assert_eq!(SafeOutputKind::CreatePullRequest.default_max(), 1);
        assert_eq!(SafeOutputKind::UpdateProject.default_max(), 10);
    }
}
