// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Campaign tracking consistency
//!
//! A campaign workflow reports its progress on a GitHub Project, so it must
//! name one.

use super::ValidationResult;
use crate::errors::FlowgateError;
use crate::workflow::{SafeOutputKind, WorkflowIr};

/// Labels that mark an output as part of a campaign
pub const CAMPAIGN_LABELS: [&str; 2] = ["agentic-campaign", "campaign-tracker"];

const LABEL_BEARING: [SafeOutputKind; 4] = [
    SafeOutputKind::CreateIssue,
    SafeOutputKind::CreateDiscussion,
    SafeOutputKind::CreatePullRequest,
    SafeOutputKind::AddLabels,
];

/// Why the workflow counts as a campaign, if it does
pub fn campaign_reason(ir: &WorkflowIr) -> Option<&'static str> {
    let labelled = LABEL_BEARING.iter().any(|kind| {
        ir.safe_outputs
            .labels(*kind)
            .iter()
            .any(|l| CAMPAIGN_LABELS.contains(&l.trim()))
    });
    if labelled {
        return Some("campaign labels");
    }

    let tracked = ir.repo_memories().any(|m| {
        m.campaign_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    });
    tracked.then_some("campaign-id")
}

pub fn check_campaign_project(ir: &WorkflowIr, result: &mut ValidationResult) {
    let Some(reason) = campaign_reason(ir) else {
        return;
    };
    let reason = reason.to_string();

    match &ir.project {
        None => result.add_error(FlowgateError::CampaignProjectMissing { reason }),
        Some(project) if project.url().is_none() => {
            result.add_error(FlowgateError::CampaignProjectEmpty { reason })
        }
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(yaml: &str) -> ValidationResult {
        let ir = WorkflowIr::from_yaml(yaml).unwrap();
        let mut result = ValidationResult::new();
        check_campaign_project(&ir, &mut result);
        result
    }

    #[test]
    fn test_campaign_label_without_project() {
        let result = check(
            "name: x\nsafe-outputs:\n  create-issue:\n    labels: [agentic-campaign]\n",
        );
        let msg = result.errors[0].to_string();
        assert!(msg.contains("GitHub Project URL"));
        assert!(msg.contains("campaign labels"));
    }

    #[test]
    fn test_allowed_labels_count_as_campaign_labels() {
        let result = check("name: x\nsafe-outputs:\n  add-labels:\n    allowed: [campaign-tracker]\n");
        assert!(!result.is_valid());
    }

    #[test]
    fn test_campaign_id_in_memory_array() {
        let result = check(
            "name: x\nrepo-memory:\n  - id: notes\n  - id: tracker\n    campaign-id: q3\n",
        );
        let msg = result.errors[0].to_string();
        assert!(msg.contains("GitHub Project URL"));
        assert!(msg.contains("campaign-id"));
    }

    #[test]
    fn test_blank_campaign_id_is_not_a_campaign() {
        let result = check("name: x\nrepo-memory:\n  id: notes\n  campaign-id: '  '\n");
        assert!(result.is_valid());
    }

    #[test]
    fn test_empty_project_url() {
        let result = check(
            "name: x\nproject:\n  url: ''\nrepo-memory:\n  campaign-id: q3\n",
        );
        assert!(matches!(
            result.errors[0],
            FlowgateError::CampaignProjectEmpty { .. }
        ));
        assert!(result.errors[0].to_string().contains("non-empty"));
    }

    #[test]
    fn test_campaign_with_project_is_valid() {
        let result = check(
            "name: x\nproject: https://github.com/orgs/acme/projects/1\nsafe-outputs:\n  create-discussion:\n    labels: [campaign-tracker]\n",
        );
        assert!(result.is_valid());
    }
}
