// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Safe-output job factory
//!
//! One builder per output kind. All builders share the same contract,
//! implemented once in [`SafeOutputJobBuilder`]:
//!
//! - the job needs the agent job (and the detection job when enabled);
//! - it runs only when the agent actually produced that kind of output;
//! - permissions are the minimal set for the kind;
//! - the token is resolved with [`resolve_token`];
//! - `max` is capped with [`effective_max`].

mod add_comment;
mod add_labels;
mod create_discussion;
mod create_issue;
mod create_pull_request;
mod update_project;

pub use add_comment::AddComment;
pub use add_labels::AddLabels;
pub use create_discussion::CreateDiscussion;
pub use create_issue::CreateIssue;
pub use create_pull_request::CreatePullRequest;
pub use update_project::UpdateProject;

use std::collections::BTreeMap;
use tracing::debug;

use crate::compiler::names;
use crate::config::CompilerOptions;
use crate::errors::{FlowgateError, FlowgateResult};
use crate::expr::{self, ConditionNode};
use crate::jobs::{GeneratedStep, Job, Permissions, Step};
use crate::workflow::{CommonOutputOptions, SafeOutputKind, SafeOutputsConfig, WorkflowIr};

/// Token used when nothing more specific is configured
pub const DEFAULT_TOKEN: &str = "${{ secrets.GITHUB_TOKEN }}";

/// Environment variable holding the path of the agent output file
pub const ENV_AGENT_OUTPUT: &str = "FLOWGATE_AGENT_OUTPUT";

/// Environment variable set when safe outputs run in preview mode
pub const ENV_STAGED: &str = "FLOWGATE_SAFE_OUTPUTS_STAGED";

/// What a builder needs to know about the surrounding compilation
#[derive(Debug, Clone, Copy)]
pub struct SafeOutputContext<'a> {
    pub ir: &'a WorkflowIr,
    pub options: &'a CompilerOptions,
    /// Job whose output is consumed
    pub main_job: &'a str,
    /// Detection job to wait for, when threat detection is enabled
    pub detection_job: Option<&'a str>,
}

/// A safe-output kind
pub trait SafeOutput {
    type Config;

    const KIND: SafeOutputKind;

    /// Display name of the generated job
    const TITLE: &'static str;

    /// Outputs of the main step, exposed as job outputs
    const OUTPUTS: &'static [&'static str];

    /// This kind's configuration, if enabled
    fn select(outputs: &SafeOutputsConfig) -> Option<&Self::Config>;

    fn common(config: &Self::Config) -> &CommonOutputOptions;

    /// Minimal permissions the job needs
    fn permissions(config: &Self::Config) -> Permissions;

    /// Add kind-specific env, steps and outputs
    fn configure(
        config: &Self::Config,
        ctx: &SafeOutputContext<'_>,
        job: &mut SafeOutputJobBuilder,
    ) -> FlowgateResult<()>;
}

/// Build the job for kind `S`.
///
/// `config` is `None` only when the caller did not check that the kind is
/// enabled, which is a defect in the caller.
pub fn build<S: SafeOutput>(
    config: Option<&S::Config>,
    ctx: &SafeOutputContext<'_>,
) -> FlowgateResult<Job> {
    let config = config.ok_or_else(|| FlowgateError::SafeOutputNotConfigured {
        kind: S::KIND.to_string(),
    })?;

    let mut builder = SafeOutputJobBuilder::new(S::KIND, S::common(config), ctx);
    builder.title = S::TITLE.to_string();
    builder.permissions = S::permissions(config);
    builder.outputs = S::OUTPUTS.iter().map(|o| o.to_string()).collect();
    S::configure(config, ctx, &mut builder)?;

    let job = builder.build(ctx)?;
    debug!(kind = %S::KIND, "built safe-output job");
    Ok(job)
}

/// Build the job for `kind` from the workflow's configuration
pub fn build_kind(kind: SafeOutputKind, ctx: &SafeOutputContext<'_>) -> FlowgateResult<Job> {
    let outputs = &ctx.ir.safe_outputs;
    match kind {
        SafeOutputKind::CreateIssue => build::<CreateIssue>(CreateIssue::select(outputs), ctx),
        SafeOutputKind::CreateDiscussion => {
            build::<CreateDiscussion>(CreateDiscussion::select(outputs), ctx)
        }
        SafeOutputKind::AddComment => build::<AddComment>(AddComment::select(outputs), ctx),
        SafeOutputKind::AddLabels => build::<AddLabels>(AddLabels::select(outputs), ctx),
        SafeOutputKind::CreatePullRequest => {
            build::<CreatePullRequest>(CreatePullRequest::select(outputs), ctx)
        }
        SafeOutputKind::UpdateProject => build::<UpdateProject>(UpdateProject::select(outputs), ctx),
    }
}

/// Pick the token for a safe-output job.
///
/// The most specific non-blank value wins: the kind's own token, then the
/// token shared by all safe outputs, then the workflow's token, then the
/// default repository token.
pub fn resolve_token(specific: Option<&str>, family: Option<&str>, workflow: Option<&str>) -> String {
    [specific, family, workflow]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TOKEN)
        .to_string()
}

/// The cap actually applied for a kind. Single-result kinds are clamped to 1
/// whatever the user asked for.
pub fn effective_max(kind: SafeOutputKind, requested: Option<u32>) -> u32 {
    if kind.is_single_result() {
        return 1;
    }
    match requested {
        Some(0) | None => kind.default_max(),
        Some(max) => max,
    }
}

/// Condition under which a safe-output job runs
pub fn run_condition(kind: SafeOutputKind, main_job: &str, detection_job: Option<&str>) -> ConditionNode {
    let mut conditions = vec![
        expr::not_cancelled(),
        expr::not_equals(names::job_result(main_job), "skipped"),
        expr::contains(
            names::job_output(main_job, names::AGENT_OUTPUT_TYPES),
            kind.as_str(),
        ),
    ];
    if let Some(detection) = detection_job {
        conditions.push(expr::equals(
            names::job_output(detection, names::DETECTION_SUCCESS),
            "true",
        ));
    }
    conditions
        .into_iter()
        .reduce(expr::and)
        .unwrap_or_else(expr::not_cancelled)
}

/// Shared assembly of a safe-output job
#[derive(Debug, Clone)]
pub struct SafeOutputJobBuilder {
    kind: SafeOutputKind,
    title: String,
    token: String,
    max: u32,
    permissions: Permissions,
    env: BTreeMap<String, String>,
    pre_steps: Vec<Step>,
    post_steps: Vec<Step>,
    outputs: Vec<String>,
}

impl SafeOutputJobBuilder {
    fn new(kind: SafeOutputKind, common: &CommonOutputOptions, ctx: &SafeOutputContext<'_>) -> Self {
        let token = resolve_token(
            common.github_token.as_deref(),
            ctx.ir.safe_outputs.github_token.as_deref(),
            ctx.ir.github_token.as_deref(),
        );

        Self {
            kind,
            title: kind.to_string(),
            token,
            max: effective_max(kind, common.max),
            permissions: Permissions::none(),
            env: BTreeMap::new(),
            pre_steps: Vec::new(),
            post_steps: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn kind(&self) -> SafeOutputKind {
        self.kind
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Set `<KIND_PREFIX>_<suffix>` on the main step
    pub fn env(&mut self, suffix: &str, value: impl Into<String>) -> &mut Self {
        self.env
            .insert(format!("{}_{}", self.kind.env_prefix(), suffix), value.into());
        self
    }

    pub fn env_opt(&mut self, suffix: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.env(suffix, value);
        }
        self
    }

    /// Comma-separated list, omitted when empty
    pub fn env_list(&mut self, suffix: &str, values: &[String]) -> &mut Self {
        if !values.is_empty() {
            self.env(suffix, values.join(","));
        }
        self
    }

    pub fn pre_step(&mut self, step: impl Into<Step>) -> &mut Self {
        self.pre_steps.push(step.into());
        self
    }

    /// Step run after the main step, only when `output` of the main step is
    /// non-empty
    pub fn post_step(&mut self, output: &str, step: GeneratedStep) -> &mut Self {
        let condition = expr::not_equals(names::step_output(self.kind.as_str(), output), "");
        self.post_steps.push(step.when(&condition).into());
        self
    }

    /// Expression for an output of the main step
    pub fn main_output(&self, output: &str) -> String {
        format!("${{{{ {} }}}}", names::step_output(self.kind.as_str(), output))
    }

    fn build(self, ctx: &SafeOutputContext<'_>) -> FlowgateResult<Job> {
        let kind = self.kind.as_str();

        let mut env = BTreeMap::new();
        env.insert(ENV_AGENT_OUTPUT.to_string(), names::AGENT_OUTPUT_PATH.to_string());
        env.insert(format!("{}_MAX", self.kind.env_prefix()), self.max.to_string());
        env.insert(names::ENV_WORKFLOW_NAME.to_string(), ctx.ir.name.clone());
        if ctx.ir.safe_outputs.staged {
            env.insert(ENV_STAGED.to_string(), "true".to_string());
        }
        env.extend(self.env);

        let main = GeneratedStep::uses(self.title.clone(), names::GITHUB_SCRIPT_ACTION)
            .id(kind)
            .envs(&env)
            .input("github-token", self.token.as_str())
            .input("script", names::script_call(kind));

        let download = GeneratedStep::uses("Download agent output", names::DOWNLOAD_ARTIFACT_ACTION)
            .input("name", names::AGENT_OUTPUT_ARTIFACT)
            .input("path", names::AGENT_OUTPUT_DIR);

        let mut needs = vec![ctx.main_job.to_string()];
        if let Some(detection) = ctx.detection_job {
            needs.push(detection.to_string());
        }

        let mut job = Job::new(kind, ctx.options.runs_on.clone())
            .needs(needs)
            .when(&run_condition(self.kind, ctx.main_job, ctx.detection_job))
            .permissions(self.permissions)
            .step(download);
        job.display_name = Some(self.title);
        job.timeout_minutes = Some(10);
        job.steps.extend(self.pre_steps);
        job.steps.push(main.into());
        job.steps.extend(self.post_steps);

        for output in &self.outputs {
            let value = format!("${{{{ {} }}}}", names::step_output(kind, output));
            job.outputs.insert(output.clone(), value);
        }

        job.validate()?;
        Ok(job)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::CompilerOptions;
    use crate::workflow::WorkflowIr;

    pub fn workflow(yaml: &str) -> WorkflowIr {
        WorkflowIr::from_yaml(yaml).unwrap()
    }

    pub fn options() -> CompilerOptions {
        CompilerOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::jobs::{PermissionLevel, PermissionScope};

    #[test]
    fn test_token_precedence_specific_over_family() {
        assert_eq!(resolve_token(Some("kind"), Some("family"), None), "kind");
    }

    #[test]
    fn test_token_precedence_specific_over_workflow() {
        assert_eq!(resolve_token(Some("kind"), None, Some("workflow")), "kind");
    }

    #[test]
    fn test_token_precedence_family_over_workflow() {
        assert_eq!(resolve_token(None, Some("family"), Some("workflow")), "family");
    }

    #[test]
    fn test_token_falls_back_to_default() {
        assert_eq!(resolve_token(None, Some("  "), None), DEFAULT_TOKEN);
    }

    #[test]
    fn test_effective_max() {
        assert_eq!(effective_max(SafeOutputKind::CreatePullRequest, Some(5)), 1);
        assert_eq!(effective_max(SafeOutputKind::CreatePullRequest, None), 1);
        assert_eq!(effective_max(SafeOutputKind::CreateIssue, None), 1);
        assert_eq!(effective_max(SafeOutputKind::CreateIssue, Some(4)), 4);
        assert_eq!(effective_max(SafeOutputKind::AddLabels, None), 3);
        assert_eq!(effective_max(SafeOutputKind::UpdateProject, Some(0)), 10);
    }

    #[test]
    fn test_unconfigured_kind_is_contract_error() {
        let ir = workflow("name: x\n");
        let opts = options();
        let ctx = SafeOutputContext {
            ir: &ir,
            options: &opts,
            main_job: "agent",
            detection_job: None,
        };
        let err = build_kind(SafeOutputKind::CreateIssue, &ctx).unwrap_err();
        assert!(matches!(err, FlowgateError::SafeOutputNotConfigured { ref kind } if kind == "create_issue"));
    }

    #[test]
    fn test_shared_contract() {
        let ir = workflow(
            r#"
name: triage
github-token: ${{ secrets.WORKFLOW_TOKEN }}
safe-outputs:
  staged: true
  add-comment: {}
"#,
        );
        let opts = options();
        let ctx = SafeOutputContext {
            ir: &ir,
            options: &opts,
            main_job: "agent",
            detection_job: Some("detection"),
        };
        let job = build_kind(SafeOutputKind::AddComment, &ctx).unwrap();

        assert_eq!(job.name, "add_comment");
        assert_eq!(job.needs, vec!["agent", "detection"]);
        let condition = job.if_condition.as_deref().unwrap();
        assert!(condition.contains("!cancelled()"));
        assert!(condition.contains("contains(needs.agent.outputs.output_types, 'add_comment')"));
        assert!(condition.contains("needs.detection.outputs.success == 'true'"));
        assert_eq!(
            job.permissions.level(PermissionScope::Issues),
            PermissionLevel::Write
        );
        assert_eq!(job.outputs["comment_id"], "${{ steps.add_comment.outputs.comment_id }}");

        let main = job
            .steps
            .iter()
            .find_map(|s| match s {
                Step::Generated(g) if g.id.as_deref() == Some("add_comment") => Some(g),
                _ => None,
            })
            .unwrap();
        assert_eq!(main.with["github-token"], "${{ secrets.WORKFLOW_TOKEN }}");
        assert_eq!(main.env[ENV_STAGED], "true");
        assert_eq!(main.env["FLOWGATE_ADD_COMMENT_MAX"], "1");
        assert_eq!(main.env[ENV_AGENT_OUTPUT], names::AGENT_OUTPUT_PATH);
    }

    #[test]
    fn test_run_condition_rendering() {
        insta::assert_snapshot!(
            run_condition(SafeOutputKind::CreateIssue, "agent", None).render(),
            @"(!cancelled()) && (!(needs.agent.result == 'skipped')) && (contains(needs.agent.outputs.output_types, 'create_issue'))"
        );
    }
}
