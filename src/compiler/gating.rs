// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Gating chain builder
//!
//! Collects the enabled pre-activation checks into the `pre_activation` job.
//! Each check is a step exposing a `'true'`/`'false'` output; the job's
//! `activated` output is the AND of all of them.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::compiler::names;
use crate::config::CompilerOptions;
use crate::errors::{FlowgateError, FlowgateResult};
use crate::expr::{self, ConditionNode};
use crate::jobs::{GeneratedStep, Job, PermissionScope, Permissions, Step};
use crate::workflow::{CustomJob, TriggerEvent, WorkflowIr};

/// Format of the resolved stop time
pub const STOP_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A pre-activation check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCheck {
    Membership,
    StopTime,
    SkipIfMatch,
    SkipIfNoMatch,
    CommandPosition,
}

impl GateCheck {
    /// `(step id, output name)` of the check
    pub fn wire_names(&self) -> (&'static str, &'static str) {
        match self {
            Self::Membership => names::CHECK_MEMBERSHIP,
            Self::StopTime => names::CHECK_STOP_TIME,
            Self::SkipIfMatch => names::CHECK_SKIP_IF_MATCH,
            Self::SkipIfNoMatch => names::CHECK_SKIP_IF_NO_MATCH,
            Self::CommandPosition => names::CHECK_COMMAND_POSITION,
        }
    }

    /// `steps.<id>.outputs.<output> == 'true'`
    pub fn condition(&self) -> ConditionNode {
        let (step, output) = self.wire_names();
        expr::equals(names::step_output(step, output), "true")
    }
}

/// Checks enabled for a workflow, in evaluation order
pub fn enabled_checks(ir: &WorkflowIr) -> Vec<GateCheck> {
    let mut checks = Vec::new();
    if ir.roles.is_restricted() && ir.is_actor_triggered() {
        checks.push(GateCheck::Membership);
    }
    if ir.stop_after.is_some() {
        checks.push(GateCheck::StopTime);
    }
    if ir.skip_if_match.is_some() {
        checks.push(GateCheck::SkipIfMatch);
    }
    if ir.skip_if_no_match.is_some() {
        checks.push(GateCheck::SkipIfNoMatch);
    }
    if ir.command.is_some() {
        checks.push(GateCheck::CommandPosition);
    }
    checks
}

/// AND of the check conditions.
///
/// Must only be called with at least one check.
pub fn combined_condition(checks: &[GateCheck]) -> FlowgateResult<ConditionNode> {
    let conditions = checks.iter().map(GateCheck::condition).collect();
    Ok(expr::conjunction(conditions)?)
}

/// Build the `pre_activation` job, or `None` when no check is enabled and the
/// user declared no `pre_activation` job of their own.
pub fn build_pre_activation(
    ir: &WorkflowIr,
    options: &CompilerOptions,
) -> FlowgateResult<Option<Job>> {
    let checks = enabled_checks(ir);
    let user = ir.jobs.get(names::PRE_ACTIVATION_JOB);

    if checks.is_empty() && user.is_none() {
        return Ok(None);
    }

    let mut permissions = Permissions::none().read(PermissionScope::Contents);
    let mut job = Job::new(names::PRE_ACTIVATION_JOB, options.runs_on.clone());

    if ir.reaction.is_some() {
        job.steps.push(reaction_step(ir).into());
        permissions = permissions.merge(&reaction_permissions(ir));
    }

    for check in &checks {
        job.steps.push(check_step(*check, ir, options)?.into());
    }

    if !checks.is_empty() {
        let activated = combined_condition(&checks)?;
        job.outputs
            .insert(names::ACTIVATED_OUTPUT.to_string(), activated.wrap());
    }

    if ir.command.is_some() {
        let (step, _) = names::CHECK_COMMAND_POSITION;
        job.outputs.insert(
            names::MATCHED_COMMAND_OUTPUT.to_string(),
            format!(
                "${{{{ {} }}}}",
                names::step_output(step, names::MATCHED_COMMAND_OUTPUT)
            ),
        );
    }

    if let Some(user) = user {
        merge_user_job(&mut job, &mut permissions, user);
    }

    job.permissions = permissions;
    debug!(checks = checks.len(), "built pre_activation job");
    Ok(Some(job))
}

/// Fold the user's `pre_activation` declaration into the gating job; user
/// outputs replace generated ones on key collision
fn merge_user_job(job: &mut Job, permissions: &mut Permissions, user: &CustomJob) {
    job.steps.extend(user.steps.iter().cloned().map(Step::User));
    job.outputs
        .extend(user.outputs.iter().map(|(k, v)| (k.clone(), v.clone())));
    job.env
        .extend(user.env.iter().map(|(k, v)| (k.clone(), v.clone())));
    if let Some(extra) = &user.permissions {
        *permissions = permissions.merge(extra);
    }
}

fn check_step(check: GateCheck, ir: &WorkflowIr, options: &CompilerOptions) -> FlowgateResult<GeneratedStep> {
    let (id, _) = check.wire_names();
    let step = match check {
        GateCheck::Membership => {
            let roles: Vec<&str> = ir.roles.roles().iter().map(|r| r.as_str()).collect();
            let mut step = script_step("Check team membership", id)
                .env(names::ENV_REQUIRED_ROLES, roles.join(","));
            if !ir.bots.is_empty() {
                step = step.env(names::ENV_ALLOWED_BOTS, ir.bots.join(","));
            }
            step
        }
        GateCheck::StopTime => {
            let raw = ir.stop_after.as_deref().unwrap_or_default();
            let stop_time = resolve_stop_time(raw, options.reference_time)?;
            script_step("Check stop time", id)
                .env(names::ENV_STOP_TIME, stop_time.format(STOP_TIME_FORMAT).to_string())
                .env(names::ENV_WORKFLOW_NAME, ir.name.as_str())
        }
        GateCheck::SkipIfMatch => {
            let cfg = ir.skip_if_match.as_ref();
            script_step("Check skip-if-match query", id)
                .env(names::ENV_SKIP_QUERY, cfg.map(|c| c.query.as_str()).unwrap_or_default())
                .env(names::ENV_SKIP_MAX_MATCHES, cfg.map_or(1, |c| c.max).to_string())
        }
        GateCheck::SkipIfNoMatch => {
            let cfg = ir.skip_if_no_match.as_ref();
            script_step("Check skip-if-no-match query", id)
                .env(names::ENV_SKIP_QUERY, cfg.map(|c| c.query.as_str()).unwrap_or_default())
                .env(names::ENV_SKIP_MIN_MATCHES, cfg.map_or(1, |c| c.min).to_string())
        }
        GateCheck::CommandPosition => {
            let token = ir.command.as_ref().map(|c| c.token()).unwrap_or_default();
            script_step("Check command position", id).env(names::ENV_COMMAND, token)
        }
    };
    Ok(step)
}

fn script_step(name: &str, id: &str) -> GeneratedStep {
    GeneratedStep::uses(name, names::GITHUB_SCRIPT_ACTION)
        .id(id)
        .input("script", names::script_call(id))
}

/// Step adding the configured reaction to the triggering item
pub fn reaction_step(ir: &WorkflowIr) -> GeneratedStep {
    let reaction = ir.reaction.map(|r| r.as_str()).unwrap_or("eyes");
    script_step("Add reaction", names::REACTION_STEP).env(names::ENV_REACTION, reaction)
}

/// Write scopes the reaction step needs
pub fn reaction_permissions(ir: &WorkflowIr) -> Permissions {
    let permissions = Permissions::none()
        .write(PermissionScope::Issues)
        .write(PermissionScope::PullRequests);
    if ir.has_trigger(TriggerEvent::Discussion) || ir.has_trigger(TriggerEvent::DiscussionComment) {
        permissions.write(PermissionScope::Discussions)
    } else {
        permissions
    }
}

fn relative_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\+(?:(\d{1,6})d)?(?:(\d{1,6})h)?(?:(\d{1,6})m)?$").expect("valid regex")
    })
}

/// Resolve a `stop-after` value to an absolute UTC instant.
///
/// Relative values (`+25h`, `+7d`, `+1d12h`, `+30m`) are added to
/// `reference`. Absolute values accept `YYYY-MM-DD HH:MM:SS`, RFC 3339 and a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn resolve_stop_time(value: &str, reference: DateTime<Utc>) -> FlowgateResult<DateTime<Utc>> {
    let trimmed = value.trim();
    let invalid = |reason: &str| FlowgateError::InvalidStopTime {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.starts_with('+') {
        let caps = relative_pattern()
            .captures(trimmed)
            .ok_or_else(|| invalid("expected '+<days>d<hours>h<minutes>m'"))?;

        let part = |i: usize| -> FlowgateResult<i64> {
            caps.get(i)
                .map(|m| m.as_str().parse::<i64>())
                .transpose()
                .map(|n| n.unwrap_or(0))
                .map_err(|_| invalid("number out of range"))
        };
        let offset = Duration::days(part(1)?) + Duration::hours(part(2)?) + Duration::minutes(part(3)?);

        if offset <= Duration::zero() {
            return Err(invalid("relative stop time must be in the future"));
        }
        return Ok(reference + offset);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, STOP_TIME_FORMAT) {
        return Ok(dt.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| invalid("date out of range"));
    }

    Err(invalid("unrecognized format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn options() -> CompilerOptions {
        CompilerOptions::default().with_reference_time(reference())
    }

    fn ir(yaml: &str) -> WorkflowIr {
        WorkflowIr::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_relative_stop_time() {
        let at = resolve_stop_time("+1d12h", reference()).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap());

        let at = resolve_stop_time("+30m", reference()).unwrap();
        assert_eq!(at.format(STOP_TIME_FORMAT).to_string(), "2026-03-01 12:30:00");
    }

    #[test]
    fn test_absolute_stop_time() {
        let expected = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(resolve_stop_time("2026-12-31 23:59:59", reference()).unwrap(), expected);
        assert_eq!(resolve_stop_time("2026-12-31T23:59:59Z", reference()).unwrap(), expected);
        assert_eq!(
            resolve_stop_time("2026-12-31", reference()).unwrap(),
            Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_invalid_stop_time() {
        for value in ["+", "+0h", "+5w", "next tuesday", "2026-13-01"] {
            assert!(
                matches!(
                    resolve_stop_time(value, reference()),
                    Err(FlowgateError::InvalidStopTime { .. })
                ),
                "{}",
                value
            );
        }
    }

    #[test]
    fn test_no_checks_no_job() {
        let ir = ir("name: x\nroles: all\non:\n  - event: issues\n");
        assert!(build_pre_activation(&ir, &options()).unwrap().is_none());
    }

    #[test]
    fn test_schedule_only_skips_membership() {
        let ir = ir("name: x\non:\n  - event: schedule\n");
        assert!(enabled_checks(&ir).is_empty());
    }

    #[test]
    fn test_single_check_has_no_and() {
        let ir = ir("name: x\nroles: all\nstop-after: '+2h'\n");
        let job = build_pre_activation(&ir, &options()).unwrap().unwrap();
        assert_eq!(
            job.outputs[names::ACTIVATED_OUTPUT],
            "${{ steps.check_stop_time.outputs.stop_time_ok == 'true' }}"
        );
        assert!(!job.outputs[names::ACTIVATED_OUTPUT].contains("&&"));
    }

    #[test]
    fn test_every_check_combination() {
        let all = [
            GateCheck::Membership,
            GateCheck::StopTime,
            GateCheck::SkipIfMatch,
            GateCheck::SkipIfNoMatch,
            GateCheck::CommandPosition,
        ];

        for mask in 1u32..(1 << all.len()) {
            let checks: Vec<GateCheck> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, c)| *c)
                .collect();

            let rendered = combined_condition(&checks).unwrap().render();
            let operands: Vec<String> = checks
                .iter()
                .map(|c| {
                    let (step, output) = c.wire_names();
                    format!("steps.{}.outputs.{} == 'true'", step, output)
                })
                .collect();

            if checks.len() == 1 {
                assert_eq!(rendered, operands[0]);
            } else {
                let expected: Vec<String> = operands.iter().map(|o| format!("({})", o)).collect();
                assert_eq!(rendered, expected.join(" && "));
            }
        }
    }

    #[test]
    fn test_empty_combination_is_error() {
        assert!(matches!(
            combined_condition(&[]),
            Err(FlowgateError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_command_and_stop_time() {
        let ir = ir(
            "name: x\nroles: all\nstop-after: '+25h'\ncommand:\n  name: fix\nreaction: eyes\n",
        );
        let job = build_pre_activation(&ir, &options()).unwrap().unwrap();

        insta::assert_snapshot!(
            job.outputs[names::ACTIVATED_OUTPUT],
            @"${{ (steps.check_stop_time.outputs.stop_time_ok == 'true') && (steps.check_command_position.outputs.command_position_ok == 'true') }}"
        );
        assert_eq!(
            job.outputs[names::MATCHED_COMMAND_OUTPUT],
            "${{ steps.check_command_position.outputs.matched_command }}"
        );

        let ids: Vec<_> = job.steps.iter().filter_map(|s| s.id()).collect();
        assert_eq!(ids, vec!["react", "check_stop_time", "check_command_position"]);
        assert_eq!(job.permissions.write_scopes().len(), 2);

        let Step::Generated(stop) = &job.steps[1] else {
            panic!("expected generated step");
        };
        assert_eq!(stop.env[names::ENV_STOP_TIME], "2026-03-02 13:00:00");
    }

    #[test]
    fn test_user_pre_activation_is_merged() {
        let ir = ir(
            r#"
name: x
stop-after: '2027-01-01'
roles: all
jobs:
  pre_activation:
    steps:
      - id: extra
        run: echo "ok=true" >> "$GITHUB_OUTPUT"
    outputs:
      extra_ok: ${{ steps.extra.outputs.ok }}
"#,
        );
        let job = build_pre_activation(&ir, &options()).unwrap().unwrap();
        assert_eq!(job.steps.last().and_then(|s| s.id()), Some("extra"));
        assert!(job.outputs.contains_key("extra_ok"));
        assert!(job.outputs.contains_key(names::ACTIVATED_OUTPUT));
    }

    #[test]
    fn test_user_outputs_win_on_collision() {
        let ir = ir(
            "name: x\nstop-after: '+1d'\ncommand:\n  name: fix\njobs:\n  pre_activation:\n    outputs:\n      activated: 'true'\n      matched_command: fix\n",
        );
        let job = build_pre_activation(&ir, &options()).unwrap().unwrap();
        assert_eq!(job.outputs[names::ACTIVATED_OUTPUT], "true");
        assert_eq!(job.outputs[names::MATCHED_COMMAND_OUTPUT], "fix");
    }

    #[test]
    fn test_user_job_without_checks_has_no_activated_output() {
        let ir = ir(
            "name: x\nroles: all\njobs:\n  pre_activation:\n    steps:\n      - run: echo hi\n",
        );
        let job = build_pre_activation(&ir, &options()).unwrap().unwrap();
        assert!(!job.outputs.contains_key(names::ACTIVATED_OUTPUT));
    }
}
