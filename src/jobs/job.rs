// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Job and step definitions
//!
//! A [`Job`] is one node of the compiled graph. Field order of the serialized
//! form follows the order CI pipelines conventionally list job keys in.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::{FlowgateError, FlowgateResult};
use crate::expr::ConditionNode;
use crate::jobs::Permissions;

/// A step generated by the compiler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedStep {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_condition: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
}

impl GeneratedStep {
    /// A step that runs a shell script
    pub fn run(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            if_condition: None,
            uses: None,
            with: BTreeMap::new(),
            env: BTreeMap::new(),
            run: Some(script.into()),
        }
    }

    /// A step that invokes an action
    pub fn uses(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            if_condition: None,
            uses: Some(action.into()),
            with: BTreeMap::new(),
            env: BTreeMap::new(),
            run: None,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn when(mut self, condition: &ConditionNode) -> Self {
        self.if_condition = Some(condition.render());
        self
    }

    pub fn input(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with.insert(key.into(), value.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

/// A job step: either generated or declared by the user (opaque, already
/// schema-validated).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Step {
    Generated(GeneratedStep),
    User(serde_yaml::Value),
}

impl Step {
    /// The step id, when it has one
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Generated(step) => step.id.as_deref(),
            Self::User(value) => value.get("id").and_then(|v| v.as_str()),
        }
    }
}

impl From<GeneratedStep> for Step {
    fn from(step: GeneratedStep) -> Self {
        Self::Generated(step)
    }
}

/// One node of the job graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    /// Unique key of the job in the graph
    #[serde(skip)]
    pub name: String,

    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Jobs that must finish first, in declaration order without duplicates
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,

    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_condition: Option<String>,

    #[serde(rename = "runs-on", skip_serializing_if = "Option::is_none")]
    pub runs_on: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    pub permissions: Permissions,

    #[serde(rename = "timeout-minutes", skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u32>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,

    /// Reusable workflow called instead of running inline steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, serde_yaml::Value>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, String>,
}

impl Job {
    /// Create an inline job running on `runs_on`
    pub fn new(name: impl Into<String>, runs_on: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            needs: Vec::new(),
            if_condition: None,
            runs_on: Some(runs_on.into()),
            environment: None,
            permissions: Permissions::none(),
            timeout_minutes: None,
            env: BTreeMap::new(),
            outputs: BTreeMap::new(),
            steps: Vec::new(),
            uses: None,
            with: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }

    /// Create a job that calls a reusable workflow
    pub fn call(name: impl Into<String>, uses: impl Into<String>) -> Self {
        let mut job = Self::new(name, String::new());
        job.runs_on = None;
        job.uses = Some(uses.into());
        job
    }

    /// Add a dependency, ignoring duplicates
    pub fn add_need(&mut self, need: impl Into<String>) {
        let need = need.into();
        if !self.needs.contains(&need) {
            self.needs.push(need);
        }
    }

    pub fn needs<I, S>(mut self, needs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for need in needs {
            self.add_need(need);
        }
        self
    }

    pub fn when(mut self, condition: &ConditionNode) -> Self {
        self.if_condition = Some(condition.render());
        self
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn step(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Whether this job calls a reusable workflow
    pub fn is_call(&self) -> bool {
        self.uses.is_some()
    }

    /// Check the structural invariants of a single job
    pub fn validate(&self) -> FlowgateResult<()> {
        if self.name.trim().is_empty() {
            return Err(FlowgateError::contract("job name must not be empty"));
        }
        if self.is_call() && !self.steps.is_empty() {
            return Err(FlowgateError::UsesWithSteps {
                job: self.name.clone(),
            });
        }
        if self.needs.iter().any(|n| n == &self.name) {
            return Err(FlowgateError::CircularDependency {
                jobs: vec![self.name.clone(), self.name.clone()],
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr;

    #[test]
    fn test_needs_are_deduplicated() {
        let job = Job::new("conclusion", "ubuntu-latest").needs(["agent", "activation", "agent"]);
        assert_eq!(job.needs, vec!["agent", "activation"]);
    }

    #[test]
    fn test_call_job_with_steps_is_invalid() {
        let job = Job::call("deploy", "org/repo/.github/workflows/deploy.yml@main")
            .step(GeneratedStep::run("Echo", "echo hi"));
        assert!(matches!(job.validate(), Err(FlowgateError::UsesWithSteps { .. })));
    }

    #[test]
    fn test_self_dependency_is_invalid() {
        let job = Job::new("a", "ubuntu-latest").needs(["a"]);
        assert!(matches!(
            job.validate(),
            Err(FlowgateError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_serialized_shape() {
        let job = Job::new("activation", "ubuntu-latest")
            .needs(["pre_activation"])
            .when(&expr::equals("needs.pre_activation.outputs.activated", "true"))
            .step(GeneratedStep::run("Check", "echo ok").id("check"));

        let yaml = serde_yaml::to_string(&job).unwrap();
        assert!(yaml.contains("needs:\n- pre_activation"));
        assert!(yaml.contains("needs.pre_activation.outputs.activated == 'true'"));
        assert!(yaml.contains("runs-on: ubuntu-latest"));
        assert!(yaml.contains("permissions: {}"));
        assert!(!yaml.contains("uses:"));
    }

    #[test]
    fn test_user_step_id() {
        let value: serde_yaml::Value = serde_yaml::from_str("id: mine\nrun: echo").unwrap();
        assert_eq!(Step::User(value).id(), Some("mine"));
        assert_eq!(Step::from(GeneratedStep::run("x", "y")).id(), None);
    }
}
