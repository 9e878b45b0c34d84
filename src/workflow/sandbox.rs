// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Agent sandbox configuration
//!
//! Two input shapes are accepted: the legacy flat form (`sandbox: awf`,
//! `sandbox: false`) and the nested form (`sandbox: { agent: { id: srt },
//! mounts: [...] }`). Both are normalized once, during deserialization, into
//! a single [`SandboxConfig`]. When a nested `agent` and a legacy `type` are
//! both present, the nested `agent` wins.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::errors::{FlowgateError, FlowgateResult};

/// Sandbox the agent runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentSandbox {
    /// Egress firewall container
    #[default]
    Awf,
    /// Sandbox runtime
    Srt,
    Disabled,
}

impl AgentSandbox {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Awf => "awf",
            Self::Srt => "srt",
            Self::Disabled => "disabled",
        }
    }

    fn parse(id: &str) -> FlowgateResult<Self> {
        match id.trim() {
            "awf" | "default" => Ok(Self::Awf),
            "srt" => Ok(Self::Srt),
            "disabled" | "none" => Ok(Self::Disabled),
            other => Err(FlowgateError::contract(format!(
                "unknown sandbox agent '{}', expected 'awf', 'srt' or false",
                other
            ))),
        }
    }
}

/// Access mode of a mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MountMode {
    #[default]
    ReadOnly,
    ReadWrite,
}

/// A host path made visible inside the sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: String,
    pub target: String,
    pub mode: MountMode,
}

impl Mount {
    /// Parse `source:target[:ro|rw]`
    pub fn parse(spec: &str) -> FlowgateResult<Self> {
        let invalid = |reason: &str| FlowgateError::InvalidMount {
            mount: spec.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = spec.split(':').collect();
        let (source, target, mode) = match parts.as_slice() {
            [source, target] => (*source, *target, MountMode::default()),
            [source, target, "ro"] => (*source, *target, MountMode::ReadOnly),
            [source, target, "rw"] => (*source, *target, MountMode::ReadWrite),
            [_, _, other] => {
                return Err(invalid(&format!("unknown mode '{}', expected 'ro' or 'rw'", other)))
            }
            _ => return Err(invalid("expected 'source:target' or 'source:target:mode'")),
        };

        if source.is_empty() {
            return Err(invalid("source path is empty"));
        }
        if !target.starts_with('/') {
            return Err(invalid("target path must be absolute"));
        }

        Ok(Self {
            source: source.to_string(),
            target: target.to_string(),
            mode,
        })
    }
}

impl fmt::Display for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            MountMode::ReadOnly => "ro",
            MountMode::ReadWrite => "rw",
        };
        write!(f, "{}:{}:{}", self.source, self.target, mode)
    }
}

impl Serialize for Mount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Canonical sandbox configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSandbox")]
pub struct SandboxConfig {
    pub agent: AgentSandbox,
    pub mounts: Vec<Mount>,
}

impl SandboxConfig {
    /// Convert any accepted input shape into the canonical form
    pub fn normalize(raw: RawSandbox) -> FlowgateResult<Self> {
        match raw {
            RawSandbox::Flag(true) => Ok(Self::default()),
            RawSandbox::Flag(false) => Ok(Self {
                agent: AgentSandbox::Disabled,
                mounts: Vec::new(),
            }),
            RawSandbox::Legacy(id) => Ok(Self {
                agent: AgentSandbox::parse(&id)?,
                mounts: Vec::new(),
            }),
            RawSandbox::Object(obj) => {
                let agent = match (obj.agent, obj.legacy_type) {
                    (Some(agent), _) => agent.resolve()?,
                    (None, Some(id)) => AgentSandbox::parse(&id)?,
                    (None, None) => AgentSandbox::default(),
                };
                let mounts = obj
                    .mounts
                    .iter()
                    .map(|m| Mount::parse(m))
                    .collect::<FlowgateResult<Vec<_>>>()?;

                Ok(Self { agent, mounts })
            }
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.agent == AgentSandbox::Disabled
    }
}

impl TryFrom<RawSandbox> for SandboxConfig {
    type Error = FlowgateError;

    fn try_from(raw: RawSandbox) -> Result<Self, Self::Error> {
        Self::normalize(raw)
    }
}

/// Sandbox configuration as written by the user
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawSandbox {
    Flag(bool),
    Legacy(String),
    Object(RawSandboxObject),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSandboxObject {
    #[serde(default)]
    agent: Option<RawAgent>,

    /// Legacy field, superseded by `agent`
    #[serde(default, rename = "type")]
    legacy_type: Option<String>,

    #[serde(default)]
    mounts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawAgent {
    Flag(bool),
    Id(String),
    Object { id: String },
}

impl RawAgent {
    fn resolve(self) -> FlowgateResult<AgentSandbox> {
        match self {
            Self::Flag(true) => Ok(AgentSandbox::default()),
            Self::Flag(false) => Ok(AgentSandbox::Disabled),
            Self::Id(id) | Self::Object { id } => AgentSandbox::parse(&id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<SandboxConfig, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    #[test]
    fn test_legacy_flat_forms() {
        assert_eq!(parse("awf").unwrap().agent, AgentSandbox::Awf);
        assert_eq!(parse("srt").unwrap().agent, AgentSandbox::Srt);
        assert!(parse("false").unwrap().is_disabled());
        assert_eq!(parse("true").unwrap(), SandboxConfig::default());
    }

    #[test]
    fn test_nested_forms() {
        assert_eq!(parse("agent: srt").unwrap().agent, AgentSandbox::Srt);
        assert_eq!(parse("agent:\n  id: srt").unwrap().agent, AgentSandbox::Srt);
        assert!(parse("agent: false").unwrap().is_disabled());
    }

    #[test]
    fn test_nested_agent_wins_over_legacy_type() {
        let cfg = parse("type: srt\nagent: false\n").unwrap();
        assert!(cfg.is_disabled());

        let cfg = parse("type: srt\n").unwrap();
        assert_eq!(cfg.agent, AgentSandbox::Srt);
    }

    #[test]
    fn test_mounts_are_validated() {
        let cfg = parse("mounts:\n  - /data:/mnt/data\n  - /cache:/mnt/cache:rw\n").unwrap();
        assert_eq!(cfg.mounts.len(), 2);
        assert_eq!(cfg.mounts[0].mode, MountMode::ReadOnly);
        assert_eq!(cfg.mounts[1].to_string(), "/cache:/mnt/cache:rw");

        let err = parse("mounts: ['/data:relative']").unwrap_err();
        assert!(err.to_string().contains("must be absolute"));
    }

    #[test]
    fn test_mount_parse_errors() {
        assert!(matches!(
            Mount::parse("/only-one"),
            Err(FlowgateError::InvalidMount { .. })
        ));
        assert!(matches!(
            Mount::parse("/a:/b:rx"),
            Err(FlowgateError::InvalidMount { .. })
        ));
        assert!(matches!(
            Mount::parse(":/b"),
            Err(FlowgateError::InvalidMount { .. })
        ));
    }

    #[test]
    fn test_canonical_form_round_trips() {
        let cfg = parse("agent: srt\nmounts: ['/a:/b:rw']\n").unwrap();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        assert_eq!(parse(&yaml).unwrap(), cfg);
    }
}
