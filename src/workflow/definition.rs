// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Workflow IR definition
//!
//! The typed, already-validated representation of one workflow. It is
//! produced by the frontmatter stage and is read-only for the compiler. A
//! YAML form is supported so tooling and tests can construct it directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::errors::{FlowgateError, FlowgateResult};
use crate::jobs::Permissions;
use crate::workflow::{SafeOutputsConfig, SandboxConfig};

/// The workflow intermediate representation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkflowIr {
    /// Workflow name
    pub name: String,

    /// Workflow description
    #[serde(default)]
    pub description: Option<String>,

    /// Events that trigger the workflow
    #[serde(default)]
    pub on: Vec<Trigger>,

    /// Slash-command trigger
    #[serde(default)]
    pub command: Option<CommandTrigger>,

    /// Acknowledgement reaction added to the triggering item
    #[serde(default)]
    pub reaction: Option<Reaction>,

    /// Repository roles allowed to trigger the workflow
    #[serde(default)]
    pub roles: RoleRequirement,

    /// Bots allowed to trigger the workflow regardless of role
    #[serde(default)]
    pub bots: Vec<String>,

    /// Deadline after which the workflow stops running
    #[serde(default)]
    pub stop_after: Option<String>,

    /// Skip the run once the search query has at least `max` matches
    #[serde(default)]
    pub skip_if_match: Option<SkipIfMatch>,

    /// Skip the run unless the search query has at least `min` matches
    #[serde(default)]
    pub skip_if_no_match: Option<SkipIfNoMatch>,

    /// Top-level permissions, given to the agent job
    #[serde(default)]
    pub permissions: Permissions,

    /// Feature opt-ins
    #[serde(default)]
    pub features: Features,

    /// Strict mode turns policy warnings into errors
    #[serde(default)]
    pub strict: bool,

    /// Network access policy
    #[serde(default)]
    pub network: Option<NetworkPolicy>,

    /// Execution engine
    #[serde(default)]
    pub engine: EngineConfig,

    /// Agent sandbox
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Tool configuration that affects compilation
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Privileged output actions
    #[serde(default)]
    pub safe_outputs: SafeOutputsConfig,

    /// Tracking project (required for campaigns)
    #[serde(default)]
    pub project: Option<ProjectRef>,

    /// Git-backed working memory
    #[serde(default)]
    pub repo_memory: Option<OneOrMany<RepoMemoryEntry>>,

    /// Actions-cache-backed working memory
    #[serde(default)]
    pub cache_memory: Option<OneOrMany<CacheMemoryEntry>>,

    /// User-declared auxiliary jobs
    #[serde(default)]
    pub jobs: BTreeMap<String, CustomJob>,

    /// User steps run in the agent job before the engine
    #[serde(default)]
    pub steps: Vec<serde_yaml::Value>,

    /// Runner for the agent job
    #[serde(default)]
    pub runs_on: Option<String>,

    /// Agent job timeout
    #[serde(default)]
    pub timeout_minutes: Option<u32>,

    /// Extra condition for the whole workflow
    #[serde(default, rename = "if")]
    pub if_condition: Option<String>,

    /// Environment for the agent job
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Workflow-wide token override
    #[serde(default)]
    pub github_token: Option<String>,
}

impl WorkflowIr {
    /// Load a workflow IR from a YAML file
    pub fn from_file(path: &Path) -> FlowgateResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| FlowgateError::FileReadError {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;

        Self::from_yaml(&content)
    }

    /// Parse a workflow IR from a YAML string
    pub fn from_yaml(yaml: &str) -> FlowgateResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Whether any trigger matches `event`
    pub fn has_trigger(&self, event: TriggerEvent) -> bool {
        self.on.iter().any(|t| t.event == event)
    }

    /// Whether the workflow can be started by a person acting on the
    /// repository (as opposed to a schedule or another workflow)
    pub fn is_actor_triggered(&self) -> bool {
        self.command.is_some() || self.on.iter().any(|t| t.event.is_actor_initiated())
    }

    /// Whether strict mode applies, either from the workflow or the caller
    pub fn is_strict(&self, forced: bool) -> bool {
        self.strict || forced
    }

    /// Repo-memory entries as a slice-like iterator
    pub fn repo_memories(&self) -> impl Iterator<Item = &RepoMemoryEntry> {
        self.repo_memory.iter().flat_map(|m| m.iter())
    }

    /// Cache-memory entries as a slice-like iterator
    pub fn cache_memories(&self) -> impl Iterator<Item = &CacheMemoryEntry> {
        self.cache_memory.iter().flat_map(|m| m.iter())
    }
}

/// A workflow trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub event: TriggerEvent,

    /// Event configuration, passed through to the `on:` block verbatim
    #[serde(default)]
    pub config: serde_yaml::Value,
}

/// Supported trigger events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Issues,
    IssueComment,
    PullRequest,
    PullRequestReviewComment,
    Discussion,
    DiscussionComment,
    Push,
    Release,
    Schedule,
    WorkflowDispatch,
    WorkflowRun,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::IssueComment => "issue_comment",
            Self::PullRequest => "pull_request",
            Self::PullRequestReviewComment => "pull_request_review_comment",
            Self::Discussion => "discussion",
            Self::DiscussionComment => "discussion_comment",
            Self::Push => "push",
            Self::Release => "release",
            Self::Schedule => "schedule",
            Self::WorkflowDispatch => "workflow_dispatch",
            Self::WorkflowRun => "workflow_run",
        }
    }

    /// Events started by a person rather than a timer or another workflow
    pub fn is_actor_initiated(&self) -> bool {
        !matches!(self, Self::Schedule | Self::WorkflowRun)
    }
}

/// Slash-command trigger (`/name` at the start of a comment or body)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandTrigger {
    /// Command name without the leading slash
    pub name: String,

    /// Events the command is accepted on (defaults to all comment/body events)
    #[serde(default)]
    pub events: Vec<TriggerEvent>,
}

impl CommandTrigger {
    pub fn token(&self) -> String {
        format!("/{}", self.name.trim_start_matches('/'))
    }
}

/// Reactions the workflow can add to the triggering item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reaction {
    #[serde(rename = "+1")]
    ThumbsUp,
    #[serde(rename = "-1")]
    ThumbsDown,
    #[serde(rename = "laugh")]
    Laugh,
    #[serde(rename = "confused")]
    Confused,
    #[serde(rename = "heart")]
    Heart,
    #[serde(rename = "hooray")]
    Hooray,
    #[serde(rename = "rocket")]
    Rocket,
    #[serde(rename = "eyes")]
    Eyes,
}

impl Reaction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThumbsUp => "+1",
            Self::ThumbsDown => "-1",
            Self::Laugh => "laugh",
            Self::Confused => "confused",
            Self::Heart => "heart",
            Self::Hooray => "hooray",
            Self::Rocket => "rocket",
            Self::Eyes => "eyes",
        }
    }
}

/// Repository role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Maintainer,
    Write,
    Triage,
    Read,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Maintainer => "maintainer",
            Self::Write => "write",
            Self::Triage => "triage",
            Self::Read => "read",
        }
    }
}

/// Who may trigger the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoleRepr", into = "RoleRepr")]
pub enum RoleRequirement {
    /// Anyone; no membership check
    All,
    Roles(Vec<Role>),
}

impl Default for RoleRequirement {
    fn default() -> Self {
        Self::Roles(vec![Role::Admin, Role::Maintainer, Role::Write])
    }
}

impl RoleRequirement {
    /// Whether a membership check is needed
    pub fn is_restricted(&self) -> bool {
        !matches!(self, Self::All)
    }

    pub fn roles(&self) -> &[Role] {
        match self {
            Self::All => &[],
            Self::Roles(roles) => roles,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RoleRepr {
    Keyword(String),
    List(Vec<Role>),
}

impl TryFrom<RoleRepr> for RoleRequirement {
    type Error = String;

    fn try_from(repr: RoleRepr) -> Result<Self, Self::Error> {
        match repr {
            RoleRepr::Keyword(k) if k == "all" => Ok(Self::All),
            RoleRepr::Keyword(k) => Err(format!("unknown roles keyword '{}'", k)),
            RoleRepr::List(roles) if roles.is_empty() => {
                Err("roles must not be empty; use 'all' to disable the check".into())
            }
            RoleRepr::List(roles) => Ok(Self::Roles(roles)),
        }
    }
}

impl From<RoleRequirement> for RoleRepr {
    fn from(r: RoleRequirement) -> Self {
        match r {
            RoleRequirement::All => Self::Keyword("all".into()),
            RoleRequirement::Roles(roles) => Self::List(roles),
        }
    }
}

/// `skip-if-match` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipIfMatch {
    pub query: String,
    #[serde(default = "default_one")]
    pub max: u32,
}

/// `skip-if-no-match` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipIfNoMatch {
    pub query: String,
    #[serde(default = "default_one")]
    pub min: u32,
}

fn default_one() -> u32 {
    1
}

/// Feature opt-ins
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Features {
    /// Allow write scopes in top-level permissions
    #[serde(default)]
    pub dangerous_permissions_write: bool,
}

/// Network access policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NetworkRepr", into = "NetworkRepr")]
pub struct NetworkPolicy {
    /// Ecosystem identifiers and domains; `*` allows everything
    pub allowed: Vec<String>,
}

impl NetworkPolicy {
    pub fn is_wildcard(&self) -> bool {
        self.allowed.iter().any(|d| d == "*")
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NetworkRepr {
    Shorthand(String),
    Object { allowed: Vec<String> },
}

impl TryFrom<NetworkRepr> for NetworkPolicy {
    type Error = String;

    fn try_from(repr: NetworkRepr) -> Result<Self, Self::Error> {
        match repr {
            NetworkRepr::Shorthand(s) if s == "defaults" || s == "*" => {
                Ok(Self { allowed: vec![s] })
            }
            NetworkRepr::Shorthand(s) => Err(format!(
                "unknown network shorthand '{}', expected 'defaults' or '*'",
                s
            )),
            NetworkRepr::Object { allowed } => Ok(Self { allowed }),
        }
    }
}

impl From<NetworkPolicy> for NetworkRepr {
    fn from(p: NetworkPolicy) -> Self {
        Self::Object { allowed: p.allowed }
    }
}

/// Execution engine identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    #[default]
    Claude,
    Codex,
    Copilot,
    Custom,
}

impl EngineId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Copilot => "copilot",
            Self::Custom => "custom",
        }
    }

    /// Whether the engine runs behind the egress firewall
    pub fn supports_firewall(&self) -> bool {
        !matches!(self, Self::Custom)
    }

    /// Whether the engine reaches its model through a gateway, which makes
    /// the strict network allow-list check unnecessary
    pub fn supports_llm_gateway(&self) -> bool {
        matches!(self, Self::Codex)
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    #[serde(default)]
    pub id: EngineId,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub max_turns: Option<u32>,
}

/// Tool configuration that the compiler inspects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub github: Option<GitHubTool>,
}

/// GitHub tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubTool {
    /// `local` or `remote`
    #[serde(default = "default_github_mode")]
    pub mode: String,

    #[serde(default)]
    pub toolsets: Vec<String>,
}

fn default_github_mode() -> String {
    "local".to_string()
}

/// Reference to the tracking project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectRef {
    Url(String),
    Object {
        #[serde(default)]
        url: Option<String>,
    },
}

impl ProjectRef {
    /// The trimmed URL, or `None` when it is missing or blank
    pub fn url(&self) -> Option<&str> {
        let url = match self {
            Self::Url(u) => Some(u.as_str()),
            Self::Object { url } => url.as_deref(),
        };
        url.map(str::trim).filter(|u| !u.is_empty())
    }
}

/// One value or a list of values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::One(item) => std::slice::from_ref(item).iter(),
            Self::Many(items) => items.iter(),
        }
    }
}

/// Git-backed memory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepoMemoryEntry {
    #[serde(default = "default_memory_id")]
    pub id: String,

    /// Branch the memory is committed to (defaults to `memory/<id>`)
    #[serde(default)]
    pub branch: Option<String>,

    /// Campaign this memory tracks
    #[serde(default)]
    pub campaign_id: Option<String>,

    #[serde(default)]
    pub max_file_size: Option<u64>,
}

impl RepoMemoryEntry {
    pub fn branch(&self) -> String {
        self.branch
            .clone()
            .unwrap_or_else(|| format!("memory/{}", self.id))
    }
}

/// Cache-backed memory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheMemoryEntry {
    #[serde(default = "default_memory_id")]
    pub id: String,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub retention_days: Option<u32>,
}

fn default_memory_id() -> String {
    "default".to_string()
}

/// A user-declared job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CustomJob {
    /// Explicit dependencies; when absent the job depends on `activation`
    #[serde(default)]
    pub needs: Option<Vec<String>>,

    #[serde(default, rename = "if")]
    pub if_condition: Option<String>,

    #[serde(default)]
    pub runs_on: Option<String>,

    #[serde(default)]
    pub permissions: Option<Permissions>,

    #[serde(default)]
    pub timeout_minutes: Option<u32>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub steps: Vec<serde_yaml::Value>,

    #[serde(default)]
    pub outputs: BTreeMap<String, String>,

    /// Reusable workflow to call instead of running steps
    #[serde(default)]
    pub uses: Option<String>,

    #[serde(default)]
    pub with: BTreeMap<String, serde_yaml::Value>,

    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}
