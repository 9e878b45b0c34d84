// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! GITHUB_TOKEN permission sets

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A permission scope of the workflow token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionScope {
    Actions,
    Attestations,
    Checks,
    Contents,
    Deployments,
    Discussions,
    IdToken,
    Issues,
    Metadata,
    Models,
    Packages,
    Pages,
    PullRequests,
    RepositoryProjects,
    SecurityEvents,
    Statuses,
}

impl PermissionScope {
    pub const ALL: [PermissionScope; 16] = [
        Self::Actions,
        Self::Attestations,
        Self::Checks,
        Self::Contents,
        Self::Deployments,
        Self::Discussions,
        Self::IdToken,
        Self::Issues,
        Self::Metadata,
        Self::Models,
        Self::Packages,
        Self::Pages,
        Self::PullRequests,
        Self::RepositoryProjects,
        Self::SecurityEvents,
        Self::Statuses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Actions => "actions",
            Self::Attestations => "attestations",
            Self::Checks => "checks",
            Self::Contents => "contents",
            Self::Deployments => "deployments",
            Self::Discussions => "discussions",
            Self::IdToken => "id-token",
            Self::Issues => "issues",
            Self::Metadata => "metadata",
            Self::Models => "models",
            Self::Packages => "packages",
            Self::Pages => "pages",
            Self::PullRequests => "pull-requests",
            Self::RepositoryProjects => "repository-projects",
            Self::SecurityEvents => "security-events",
            Self::Statuses => "statuses",
        }
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    None,
    Read,
    Write,
}

/// A permission block.
///
/// An empty scoped set renders as `{}`, which grants nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PermissionsRepr", into = "PermissionsRepr")]
pub enum Permissions {
    Scoped(BTreeMap<PermissionScope, PermissionLevel>),
    ReadAll,
    WriteAll,
}

impl Default for Permissions {
    fn default() -> Self {
        Self::none()
    }
}

impl Permissions {
    /// No permissions at all
    pub fn none() -> Self {
        Self::Scoped(BTreeMap::new())
    }

    /// Builder-style scope assignment. Assigning to a shorthand set first
    /// expands it.
    pub fn with(mut self, scope: PermissionScope, level: PermissionLevel) -> Self {
        self.set(scope, level);
        self
    }

    pub fn set(&mut self, scope: PermissionScope, level: PermissionLevel) {
        if let Self::Scoped(map) = self {
            map.insert(scope, level);
            return;
        }
        let mut expanded = self.expanded();
        expanded.insert(scope, level);
        *self = Self::Scoped(expanded);
    }

    pub fn read(self, scope: PermissionScope) -> Self {
        self.with(scope, PermissionLevel::Read)
    }

    pub fn write(self, scope: PermissionScope) -> Self {
        self.with(scope, PermissionLevel::Write)
    }

    /// Effective level for a scope
    pub fn level(&self, scope: PermissionScope) -> PermissionLevel {
        match self {
            Self::Scoped(map) => map.get(&scope).copied().unwrap_or(PermissionLevel::None),
            Self::ReadAll => PermissionLevel::Read,
            Self::WriteAll => PermissionLevel::Write,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Scoped(map) if map.is_empty())
    }

    /// Scopes granted write access
    pub fn write_scopes(&self) -> Vec<PermissionScope> {
        PermissionScope::ALL
            .iter()
            .copied()
            .filter(|s| self.level(*s) == PermissionLevel::Write)
            .collect()
    }

    /// Union of two permission sets, keeping the higher level per scope
    pub fn merge(&self, other: &Permissions) -> Permissions {
        let mut merged = self.expanded();
        for (scope, level) in other.expanded() {
            let entry = merged.entry(scope).or_insert(PermissionLevel::None);
            if level > *entry {
                *entry = level;
            }
        }
        Self::Scoped(merged)
    }

    fn expanded(&self) -> BTreeMap<PermissionScope, PermissionLevel> {
        match self {
            Self::Scoped(map) => map.clone(),
            Self::ReadAll | Self::WriteAll => PermissionScope::ALL
                .iter()
                .map(|s| (*s, self.level(*s)))
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PermissionsRepr {
    Shorthand(String),
    Map(BTreeMap<PermissionScope, PermissionLevel>),
}

impl TryFrom<PermissionsRepr> for Permissions {
    type Error = String;

    fn try_from(repr: PermissionsRepr) -> Result<Self, Self::Error> {
        match repr {
            PermissionsRepr::Map(map) => Ok(Self::Scoped(map)),
            PermissionsRepr::Shorthand(s) => match s.as_str() {
                "read-all" => Ok(Self::ReadAll),
                "write-all" => Ok(Self::WriteAll),
                other => Err(format!(
                    "unknown permissions shorthand '{}', expected 'read-all' or 'write-all'",
                    other
                )),
            },
        }
    }
}

impl From<Permissions> for PermissionsRepr {
    fn from(p: Permissions) -> Self {
        match p {
            Permissions::Scoped(map) => Self::Map(map),
            Permissions::ReadAll => Self::Shorthand("read-all".into()),
            Permissions::WriteAll => Self::Shorthand("write-all".into()),
        }
    }
}
