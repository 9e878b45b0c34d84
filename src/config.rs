// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Compiler options
//!
//! Loaded from `flowgate.toml` in the project root when present. Every value
//! the compiler needs from its environment lives here and is passed in
//! explicitly, so a compilation depends only on its inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{FlowgateError, FlowgateResult};

/// Name of the options file looked up in the project root
pub const CONFIG_FILE: &str = "flowgate.toml";

/// Options for one compiler run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompilerOptions {
    /// Version written into the emitted header
    #[serde(default = "default_version")]
    pub version: String,

    /// Release builds write the version header; dev builds omit it so output
    /// does not churn between local builds
    #[serde(default)]
    pub release_build: bool,

    /// Force strict mode for every workflow
    #[serde(default)]
    pub strict: bool,

    /// Runner for generated jobs
    #[serde(default = "default_runs_on")]
    pub runs_on: String,

    /// Directory compiled workflows are written to
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Instant relative `stop-after` values are resolved against
    #[serde(default = "Utc::now")]
    pub reference_time: DateTime<Utc>,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_runs_on() -> String {
    "ubuntu-latest".to_string()
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            version: default_version(),
            release_build: false,
            strict: false,
            runs_on: default_runs_on(),
            output_dir: None,
            reference_time: Utc::now(),
        }
    }
}

impl CompilerOptions {
    /// Load options from a TOML file, falling back to defaults when the file
    /// does not exist
    pub fn load(path: &Path) -> FlowgateResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| FlowgateError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Load from a project directory (looks for `flowgate.toml`)
    pub fn load_from_project(project_root: &Path) -> FlowgateResult<Self> {
        Self::load(&project_root.join(CONFIG_FILE))
    }

    pub fn from_toml(content: &str) -> FlowgateResult<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = self.strict || strict;
        self
    }

    pub fn with_reference_time(mut self, at: DateTime<Utc>) -> Self {
        self.reference_time = at;
        self
    }

    /// Header line for emitted files, if this is a release build
    pub fn header(&self) -> Option<String> {
        self.release_build
            .then(|| format!("# Compiled by flowgate v{}. Do not edit.", self.version))
    }
}
