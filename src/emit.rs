// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Output of compiled workflows
//!
//! A [`JobSink`] receives a compiled workflow and writes it somewhere. The
//! YAML sink produces the lock file CI runs.

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::io::Write;

use crate::compiler::CompiledWorkflow;
use crate::errors::FlowgateResult;
use crate::jobs::Permissions;

/// Destination for compiled workflows
pub trait JobSink {
    fn emit(&mut self, compiled: &CompiledWorkflow) -> FlowgateResult<()>;
}

#[derive(Serialize)]
struct Document<'a> {
    name: &'a str,
    on: &'a Mapping,
    permissions: Permissions,
    jobs: Mapping,
}

/// Writes the workflow as YAML, jobs in store order
pub struct YamlSink<W: Write> {
    writer: W,
    header: Option<String>,
}

impl<W: Write> YamlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, header: None }
    }

    /// Comment line written before the document
    pub fn with_header(mut self, header: Option<String>) -> Self {
        self.header = header;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> JobSink for YamlSink<W> {
    fn emit(&mut self, compiled: &CompiledWorkflow) -> FlowgateResult<()> {
        let mut jobs = Mapping::new();
        for job in compiled.store.jobs() {
            jobs.insert(Value::String(job.name.clone()), serde_yaml::to_value(job)?);
        }

        let document = Document {
            name: &compiled.name,
            on: &compiled.on,
            // Workflow level grants nothing; each job declares its own
            permissions: Permissions::none(),
            jobs,
        };

        if let Some(header) = &self.header {
            writeln!(self.writer, "{}", header)?;
        }
        self.writer
            .write_all(serde_yaml::to_string(&document)?.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Render a compiled workflow to a YAML string
pub fn to_yaml(compiled: &CompiledWorkflow, header: Option<String>) -> FlowgateResult<String> {
    let mut sink = YamlSink::new(Vec::new()).with_header(header);
    sink.emit(compiled)?;
    Ok(String::from_utf8_lossy(&sink.into_inner()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::config::CompilerOptions;
    use crate::workflow::WorkflowIr;

    fn compiled() -> CompiledWorkflow {
        let ir = WorkflowIr::from_yaml(
            "name: Nightly\nroles: all\non:\n  - event: workflow_dispatch\nsafe-outputs:\n  add-comment: {}\n",
        )
        .unwrap();
        Compiler::new(CompilerOptions::default()).compile(&ir).unwrap()
    }

    #[test]
    fn test_jobs_in_store_order() {
        let yaml = to_yaml(&compiled(), None).unwrap();
        let activation = yaml.find("\n  activation:").unwrap();
        let agent = yaml.find("\n  agent:").unwrap();
        let comment = yaml.find("\n  add_comment:").unwrap();
        let conclusion = yaml.find("\n  conclusion:").unwrap();
        assert!(activation < agent && agent < comment && comment < conclusion);
        assert!(yaml.starts_with("name: Nightly\n"));
        assert!(yaml.contains("\npermissions: {}\n"));
    }

    #[test]
    fn test_header_is_written_first() {
        let yaml = to_yaml(&compiled(), Some("# Compiled by flowgate v1.0.0. Do not edit.".into())).unwrap();
        assert!(yaml.starts_with("# Compiled by flowgate v1.0.0. Do not edit.\nname: Nightly"));
    }

    #[test]
    fn test_output_parses_back() {
        let yaml = to_yaml(&compiled(), None).unwrap();
        let value: Value = serde_yaml::from_str(&yaml).unwrap();
        let jobs = value.get("jobs").and_then(Value::as_mapping).unwrap();
        assert_eq!(jobs.len(), 4);
        assert_eq!(
            jobs.get("conclusion")
                .and_then(|j| j.get("needs"))
                .and_then(Value::as_sequence)
                .map(|s| s.len()),
            Some(3)
        );
    }
}
