// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Job graph store
//!
//! Owns every job of one compilation. Insertion order is always a valid
//! topological order: a job is rejected unless everything it `needs` has
//! already been added, so the graph cannot contain a cycle.

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::errors::{FlowgateError, FlowgateResult};
use crate::jobs::Job;

/// Ordered registry of jobs keyed by unique name
#[derive(Debug, Clone, Default)]
pub struct JobGraphStore {
    jobs: Vec<Job>,
    index: HashMap<String, usize>,
}

impl JobGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job.
    ///
    /// Fails if the name is taken (the existing job is left untouched), if
    /// the job breaks its own invariants, or if it needs a job that has not
    /// been added yet.
    pub fn add_job(&mut self, job: Job) -> FlowgateResult<()> {
        job.validate()?;

        if self.index.contains_key(&job.name) {
            return Err(FlowgateError::DuplicateJob { job: job.name });
        }

        for dep in &job.needs {
            if !self.index.contains_key(dep) {
                return Err(FlowgateError::UnknownDependency {
                    job: job.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        debug!(job = %job.name, needs = ?job.needs, "adding job");
        self.index.insert(job.name.clone(), self.jobs.len());
        self.jobs.push(job);
        Ok(())
    }

    /// Look up a job by name
    pub fn get_job(&self, name: &str) -> Option<&Job> {
        self.index.get(name).map(|&i| &self.jobs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Jobs in insertion order
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Job names in insertion order
    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().map(|j| j.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Append dependencies to an existing job.
    ///
    /// Dependencies already present are skipped, so repeating the call is
    /// harmless. Each dependency must have been inserted before `name` to
    /// keep insertion order topological. Returns how many were appended.
    pub fn append_needs(&mut self, name: &str, deps: &[String]) -> FlowgateResult<usize> {
        let target = *self.index.get(name).ok_or_else(|| FlowgateError::JobNotFound {
            job: name.to_string(),
        })?;

        for dep in deps {
            match self.index.get(dep) {
                None => {
                    return Err(FlowgateError::UnknownDependency {
                        job: name.to_string(),
                        dependency: dep.clone(),
                    })
                }
                Some(&i) if i >= target => {
                    return Err(FlowgateError::CircularDependency {
                        jobs: vec![name.to_string(), dep.clone()],
                    })
                }
                Some(_) => {}
            }
        }

        let job = &mut self.jobs[target];
        let before = job.needs.len();
        for dep in deps {
            job.add_need(dep.clone());
        }
        let appended = job.needs.len() - before;
        debug!(job = name, appended, "appended needs");
        Ok(appended)
    }

    /// Append outputs to an existing job.
    ///
    /// Outputs are append-only: re-adding an identical key/value is a no-op,
    /// while changing the value of an existing key is rejected.
    pub fn append_outputs(
        &mut self,
        name: &str,
        outputs: &BTreeMap<String, String>,
    ) -> FlowgateResult<usize> {
        let target = *self.index.get(name).ok_or_else(|| FlowgateError::JobNotFound {
            job: name.to_string(),
        })?;
        let job = &mut self.jobs[target];

        for (key, value) in outputs {
            if let Some(existing) = job.outputs.get(key) {
                if existing != value {
                    return Err(FlowgateError::contract(format!(
                        "output '{}' of job '{}' is already set",
                        key, name
                    )));
                }
            }
        }

        let before = job.outputs.len();
        job.outputs
            .extend(outputs.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(job.outputs.len() - before)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Graph views
    // ─────────────────────────────────────────────────────────────────────────

    fn graph(&self) -> (DiGraph<usize, ()>, Vec<NodeIndex>) {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.jobs.len()).map(|i| graph.add_node(i)).collect();

        for (i, job) in self.jobs.iter().enumerate() {
            for dep in &job.needs {
                if let Some(&d) = self.index.get(dep) {
                    graph.add_edge(nodes[d], nodes[i], ());
                }
            }
        }

        (graph, nodes)
    }

    /// Topologically sorted job names; among jobs that are ready at the same
    /// time, the one added first comes first
    pub fn topological_order(&self) -> FlowgateResult<Vec<String>> {
        let (graph, nodes) = self.graph();
        let mut remaining: Vec<usize> = nodes
            .iter()
            .map(|&n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        let mut ready: BTreeSet<usize> = (0..self.jobs.len()).filter(|&i| remaining[i] == 0).collect();
        let mut order = Vec::with_capacity(self.jobs.len());

        while let Some(i) = ready.pop_first() {
            order.push(self.jobs[i].name.clone());
            for next in graph.neighbors_directed(nodes[i], Direction::Outgoing) {
                let j = graph[next];
                remaining[j] -= 1;
                if remaining[j] == 0 {
                    ready.insert(j);
                }
            }
        }

        if order.len() != self.jobs.len() {
            let mut stuck: Vec<String> = (0..self.jobs.len())
                .filter(|&i| remaining[i] > 0)
                .map(|i| self.jobs[i].name.clone())
                .collect();
            stuck.sort();
            return Err(FlowgateError::CircularDependency { jobs: stuck });
        }
        Ok(order)
    }

    /// Direct dependencies of a job
    pub fn dependencies(&self, name: &str) -> Option<Vec<String>> {
        self.get_job(name).map(|j| j.needs.clone())
    }

    /// Jobs that directly depend on `name`, in insertion order
    pub fn dependents(&self, name: &str) -> Option<Vec<String>> {
        if !self.contains(name) {
            return None;
        }
        Some(
            self.jobs
                .iter()
                .filter(|j| j.needs.iter().any(|n| n == name))
                .map(|j| j.name.clone())
                .collect(),
        )
    }

    /// Check if job A depends (directly or transitively) on job B
    pub fn depends_on(&self, job_a: &str, job_b: &str) -> bool {
        let (Some(&a), Some(&b)) = (self.index.get(job_a), self.index.get(job_b)) else {
            return false;
        };
        if a == b {
            return false;
        }
        let (graph, nodes) = self.graph();
        has_path_connecting(&graph, nodes[b], nodes[a], None)
    }

    /// Generate a Mermaid diagram of the graph
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for job in &self.jobs {
            out.push_str(&format!("    {}[{}]\n", job.name, job.name));
        }

        for job in &self.jobs {
            for dep in &job.needs {
                out.push_str(&format!("    {} --> {}\n", dep, job.name));
            }
        }

        out
    }

    /// Generate a DOT diagram of the graph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph workflow {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for job in &self.jobs {
            for dep in &job.needs {
                out.push_str(&format!("    \"{}\" -> \"{}\";\n", dep, job.name));
            }
        }

        // Isolated nodes
        for job in &self.jobs {
            let has_edges = !job.needs.is_empty()
                || self.jobs.iter().any(|j| j.needs.contains(&job.name));
            if !has_edges {
                out.push_str(&format!("    \"{}\";\n", job.name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Text listing of jobs in execution order with their gates
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for (i, job) in self.jobs.iter().enumerate() {
            out.push_str(&format!("{}. {}", i + 1, job.name));

            if !job.needs.is_empty() {
                out.push_str(&format!(" [needs: {}]", job.needs.join(", ")));
            }
            if let Some(ref cond) = job.if_condition {
                out.push_str(&format!("\n     if: {}", cond));
            }

            out.push('\n');
        }

        out
    }

    /// BLAKE3 fingerprint of the whole graph.
    ///
    /// Two stores with the same jobs in the same order have the same
    /// fingerprint.
    pub fn fingerprint(&self) -> FlowgateResult<String> {
        let mut hasher = blake3::Hasher::new();
        for job in &self.jobs {
            hasher.update(job.name.as_bytes());
            hasher.update(&[0]);
            hasher.update(serde_yaml::to_string(job)?.as_bytes());
            hasher.update(&[0]);
        }
        Ok(hasher.finalize().to_hex().to_string())
    }
}
