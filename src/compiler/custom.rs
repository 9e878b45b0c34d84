// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! User-declared jobs
//!
//! Custom jobs may depend on compiler jobs and on each other. They are
//! inserted in dependency order so the store accepts each one; ties are
//! broken by name to keep the output stable.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::compiler::names;
use crate::config::CompilerOptions;
use crate::errors::{FlowgateError, FlowgateResult};
use crate::expr;
use crate::jobs::{Job, JobGraphStore, PermissionScope, Permissions, Step};
use crate::workflow::{CustomJob, WorkflowIr};

/// Custom jobs other than the gating-job merge, in the order they must be
/// inserted
pub fn ordered_custom_jobs<'a>(
    ir: &'a WorkflowIr,
    store: &JobGraphStore,
) -> FlowgateResult<Vec<(&'a str, &'a CustomJob)>> {
    let jobs: BTreeMap<&str, &CustomJob> = ir
        .jobs
        .iter()
        .filter(|(name, _)| name.as_str() != names::PRE_ACTIVATION_JOB)
        .map(|(name, job)| (name.as_str(), job))
        .collect();

    let mut graph = DiGraph::<&str, ()>::new();
    let nodes: HashMap<&str, NodeIndex> = jobs.keys().map(|&name| (name, graph.add_node(name))).collect();

    for (&name, &job) in &jobs {
        for dep in needs_of(job) {
            if let Some(&from) = nodes.get(dep.as_str()) {
                graph.add_edge(from, nodes[name], ());
            } else if !store.contains(&dep) {
                return Err(FlowgateError::UnknownDependency {
                    job: name.to_string(),
                    dependency: dep,
                });
            }
        }
    }

    if let Some(cycle) = tarjan_scc(&graph)
        .into_iter()
        .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
    {
        let mut members: Vec<String> = cycle.iter().map(|&n| graph[n].to_string()).collect();
        members.sort();
        return Err(FlowgateError::CircularDependency { jobs: members });
    }

    // Kahn's algorithm; the ready set is ordered by name
    let mut remaining: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|n| (n, graph.neighbors_directed(n, petgraph::Direction::Incoming).count()))
        .collect();
    let mut ready: BTreeSet<&str> = remaining
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(&n, _)| graph[n])
        .collect();
    let mut order = Vec::with_capacity(jobs.len());

    while let Some(name) = ready.pop_first() {
        order.push((name, jobs[name]));
        for next in graph.neighbors_directed(nodes[name], petgraph::Direction::Outgoing) {
            if let Some(count) = remaining.get_mut(&next) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(graph[next]);
                }
            }
        }
    }

    debug!(order = ?order.iter().map(|(n, _)| *n).collect::<Vec<_>>(), "custom job order");
    Ok(order)
}

fn needs_of(job: &CustomJob) -> Vec<String> {
    job.needs
        .clone()
        .unwrap_or_else(|| vec![names::ACTIVATION_JOB.to_string()])
}

/// Translate a declaration into a graph job
pub fn build_custom_job(name: &str, decl: &CustomJob, options: &CompilerOptions) -> FlowgateResult<Job> {
    let mut job = match &decl.uses {
        Some(uses) => {
            let mut job = Job::call(name, uses.as_str());
            job.with = decl.with.clone();
            job.secrets = decl.secrets.clone();
            job
        }
        None => {
            let runs_on = decl.runs_on.clone().unwrap_or_else(|| options.runs_on.clone());
            let mut job = Job::new(name, runs_on);
            job.steps = decl.steps.iter().cloned().map(Step::User).collect();
            job.timeout_minutes = decl.timeout_minutes;
            job.env = decl.env.clone();
            job
        }
    };

    job = job.needs(needs_of(decl)).permissions(
        decl.permissions
            .clone()
            .unwrap_or_else(|| Permissions::none().read(PermissionScope::Contents)),
    );
    if let Some(condition) = decl.if_condition.as_deref().filter(|c| !expr::strip_markers(c).is_empty()) {
        job = job.when(&expr::expression(condition));
    }
    job.outputs = decl.outputs.clone();

    job.validate()?;
    Ok(job)
}
