// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Job model and graph store
//!
//! Jobs are the nodes of a compiled workflow. The store keeps them in an
//! order that is always safe to emit.

mod job;
mod permissions;
mod store;

pub use job::{GeneratedStep, Job, Step};
pub use permissions::{PermissionLevel, PermissionScope, Permissions};
pub use store::JobGraphStore;
