// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Typed workflow intermediate representation

mod definition;
mod safe_outputs;
mod sandbox;

pub use definition::*;
pub use safe_outputs::*;
pub use sandbox::{AgentSandbox, Mount, MountMode, RawSandbox, SandboxConfig};
