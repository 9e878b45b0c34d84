// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Utilities for the flowgate CLI.

pub mod colors;
pub mod files;
pub mod progress;

pub use colors::*;
pub use files::resolve_globs;
pub use progress::create_progress_bar;
