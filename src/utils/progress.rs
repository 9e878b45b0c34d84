// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Progress indicators for batch compilation

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar over `total` workflows.
///
/// Hidden when there is a single file, where a bar is only noise.
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    if total <= 1 {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len}") {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb.set_message(message.to_string());
    pb
}
