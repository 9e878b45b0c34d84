// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 flowgate contributors

//! Input file discovery

use std::path::{Path, PathBuf};

use crate::errors::{FlowgateError, FlowgateResult};

/// Resolve glob patterns relative to `base_dir`.
///
/// Each pattern must match at least one file. The result is sorted and
/// free of duplicates.
pub fn resolve_globs(patterns: &[String], base_dir: &Path) -> FlowgateResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let full_pattern = if Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            base_dir.join(pattern).to_string_lossy().to_string()
        };

        let matches: Vec<_> = glob::glob(&full_pattern)?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();

        if matches.is_empty() {
            return Err(FlowgateError::NoInputFiles {
                pattern: pattern.clone(),
            });
        }

        files.extend(matches);
    }

    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_globs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.workflow.yaml"), "name: b").unwrap();
        std::fs::write(dir.path().join("a.workflow.yaml"), "name: a").unwrap();
        std::fs::write(dir.path().join("notes.md"), "").unwrap();

        let files = resolve_globs(
            &["*.workflow.yaml".to_string(), "a.workflow.yaml".to_string()],
            dir.path(),
        )
        .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.workflow.yaml", "b.workflow.yaml"]);
    }

    #[test]
    fn test_unmatched_pattern() {
        let dir = TempDir::new().unwrap();
        let result = resolve_globs(&["*.workflow.yaml".to_string()], dir.path());
        assert!(matches!(result, Err(FlowgateError::NoInputFiles { .. })));
    }
}
