//! File pattern resolution using glob

use crate::error::{CliError, CliResult};
use anyhow::Context;
use glob::glob;
use std::path::PathBuf;

/// Resolve file patterns to actual file paths
pub fn resolve_patterns(patterns: &[String]) -> CliResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let paths = glob(pattern).with_context(|| CliError::InvalidPattern(pattern.clone()))?;

        for path_result in paths {
            let path =
                path_result.with_context(|| format!("Error resolving pattern: {pattern}"))?;

            if path.is_file() {
                files.push(path);
            }
        }
    }

    if files.is_empty() {
        anyhow::bail!("No files found matching the provided patterns");
    }

    files.sort();
    files.dedup();

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn literal_paths_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("novel 12.txt");
        fs::write(&file, "본문").unwrap();

        let files = resolve_patterns(&[file.to_string_lossy().to_string()]).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn missing_files_are_an_error() {
        assert!(resolve_patterns(&["does-not-exist-anywhere.txt".to_string()]).is_err());
    }

    #[test]
    fn malformed_globs_report_the_pattern() {
        let err = resolve_patterns(&["[".to_string()]).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid file pattern: ["));
    }
}
