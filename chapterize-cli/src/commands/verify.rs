//! Verify command implementation

use anyhow::{Context, Result};
use chapterize_core::pattern::TitlePattern;
use chapterize_core::{EngineConfig, Splitter};
use clap::Args;
use std::fs;
use std::path::PathBuf;

/// Arguments for the verify command
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Title pattern to verify
    #[arg(short, long, value_name = "REGEX")]
    pub pattern: String,

    /// File to verify against
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Keep matches on lines ending with terminal keywords (끝, 완, END, ...)
    #[arg(long)]
    pub keep_end_markers: bool,
}

impl VerifyArgs {
    /// Execute the verify command
    pub fn execute(&self) -> Result<()> {
        let text = fs::read_to_string(&self.file)
            .with_context(|| format!("cannot read {}", self.file.display()))?;

        let excluded = if self.keep_end_markers {
            Vec::new()
        } else {
            EngineConfig::default().end_keywords
        };
        let pattern = TitlePattern::compile(&self.pattern, &excluded)
            .with_context(|| format!("cannot compile pattern {:?}", self.pattern))?;

        let stats = Splitter::new().verify(&text, &pattern);
        println!("pattern:        {}", self.pattern);
        println!("matches:        {}", stats.match_count);
        println!("last match at:  {} ({:.1}%)", stats.last_match_pos, stats.last_match_ratio * 100.0);
        println!("unmatched tail: {} bytes", stats.tail_size);
        println!("coverage:       {}", if stats.coverage_ok { "ok" } else { "insufficient" });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn verify_runs_on_a_real_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "제 1 화\n본문\n제 2 화\n본문\n").unwrap();

        let args = VerifyArgs {
            pattern: r"제\s*\d+\s*화".to_string(),
            file: file.path().to_path_buf(),
            keep_end_markers: false,
        };
        args.execute().unwrap();
    }

    #[test]
    fn bad_pattern_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "본문").unwrap();

        let args = VerifyArgs {
            pattern: "(unclosed".to_string(),
            file: file.path().to_path_buf(),
            keep_end_markers: false,
        };
        assert!(args.execute().is_err());
    }
}
