//! Process command implementation

use crate::config::CliConfig;
use crate::input::{expected_count_from_name, resolve_patterns};
use crate::oracle_http::HttpOracle;
use crate::output::{ChapterFormatter, JsonFormatter, TextFormatter};
use crate::progress::ProgressReporter;
use anyhow::{Context, Result};
use chapterize_core::{
    content_hash, CacheRecord, CacheStore, ChapterEngine, FsCacheStore, Input, NullOracle, Paced,
    ScoringOracle,
};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Arguments for the process command
#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Input files or patterns (supports glob)
    #[arg(short, long, value_name = "FILE/PATTERN", required = true)]
    pub input: Vec<String>,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Expected chapter count (default: trailing number in the file name)
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub expected_count: Option<usize>,

    /// Run without the HTTP oracle, structural discovery only
    #[arg(long)]
    pub offline: bool,

    /// Configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory for discovery results
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Supported output formats
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable chapter summary
    Text,
    /// JSON array with full chapter bodies
    Json,
}

impl ProcessArgs {
    /// Execute the process command
    pub fn execute(&self) -> Result<()> {
        let config = CliConfig::load_or_default(self.config.as_deref())?;
        let files = resolve_patterns(&self.input)?;
        let engine = ChapterEngine::with_config(config.engine_config());
        let cache = match &self.cache_dir {
            Some(dir) => Some(FsCacheStore::new(dir.clone())?),
            None => None,
        };

        let writer: Box<dyn std::io::Write> = match &self.output {
            Some(path) => Box::new(
                fs::File::create(path)
                    .with_context(|| format!("cannot create {}", path.display()))?,
            ),
            None => Box::new(std::io::stdout().lock()),
        };
        let mut formatter: Box<dyn ChapterFormatter> = match self.format {
            OutputFormat::Text => Box::new(TextFormatter::new(writer)),
            OutputFormat::Json => Box::new(JsonFormatter::new(writer)),
        };

        let mut progress = ProgressReporter::new(self.quiet);
        progress.init_files(files.len() as u64);

        // One bad file never aborts the batch
        let mut failures = 0usize;
        for file in &files {
            let name = file.display().to_string();
            match self.process_file(file, &engine, &config, cache.as_ref()) {
                Ok(record) => {
                    formatter.write_report(&name, &record)?;
                    progress.file_completed(&name);
                }
                Err(e) => {
                    warn!(file = %name, error = %format!("{e:#}"), "processing failed");
                    progress.file_failed(&name);
                    failures += 1;
                }
            }
        }
        progress.finish();
        formatter.finish()?;

        if failures == files.len() {
            anyhow::bail!("all {failures} input files failed");
        }
        if failures > 0 {
            warn!(failures, total = files.len(), "some files failed");
        }
        Ok(())
    }

    fn process_file(
        &self,
        path: &Path,
        engine: &ChapterEngine,
        config: &CliConfig,
        cache: Option<&FsCacheStore>,
    ) -> Result<CacheRecord> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let key = content_hash(&text);

        if let Some(store) = cache {
            if let Some(hit) = store.get(&key)? {
                info!(file = %path.display(), "cache hit");
                return Ok(hit);
            }
        }

        let expected = self.expected_count.or_else(|| expected_count_from_name(path));
        info!(
            file = %path.display(),
            expected = ?expected,
            offline = self.offline,
            "discovering chapters"
        );

        let mut oracle = self.build_oracle(config);
        let discovery = engine.discover(Input::from_text(text), expected, oracle.as_mut())?;
        let record = CacheRecord::from(&discovery);

        if let Some(store) = cache {
            store.put(&key, &record)?;
        }
        Ok(record)
    }

    fn build_oracle(&self, config: &CliConfig) -> Box<dyn ScoringOracle> {
        if self.offline || !config.oracle.enabled {
            return Box::new(NullOracle);
        }
        Box::new(Paced::new(
            HttpOracle::new(&config.oracle),
            Duration::from_millis(config.oracle.interval_ms),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(input: Vec<String>) -> ProcessArgs {
        ProcessArgs {
            input,
            output: None,
            format: OutputFormat::Text,
            expected_count: None,
            offline: true,
            config: None,
            cache_dir: None,
            quiet: true,
        }
    }

    fn write_novel(dir: &Path, name: &str, chapters: usize) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "소설 전체 제목").unwrap();
        writeln!(file).unwrap();
        for i in 1..=chapters {
            writeln!(file, "제 {i} 화").unwrap();
            for _ in 0..20 {
                writeln!(file, "본문이 길게 이어집니다. 오늘도 평화로운 하루였습니다.").unwrap();
            }
            writeln!(file).unwrap();
        }
        path
    }

    #[test]
    fn offline_process_writes_cache() {
        let dir = tempfile::tempdir().unwrap();
        let novel = write_novel(dir.path(), "소설 3.txt", 3);
        let cache_dir = dir.path().join("cache");

        let mut args = args(vec![novel.to_string_lossy().to_string()]);
        args.cache_dir = Some(cache_dir.clone());
        args.output = Some(dir.path().join("out.txt"));
        args.execute().unwrap();

        let cached: Vec<_> = fs::read_dir(&cache_dir).unwrap().collect();
        assert_eq!(cached.len(), 1);

        let out = fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert!(out.contains("3 chapters"));
    }

    #[test]
    fn file_name_supplies_expected_count() {
        let path = PathBuf::from("어떤 소설 1-250.txt");
        assert_eq!(expected_count_from_name(&path), Some(250));
    }
}
