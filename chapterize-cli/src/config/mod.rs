//! Configuration module

use crate::error::CliError;
use anyhow::{Context, Result};
use chapterize_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CLI configuration structure
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct CliConfig {
    /// Oracle endpoint configuration
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Sampling configuration
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Escalation configuration
    #[serde(default)]
    pub escalation: EscalationConfig,
}

/// Oracle-related configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct OracleConfig {
    /// Whether the HTTP oracle is used at all
    pub enabled: bool,

    /// Generation endpoint (Ollama-style API)
    pub endpoint: String,

    /// Model name passed to the endpoint
    pub model: String,

    /// Minimum milliseconds between consecutive oracle calls
    pub interval_ms: u64,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:11434/api/generate".to_string(),
            model: "qwen2.5:14b".to_string(),
            interval_ms: 500,
            timeout_secs: 120,
        }
    }
}

/// Sampling-related configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct SamplingConfig {
    /// Bytes read at each sampling point, in KB
    pub chunk_kb: usize,

    /// Number of evenly spaced sampling points
    pub points: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            chunk_kb: 32,
            points: 30,
        }
    }
}

/// Escalation-related configuration
#[derive(Debug, Deserialize, Serialize)]
pub struct EscalationConfig {
    /// Adaptive pattern retry rounds
    pub max_adaptive_retries: usize,

    /// Exact-count reconciliation rounds
    pub max_reconcile_retries: usize,

    /// Gap regions consulted per reconciliation round
    pub max_gaps: usize,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        let defaults = EngineConfig::default();
        Self {
            max_adaptive_retries: defaults.max_adaptive_retries,
            max_reconcile_retries: defaults.max_reconcile_retries,
            max_gaps: defaults.max_gaps,
        }
    }
}

impl CliConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| CliError::FileNotFound(path.display().to_string()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| CliError::ConfigError(format!("{} is not valid TOML", path.display())))?;
        Ok(config)
    }

    /// Map the file-level knobs onto an engine configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sample_chunk_size: self.sampling.chunk_kb * 1024,
            sample_points: self.sampling.points,
            max_adaptive_retries: self.escalation.max_adaptive_retries,
            max_reconcile_retries: self.escalation.max_reconcile_retries,
            max_gaps: self.escalation.max_gaps,
            ..EngineConfig::default()
        }
    }

    /// Default configuration rendered as commented TOML.
    pub fn default_toml() -> Result<String> {
        let body = toml::to_string_pretty(&Self::default())
            .context("failed to serialize default configuration")?;
        Ok(format!(
            "# chapterize configuration\n\
             # Oracle endpoint, sampling, and escalation knobs.\n\
             # Every table is optional; absent tables take the defaults below.\n\n{body}"
        ))
    }
}
