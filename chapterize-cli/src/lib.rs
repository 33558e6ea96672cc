//! Chapterize CLI library
//!
//! Command-line interface over the chapterize-core discovery engine: file
//! resolution, configuration, the HTTP oracle client, and output formatting.

pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod oracle_http;
pub mod output;
pub mod progress;

pub use error::{CliError, CliResult};
