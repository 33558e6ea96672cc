//! CLI command implementations

use clap::Subcommand;

pub mod generate_config;
pub mod process;
pub mod verify;

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Discover chapter structure in novel text files
    Process(process::ProcessArgs),

    /// Verify a title pattern's coverage over a file
    Verify(verify::VerifyArgs),

    /// Print a commented default configuration file
    GenerateConfig(generate_config::GenerateConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_debug_format() {
        let cmd = Commands::Process(process::ProcessArgs {
            input: vec!["novel 120.txt".to_string()],
            output: None,
            format: process::OutputFormat::Text,
            expected_count: None,
            offline: true,
            config: None,
            cache_dir: None,
            quiet: false,
        });
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Process"));
        assert!(debug_str.contains("novel 120.txt"));
    }
}
