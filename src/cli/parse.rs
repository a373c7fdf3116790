//! CLI parse: clap types for flashui. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flash UI - generate several styled takes on one UI prompt at once
#[derive(Parser)]
#[command(name = "flashui")]
#[command(about = "Generate multiple streamed HTML/CSS variations of a UI prompt")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config/ is read from here)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate styled variations for a prompt
    Generate {
        /// What to build, e.g. "a pricing card"
        prompt: String,
        /// Number of variations (defaults to generation.variations)
        #[arg(long, short = 'n')]
        variations: Option<usize>,
        /// Write each finished artifact to DIR/<artifact-id>.html
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Browse and manage past sessions
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Manage saved artifacts
    Library {
        #[command(subcommand)]
        command: LibraryCommands,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List sessions, oldest first
    List,
    /// Show the artifacts of a session
    Show {
        session_id: String,
        /// Print the html of every artifact
        #[arg(long)]
        html: bool,
    },
    /// Make a session the current one
    Select { session_id: String },
    /// Delete a session
    Delete {
        session_id: String,
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum LibraryCommands {
    /// List saved artifacts, newest first
    List,
    /// Save a finished artifact
    Save { artifact_id: String },
    /// Print a saved artifact's html
    Show { saved_id: String },
    /// Write a saved artifact's html to a file
    Export { saved_id: String, file: PathBuf },
    /// Remove an artifact from the library
    Remove { saved_id: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from(["flashui", "generate", "pricing card", "-n", "3"]).unwrap();
        match cli.command {
            Commands::Generate {
                prompt,
                variations,
                out_dir,
            } => {
                assert_eq!(prompt, "pricing card");
                assert_eq!(variations, Some(3));
                assert!(out_dir.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_nested_commands() {
        let cli =
            Cli::try_parse_from(["flashui", "history", "delete", "sess-1", "--yes"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommands::Delete { yes: true, .. }
            }
        ));

        let cli = Cli::try_parse_from(["flashui", "library", "export", "a_0", "out.html"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Library {
                command: LibraryCommands::Export { .. }
            }
        ));
    }
}
