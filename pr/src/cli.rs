//! CLI argument parsing for pr

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pr")]
#[command(author, version, about = "Load and inspect prompts stored in a directory or git repository", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Directory, repository path or remote URL (default: current directory)
    #[arg(short, long, global = true)]
    pub source: Option<String>,

    /// Branch, tag or commit to read
    #[arg(short, long, global = true)]
    pub revision: Option<String>,

    /// Only index prompts under this directory
    #[arg(long, global = true)]
    pub scope: Option<String>,

    /// Let the file path decide application and name over declared fields
    #[arg(long, global = true)]
    pub prefer_path: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the rendered content of a prompt
    Get {
        /// Location as 'name' or 'application/name'
        #[arg(required = true)]
        location: String,
    },

    /// Print a whole prompt record
    Show {
        /// Location as 'name' or 'application/name'
        #[arg(required = true)]
        location: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "yaml")]
        format: OutputFormat,
    },

    /// List every prompt location with its variables
    List,

    /// List prompts added or modified by the selected revision
    Changes,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get() {
        let cli = Cli::parse_from(["pr", "--source", "prompts", "get", "pirates/first"]);
        assert_eq!(cli.source.as_deref(), Some("prompts"));
        assert!(matches!(cli.command, Command::Get { ref location } if location == "pirates/first"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["pr", "list", "--revision", "v1.0", "--prefer-path"]);
        assert_eq!(cli.revision.as_deref(), Some("v1.0"));
        assert!(cli.prefer_path);
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn test_show_format() {
        let cli = Cli::parse_from(["pr", "show", "a/b", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Command::Show {
                format: OutputFormat::Json,
                ..
            }
        ));

        let cli = Cli::parse_from(["pr", "show", "a/b"]);
        assert!(matches!(
            cli.command,
            Command::Show {
                format: OutputFormat::Yaml,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_location_is_rejected() {
        assert!(Cli::try_parse_from(["pr", "get"]).is_err());
    }
}
