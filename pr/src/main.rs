//! pr - inspect prompts stored in a directory or git repository

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use promptrepo::cli::{Cli, Command, OutputFormat};
use promptrepo::config::{Config, LOCAL_CONFIG};
use promptrepo::{IdentityPolicy, RepositoryIndex, SourceLocation};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("{}", e))?;

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn open_index(cli: &Cli, config: &Config) -> Result<RepositoryIndex> {
    let source = cli.source.clone().or_else(|| config.source.clone()).unwrap_or_else(|| ".".to_string());

    let mut options = config.index_options();
    if let Some(revision) = &cli.revision {
        options.revision = Some(revision.clone());
    }
    if let Some(scope) = &cli.scope {
        options.scope = Some(scope.clone());
    }
    if cli.prefer_path {
        options.identity = IdentityPolicy::PreferPath;
    }

    // Our own config file is never a prompt
    options.exclude.push(LOCAL_CONFIG.to_string());
    if let SourceLocation::Local(root) = SourceLocation::parse(&source)
        && let Some(path) = config.path_within(&root)
    {
        options.exclude.push(path);
    }

    debug!(%source, ?options, "open_index: called");
    RepositoryIndex::open(source.as_str(), options).context(format!("Failed to index prompts from {}", source))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    let index = open_index(&cli, &config)?;
    info!("pr ready with {} prompts", index.len());

    debug!(command = ?cli.command, "main: dispatching command");
    match &cli.command {
        Command::Get { location } => {
            if let Some(content) = index.get(location)? {
                println!("{}", content);
            }
        }
        Command::Show { location, format } => {
            if let Some(record) = index.record(location)? {
                let rendered = match format {
                    OutputFormat::Yaml => serde_yaml::to_string(record)?,
                    OutputFormat::Json => serde_json::to_string_pretty(record)?,
                };
                println!("{}", rendered.trim_end());
            }
        }
        Command::List => {
            if index.is_empty() {
                println!("No prompts found");
            }
            for location in index.locations() {
                let variables = index
                    .record(location)?
                    .map(|record| record.variables().join(", "))
                    .unwrap_or_default();
                println!("{} {}", location.cyan(), variables.dimmed());
            }
        }
        Command::Changes => match index.changes()? {
            None => println!("{} Source has no revision history", "!".yellow()),
            Some(changed) if changed.is_empty() => println!("No prompts changed"),
            Some(changed) => {
                for record in changed {
                    if let Some(location) = record.location() {
                        println!("{} {}", "✓".green(), location.to_string().cyan());
                    }
                }
            }
        },
    }

    Ok(())
}
