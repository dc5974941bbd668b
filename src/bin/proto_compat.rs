//! proto-compat CLI
//!
//! Checks wire compatibility between two versions of a protobuf schema.
//!
//! Exit codes: 0 compatible, 1 incompatible (or warnings under `--strict`),
//! 2 when a schema or the configuration cannot be loaded.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use proto_compat::config::LoaderConfig;
use proto_compat::report::SourceInfo;
use proto_compat::{compare, loader, CompatConfig, CompatibilityReport, LoadedSchema, OutputFormat};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proto-compat")]
#[command(about = "Check wire compatibility between two versions of a protobuf schema")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an older schema against a newer one
    Check {
        /// Older schema (file or directory)
        older: PathBuf,
        /// Newer schema (file or directory)
        newer: PathBuf,
        /// Leave warnings out of the report
        #[arg(long)]
        suppress_warnings: bool,
        /// Fail on warnings as well as incompatibilities
        #[arg(long)]
        strict: bool,
        /// Output format (overrides the config file)
        #[arg(short, long, value_enum)]
        format: Option<Format>,
    },

    /// Print the snapshot loaded from a schema as JSON
    Inspect {
        /// Schema file or directory
        path: PathBuf,
    },

    /// View or create configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Output as TOML
        #[arg(long, conflicts_with = "json")]
        toml: bool,
        /// Output as JSON (the default)
        #[arg(long)]
        json: bool,
    },
    /// Write a default config file
    Init {
        #[arg(short, long, default_value = "proto-compat.toml")]
        output: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = CompatConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Check {
            older,
            newer,
            suppress_warnings,
            strict,
            format,
        } => {
            let suppress_warnings = suppress_warnings || config.report.suppress_warnings;
            let strict = strict || config.check.fail_on_warnings;
            let format = format.map(OutputFormat::from).unwrap_or(config.report.format);

            let old_schema = load(&older, &config.loader)?;
            let new_schema = load(&newer, &config.loader)?;

            let differences = compare(&old_schema.snapshot, &new_schema.snapshot);

            match format {
                OutputFormat::Text => print!("{}", differences.render(suppress_warnings)),
                OutputFormat::Json => {
                    let report = CompatibilityReport::new(
                        SourceInfo::new(&older, &old_schema),
                        SourceInfo::new(&newer, &new_schema),
                        &differences,
                        suppress_warnings,
                    );
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }

            Ok(if differences.fails(strict) { 1 } else { 0 })
        }

        Commands::Inspect { path } => {
            let schema = load(&path, &config.loader)?;
            println!("{}", serde_json::to_string_pretty(&schema.snapshot)?);
            Ok(0)
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show { toml, json: _ } => {
                if toml {
                    println!("{}", ::toml::to_string_pretty(&config)?);
                } else {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                Ok(0)
            }
            ConfigCommands::Init { output } => {
                CompatConfig::default().save(&output)?;
                println!("Wrote {}", output);
                Ok(0)
            }
        },
    }
}

fn load(path: &Path, config: &LoaderConfig) -> anyhow::Result<LoadedSchema> {
    loader::load_path(path, config)
        .with_context(|| format!("loading schema from {}", path.display()))
}
