use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Pipeline Lint - Validate data pipeline definitions before they run
#[derive(Parser, Debug)]
#[command(name = "pipeline-lint")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show debug information
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate every pipeline found under a directory
    Validate {
        /// Path to the pipelines
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Query validation workers per warehouse (0 disables dry-runs)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format,

        /// Disable colored output
        #[arg(long)]
        no_color: bool
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}
