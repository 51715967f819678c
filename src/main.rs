//! # Pipeline Lint
//!
//! Validate data pipeline definitions before they reach the scheduler.
//!
//! `pipeline-lint` discovers every pipeline under a directory, builds its
//! task graph from `pipeline.yml` and `tasks/**/task.yml` definitions (plus
//! annotated `.sql` and `.py` files) and runs a set of rules over it.
//!
//! # Architecture
//!
//! The linter operates in two phases:
//!
//! 1. **Structural rules** (always run) - names, uniqueness, dependencies,
//!    cycles, schedules, task types and executable files.
//!
//! 2. **Query validation** (optional) - with `--workers N` every `bq.sql` and
//!    `sf.sql` executable is split into statements, templated, and each
//!    statement is dry-run by a pool of `N` workers per warehouse.
//!
//! # Quick Start
//!
//! ```bash
//! # Structural checks only
//! pipeline-lint validate ./pipelines
//!
//! # With query validation
//! pipeline-lint validate ./pipelines --workers 8
//!
//! # CI integration
//! pipeline-lint validate ./pipelines -f json --no-color > lint.json
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from (in order of precedence):
//!
//! 1. Command-line arguments
//! 2. Environment variables (`PIPELINE_LINT_WORKERS`)
//! 3. `.pipeline-lint.toml` in current directory
//! 4. `~/.config/pipeline-lint/config.toml`
//!
//! # Exit Codes
//!
//! - `0` - All pipelines are valid
//! - `1` - Issues found, or the run itself failed
//!
//! # Output Formats
//!
//! - `text` - Human-readable colored output (default)
//! - `json` - Structured JSON for programmatic processing
//! - `yaml` - YAML format

use std::{io::IsTerminal, process, sync::Arc, time::Duration};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pipeline_lint::{
    cli::{Cli, Commands, Format},
    config::Config,
    error::AppResult,
    fs::OsFilesystem,
    lint::{Linter, get_rules},
    logging::init_tracing,
    output::{OutputFormat, OutputOptions, format_lint_result},
    path::get_pipeline_paths,
    pipeline::{Builder, BuilderConfig}
};
use tokio::main;

#[main]
async fn main() {
    match run().await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

async fn run() -> AppResult<i32> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let mut config = Config::load()?;

    match cli.command {
        Commands::Validate {
            path,
            workers,
            output_format,
            no_color
        } => {
            if let Some(workers) = workers {
                config.query_validation.workers = workers;
            }

            let output_opts = OutputOptions {
                format:  match output_format {
                    Format::Text => OutputFormat::Text,
                    Format::Json => OutputFormat::Json,
                    Format::Yaml => OutputFormat::Yaml
                },
                colored: !no_color,
                root:    path.clone()
            };

            let rules = get_rules(&config, Arc::new(OsFilesystem))?;
            let linter = Linter::new(
                get_pipeline_paths,
                Builder::new(BuilderConfig::from(&config.discovery)),
                rules
            );
            tracing::debug!(
                rules = linter.rules_count(),
                workers = config.query_validation.workers,
                "Linter ready"
            );

            // spinner only for interactive text output
            let pb = if matches!(output_opts.format, OutputFormat::Text)
                && std::io::stderr().is_terminal()
            {
                let pb = ProgressBar::new_spinner();
                if let Ok(style) =
                    ProgressStyle::default_spinner().template("{spinner:.green} {msg}")
                {
                    pb.set_style(style);
                }
                pb.set_message("Validating pipelines...");
                pb.enable_steady_tick(Duration::from_millis(100));
                Some(pb)
            } else {
                None
            };

            let result = linter.lint(&path, &config.discovery.pipeline_file).await;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            let result = result?;

            println!("{}", format_lint_result(&result, &output_opts));

            Ok(if result.has_errors() { 1 } else { 0 })
        }
    }
}
