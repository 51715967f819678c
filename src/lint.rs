//! Rule engine for pipeline definitions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Directories │────▶│   Builder    │────▶│    Linter    │────▶│ LintResult  │
//! └─────────────┘     │  (parallel)  │     └──────────────┘     └─────────────┘
//!                     └──────────────┘            │
//!                                          ┌──────┴──────┐
//!                                          │    Rules    │
//!                                          └─────────────┘
//! ```
//!
//! Pipelines are built in parallel using [`rayon`]; every registered [`Rule`]
//! then runs over each pipeline and the resulting [`Issue`]s are grouped per
//! pipeline and rule.
//!
//! # Rules
//!
//! | Name | Checks |
//! |------|--------|
//! | `task-name-valid` | task names exist and are alphanumeric |
//! | `task-name-unique` | no two tasks share a name |
//! | `dependency-exists` | every dependency names a task of the pipeline |
//! | `acyclic-pipeline` | the dependency graph has no cycles |
//! | `valid-pipeline-schedule` | the schedule is a cron expression or descriptor |
//! | `valid-pipeline-name` | the pipeline name exists and is alphanumeric |
//! | `valid-task-type` | task types are known |
//! | `executable-file-valid` | executables exist, are files, non-empty and executable |
//! | `bigquery-query-validator` | `bq.sql` statements compile (needs workers) |
//! | `snowflake-query-validator` | `sf.sql` statements compile (needs workers) |
//!
//! Rules can be disabled via [`RulesConfig`](crate::config::RulesConfig):
//!
//! ```toml
//! [rules]
//! disabled = ["valid-task-type"]
//! ```

pub mod query;
pub mod rules;
pub mod schedule;

use std::{
    path::{Path, PathBuf},
    sync::Arc
};

use async_trait::async_trait;
use indexmap::IndexMap;
use rayon::prelude::*;

pub use self::query::QueryValidatorRule;
use crate::{
    config::Config,
    error::{AppResult, build_task_error, config_error},
    fs::Filesystem,
    pipeline::{Builder, Pipeline, Task},
    query::{FileExtractor, QueryExtractor, Renderer},
    validator::{ParserValidator, WarehouseDialect}
};

/// A validation finding on a pipeline or one of its tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Owning task, `None` for pipeline-level findings
    pub task:        Option<Arc<Task>>,
    pub description: String,
    /// Supplementary lines such as file paths or cycle edges
    pub context:     Vec<String>
}

impl Issue {
    pub fn for_task(task: &Arc<Task>, description: impl Into<String>) -> Self {
        Self {
            task:        Some(Arc::clone(task)),
            description: description.into(),
            context:     Vec::new()
        }
    }

    pub fn for_pipeline(description: impl Into<String>) -> Self {
        Self {
            task:        None,
            description: description.into(),
            context:     Vec::new()
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }
}

/// Trait for implementing pipeline rules.
///
/// Rules examine a whole pipeline and return every issue they find. An `Err`
/// is reserved for setup failures (an unreadable filesystem, a vanished
/// worker pool) and aborts the run; findings are always returned as issues.
#[async_trait]
pub trait Rule: Send + Sync {
    fn name(&self) -> &str;

    async fn validate(&self, pipeline: &Pipeline) -> AppResult<Vec<Issue>>;
}

/// Adapts a plain check function into a [`Rule`].
pub struct FnRule<F> {
    name:  &'static str,
    check: F
}

impl<F> FnRule<F>
where
    F: Fn(&Pipeline) -> AppResult<Vec<Issue>> + Send + Sync
{
    pub fn new(name: &'static str, check: F) -> Self {
        Self {
            name,
            check
        }
    }
}

#[async_trait]
impl<F> Rule for FnRule<F>
where
    F: Fn(&Pipeline) -> AppResult<Vec<Issue>> + Send + Sync
{
    fn name(&self) -> &str {
        self.name
    }

    async fn validate(&self, pipeline: &Pipeline) -> AppResult<Vec<Issue>> {
        (self.check)(pipeline)
    }
}

/// Build the rule set for a run.
///
/// One query validator is registered per warehouse task type; with
/// `query_validation.workers` at zero they do not run. Naming an unknown rule
/// in `rules.disabled` is an error.
pub fn get_rules(config: &Config, fs: Arc<dyn Filesystem>) -> AppResult<Vec<Box<dyn Rule>>> {
    let mut all_rules: Vec<Box<dyn Rule>> = vec![
        Box::new(FnRule::new("task-name-valid", rules::ensure_task_name_is_valid)),
        Box::new(FnRule::new("task-name-unique", rules::ensure_task_name_is_unique)),
        Box::new(FnRule::new("dependency-exists", rules::ensure_dependency_exists)),
        Box::new(FnRule::new("acyclic-pipeline", rules::ensure_pipeline_has_no_cycles)),
        Box::new(FnRule::new(
            "valid-pipeline-schedule",
            rules::ensure_pipeline_schedule_is_valid_cron
        )),
        Box::new(FnRule::new("valid-pipeline-name", rules::ensure_pipeline_name_is_valid)),
        Box::new(FnRule::new(
            "valid-task-type",
            rules::ensure_only_accepted_task_types_are_there
        )),
        Box::new(FnRule::new(
            "executable-file-valid",
            rules::ensure_executable_file_is_valid(Arc::clone(&fs))
        )),
    ];

    let extractor: Arc<dyn QueryExtractor> = Arc::new(FileExtractor::new(
        fs,
        Renderer::with_builtin_variables(config.templating.variables.clone())
    ));
    for (task_type, dialect) in [
        ("bq.sql", WarehouseDialect::BigQuery),
        ("sf.sql", WarehouseDialect::Snowflake)
    ] {
        all_rules.push(Box::new(QueryValidatorRule {
            identifier:   format!("{}-query-validator", dialect),
            task_type:    task_type.to_string(),
            validator:    Arc::new(ParserValidator::new(dialect)),
            extractor:    Arc::clone(&extractor),
            worker_count: config.query_validation.workers
        }));
    }

    for disabled in &config.rules.disabled {
        if !all_rules
            .iter()
            .any(|r| r.name().eq_ignore_ascii_case(disabled))
        {
            return Err(config_error(format!("Unknown rule '{}' in rules.disabled", disabled)));
        }
    }

    let rules = all_rules
        .into_iter()
        .filter(|r| {
            !config
                .rules
                .disabled
                .iter()
                .any(|d| d.eq_ignore_ascii_case(r.name()))
        })
        .collect();
    Ok(rules)
}

/// Issues found in one pipeline, grouped by rule name.
#[derive(Debug, Clone)]
pub struct PipelineIssues {
    pub pipeline: Arc<Pipeline>,
    pub issues:   IndexMap<String, Vec<Issue>>
}

impl PipelineIssues {
    pub fn issue_count(&self) -> usize {
        self.issues.values().map(Vec::len).sum()
    }
}

/// Outcome of a lint run.
#[derive(Debug, Clone, Default)]
pub struct LintResult {
    pub pipelines: Vec<PipelineIssues>
}

impl LintResult {
    pub fn has_errors(&self) -> bool {
        self.issue_count() > 0
    }

    pub fn issue_count(&self) -> usize {
        self.pipelines.iter().map(PipelineIssues::issue_count).sum()
    }
}

/// Locates pipeline directories under a root.
pub type PipelineFinder = fn(&Path, &str) -> AppResult<Vec<PathBuf>>;

/// Discovers, builds and checks pipelines.
pub struct Linter {
    find_pipelines: PipelineFinder,
    builder:        Builder,
    rules:          Vec<Box<dyn Rule>>
}

impl Linter {
    pub fn new(find_pipelines: PipelineFinder, builder: Builder, rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            find_pipelines,
            builder,
            rules
        }
    }

    pub fn rules_count(&self) -> usize {
        self.rules.len()
    }

    /// Lint every pipeline found under `root`.
    pub async fn lint(&self, root: &Path, pipeline_file_name: &str) -> AppResult<LintResult> {
        let paths = (self.find_pipelines)(root, pipeline_file_name)?;
        if paths.is_empty() {
            return Err(config_error(format!(
                "No pipelines found in path '{}'",
                root.display()
            )));
        }
        tracing::info!(count = paths.len(), "Found pipelines, building");

        // building reads files; keep it off the async workers
        let builder = self.builder.clone();
        let pipelines = tokio::task::spawn_blocking(move || {
            paths
                .par_iter()
                .map(|path| builder.create_pipeline_from_path(path))
                .collect::<AppResult<Vec<Pipeline>>>()
        })
        .await
        .map_err(|e| build_task_error(e.to_string()))??;

        let mut result = LintResult::default();
        for pipeline in pipelines {
            result.pipelines.push(self.lint_pipeline(Arc::new(pipeline)).await?);
        }
        Ok(result)
    }

    /// Run every rule over a single pipeline.
    pub async fn lint_pipeline(&self, pipeline: Arc<Pipeline>) -> AppResult<PipelineIssues> {
        let mut issues = IndexMap::new();
        for rule in &self.rules {
            let found = rule.validate(&pipeline).await?;
            tracing::debug!(
                pipeline = %pipeline.name,
                rule = rule.name(),
                issues = found.len(),
                "Rule finished"
            );
            if !found.is_empty() {
                issues.insert(rule.name().to_string(), found);
            }
        }
        Ok(PipelineIssues {
            pipeline,
            issues
        })
    }
}
