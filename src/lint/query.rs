//! Dry-run validation of the SQL inside task executables.
//!
//! # Concurrency
//!
//! ```text
//!                 queue (256)           results
//! coordinator ──▶ [task, task, …] ──▶ worker × N ──▶ coordinator
//!                                        │
//!                                  one future per
//!                                    statement
//! ```
//!
//! The pool size bounds how many tasks are processed at once, but each
//! worker fans out every statement of its task at the same time. The number
//! of in-flight validator calls can therefore exceed `worker_count`; this
//! trades a strict connection limit for throughput on files with many
//! statements.
//!
//! A statement check that panics is reported as an issue on its task instead
//! of taking the worker down.

use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinSet};

use super::{Issue, Rule};
use crate::{
    error::{AppResult, rule_error},
    pipeline::{Pipeline, Task},
    query::{ExplainableQuery, QueryExtractor},
    validator::QueryValidator
};

/// Capacity of the task queue feeding the workers.
pub const QUEUE_CAPACITY: usize = 256;

/// Validates every statement of every task of one type against a warehouse.
///
/// One instance exists per warehouse/task-type combination. A
/// `worker_count` of zero disables the rule.
pub struct QueryValidatorRule {
    pub identifier:   String,
    pub task_type:    String,
    pub validator:    Arc<dyn QueryValidator>,
    pub extractor:    Arc<dyn QueryExtractor>,
    pub worker_count: usize
}

#[async_trait]
impl Rule for QueryValidatorRule {
    fn name(&self) -> &str {
        &self.identifier
    }

    async fn validate(&self, pipeline: &Pipeline) -> AppResult<Vec<Issue>> {
        if self.worker_count == 0 {
            return Ok(Vec::new());
        }

        tracing::debug!(
            workers = self.worker_count,
            task_type = %self.task_type,
            "Starting query validation"
        );

        let (task_tx, task_rx) = mpsc::channel::<Arc<Task>>(QUEUE_CAPACITY);
        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<Vec<Issue>>();
        let task_rx = Arc::new(tokio::sync::Mutex::new(task_rx));

        for worker in 0..self.worker_count {
            let task_rx = Arc::clone(&task_rx);
            let results = result_tx.clone();
            let extractor = Arc::clone(&self.extractor);
            let validator = Arc::clone(&self.validator);
            tokio::spawn(async move {
                loop {
                    let next = task_rx.lock().await.recv().await;
                    let Some(task) = next else {
                        break;
                    };
                    let issues = validate_task(task, extractor.as_ref(), &validator).await;
                    if results.send(issues).is_err() {
                        break;
                    }
                }
                tracing::trace!(worker, "Worker finished");
            });
        }
        drop(result_tx);

        let mut dispatched = 0usize;
        for task in pipeline.tasks_of_type(&self.task_type) {
            task_tx
                .send(Arc::clone(task))
                .await
                .map_err(|_| rule_error(&self.identifier, "all workers stopped"))?;
            dispatched += 1;
        }
        drop(task_tx);
        tracing::info!(
            tasks = dispatched,
            path = %pipeline.definition_file.display(),
            task_type = %self.task_type,
            "Dispatched tasks for query validation"
        );

        let mut issues = Vec::new();
        for received in 1..=dispatched {
            let batch = result_rx.recv().await.ok_or_else(|| {
                rule_error(
                    &self.identifier,
                    format!("workers stopped after {} of {} tasks", received - 1, dispatched)
                )
            })?;
            tracing::debug!("Received issues: {}/{}", received, dispatched);
            issues.extend(batch);
        }

        Ok(issues)
    }
}

/// Extract and validate every statement of one task.
async fn validate_task(
    task: Arc<Task>,
    extractor: &dyn QueryExtractor,
    validator: &Arc<dyn QueryValidator>
) -> Vec<Issue> {
    let path = task
        .executable_file
        .as_ref()
        .map(|e| e.path.clone())
        .unwrap_or_default();

    let queries = match extractor.extract_queries_from_file(&path) {
        Ok(queries) => queries,
        Err(e) => {
            return vec![Issue::for_task(
                &task,
                format!("Cannot read executable file '{}': {}", path.display(), e)
            )];
        }
    };

    tracing::debug!("Found {} queries in file '{}'", queries.len(), path.display());
    if queries.is_empty() {
        return vec![no_queries_issue(&task, &path)];
    }

    let issues = Arc::new(Mutex::new(Vec::new()));
    let mut checks = JoinSet::new();
    let mut statements = HashMap::new();
    for (index, query) in queries.into_iter().enumerate() {
        let rendered = query.to_explain_query();
        let task = Arc::clone(&task);
        let validator = Arc::clone(validator);
        let issues = Arc::clone(&issues);
        let explain = rendered.clone();
        let handle = checks.spawn(async move {
            let issue = validate_query(&task, validator.as_ref(), index, &query, &explain).await;
            if let Some(issue) = issue {
                issues.lock().push(issue);
            }
        });
        statements.insert(handle.id(), (index, rendered));
    }

    // a check that panicked or was cancelled never validated its statement
    while let Some(joined) = checks.join_next_with_id().await {
        let Err(e) = joined else {
            continue;
        };
        tracing::error!(task = %task.name, "Query check aborted: {}", e);
        let (index, rendered) = statements.remove(&e.id()).unwrap_or_default();
        issues.lock().push(
            Issue::for_task(&task, format!("Query check aborted at index {}: {}", index, e))
                .with_context(vec![format!("Query: {}", rendered)])
        );
    }

    std::mem::take(&mut *issues.lock())
}

fn no_queries_issue(task: &Arc<Task>, path: &Path) -> Issue {
    Issue::for_task(
        task,
        format!("No queries found in executable file '{}'", path.display())
    )
}

async fn validate_query(
    task: &Arc<Task>,
    validator: &dyn QueryValidator,
    index: usize,
    query: &ExplainableQuery,
    rendered: &str
) -> Option<Issue> {
    match validator.is_valid(rendered).await {
        Ok(true) => None,
        Ok(false) => Some(
            Issue::for_task(task, format!("Query '{}' is invalid", query.query))
                .with_context(vec![format!("Query: {}", rendered)])
        ),
        Err(e) => Some(
            Issue::for_task(task, format!("Invalid query found at index {}: {}", index, e))
                .with_context(vec![format!("Query: {}", rendered)])
        )
    }
}
