use std::path::{Path, PathBuf};

use colored::Colorize;
use indexmap::IndexMap;
use serde::Serialize;

use crate::lint::{Issue, LintResult, PipelineIssues};

/// Output format for results
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool,
    /// Paths in the report are shown relative to this directory
    pub root:    PathBuf
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true,
            root:    PathBuf::from(".")
        }
    }
}

/// One issue flattened for serialization
#[derive(Debug, Serialize)]
pub struct IssueRecord {
    pub pipeline:    String,
    pub rule:        String,
    pub task:        Option<String>,
    pub file:        String,
    pub description: String,
    pub context:     Vec<String>
}

/// Lint result for serialization
#[derive(Debug, Serialize)]
pub struct LintReport {
    pub pipelines_checked: usize,
    pub issue_count:       usize,
    pub issues:            Vec<IssueRecord>
}

/// Format a lint result based on output options
pub fn format_lint_result(result: &LintResult, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&to_report(result, opts)).unwrap_or_default()
        }
        OutputFormat::Yaml => serde_yaml::to_string(&to_report(result, opts)).unwrap_or_default(),
        OutputFormat::Text => format_text(result, opts)
    }
}

pub fn to_report(result: &LintResult, opts: &OutputOptions) -> LintReport {
    let mut issues = Vec::new();
    for pipeline_issues in &result.pipelines {
        let pipeline = &pipeline_issues.pipeline;
        for (rule, found) in &pipeline_issues.issues {
            for issue in found {
                issues.push(IssueRecord {
                    pipeline:    pipeline.name.clone(),
                    rule:        rule.clone(),
                    task:        issue.task.as_ref().map(|t| t.name.clone()),
                    file:        relative(issue_file(pipeline_issues, issue), &opts.root),
                    description: issue.description.clone(),
                    context:     issue.context.clone()
                });
            }
        }
    }
    LintReport {
        pipelines_checked: result.pipelines.len(),
        issue_count: issues.len(),
        issues
    }
}

fn issue_file<'a>(pipeline_issues: &'a PipelineIssues, issue: &'a Issue) -> &'a Path {
    match &issue.task {
        Some(task) => &task.definition_file.path,
        None => &pipeline_issues.pipeline.definition_file
    }
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn paint(text: &str, opts: &OutputOptions, style: fn(&str) -> colored::ColoredString) -> String {
    if opts.colored {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn format_text(result: &LintResult, opts: &OutputOptions) -> String {
    let mut output = String::new();

    for pipeline_issues in &result.pipelines {
        if pipeline_issues.issues.is_empty() {
            continue;
        }
        let pipeline = &pipeline_issues.pipeline;
        let header = format!(
            "Pipeline: {} ({})",
            pipeline.name,
            relative(&pipeline.definition_file, &opts.root)
        );
        output.push_str(&paint(&header, opts, |s| s.cyan().bold()));
        output.push('\n');

        // group by owning task, pipeline-level issues under the pipeline itself
        let mut groups: IndexMap<String, Vec<&Issue>> = IndexMap::new();
        for issue in pipeline_issues.issues.values().flatten() {
            let label = match &issue.task {
                Some(task) => format!(
                    "{} ({})",
                    if task.name.is_empty() { "<unnamed>" } else { task.name.as_str() },
                    relative(&task.definition_file.path, &opts.root)
                ),
                None => String::from("Pipeline")
            };
            groups.entry(label).or_default().push(issue);
        }

        for (label, issues) in &groups {
            output.push_str(&format!("  {} {}\n", "├──", paint(label, opts, |s| s.yellow())));
            for issue in issues {
                output.push_str(&format!(
                    "  │   └── {}\n",
                    paint(&issue.description, opts, |s| s.red())
                ));
                for line in &issue.context {
                    output.push_str(&format!("  │       - {}\n", line));
                }
            }
        }
        output.push('\n');
    }

    let count = result.issue_count();
    let summary = if count == 0 {
        paint(
            &format!("✓ Checked {} pipeline(s), all good.", result.pipelines.len()),
            opts,
            |s| s.green().bold()
        )
    } else {
        paint(
            &format!(
                "✗ Checked {} pipeline(s) and found {} issue(s).",
                result.pipelines.len(),
                count
            ),
            opts,
            |s| s.red().bold()
        )
    };
    output.push_str(&summary);
    output
}
