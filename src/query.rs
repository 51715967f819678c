//! SQL statement extraction from task executables.
//!
//! A file is turned into a list of [`ExplainableQuery`] values in four steps:
//!
//! 1. block (`/* */`) and line (`--`) comments are replaced by a newline
//! 2. `{{ name }}` placeholders are rendered by the [`Renderer`]
//! 3. the text is split on `;`, blank lines dropped and each piece trimmed
//! 4. `SET` / `DECLARE` statements become variable definitions, `USE` is
//!    dropped and every other statement is a query
//!
//! Variable definitions accumulate over the whole file and are never reset:
//! each query carries every definition seen before it, so session variables
//! declared at the top stay visible to the last statement.
//!
//! ```
//! use pipeline_lint::query::split_queries;
//!
//! let queries = split_queries("SET x = 1;\nUSE db;\nSELECT $x;");
//!
//! assert_eq!(queries.len(), 1);
//! assert_eq!(queries[0].to_explain_query(), "SET x = 1;\nEXPLAIN SELECT $x;");
//! ```

mod render;

use std::{
    borrow::Cow,
    path::Path,
    sync::{Arc, LazyLock}
};

use regex::Regex;
pub use render::Renderer;

use crate::{
    error::{AppResult, file_read_error},
    fs::Filesystem
};

/// Block comments (across newlines) and line comments up to end of line.
static QUERY_COMMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/|--[^\n]*(?:\n|$)").expect("valid regex"));

/// A statement ready for a dry-run, with the variable definitions it may
/// depend on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplainableQuery {
    pub variable_definitions: Vec<String>,
    pub query:                String
}

impl ExplainableQuery {
    /// Render as a single script: definitions first, then `EXPLAIN <query>;`.
    pub fn to_explain_query(&self) -> String {
        let mut rendered = String::new();
        for definition in &self.variable_definitions {
            rendered.push_str(definition);
            rendered.push_str(";\n");
        }
        rendered.push_str("EXPLAIN ");
        rendered.push_str(&self.query);
        rendered.push(';');
        rendered
    }
}

/// Source of explainable queries for a task executable.
pub trait QueryExtractor: Send + Sync {
    fn extract_queries_from_file(&self, path: &Path) -> AppResult<Vec<ExplainableQuery>>;
}

/// [`QueryExtractor`] reading files through a [`Filesystem`].
pub struct FileExtractor {
    fs:       Arc<dyn Filesystem>,
    renderer: Renderer
}

impl FileExtractor {
    pub fn new(fs: Arc<dyn Filesystem>, renderer: Renderer) -> Self {
        Self {
            fs,
            renderer
        }
    }
}

impl QueryExtractor for FileExtractor {
    fn extract_queries_from_file(&self, path: &Path) -> AppResult<Vec<ExplainableQuery>> {
        let contents = self
            .fs
            .read_to_string(path)
            .map_err(|e| file_read_error(&path.display().to_string(), e))?;
        let cleaned = strip_comments(&contents);
        let rendered = self.renderer.render(&cleaned);
        Ok(split_queries(&rendered))
    }
}

/// Replace every comment with a newline, keeping statement boundaries.
pub fn strip_comments(content: &str) -> Cow<'_, str> {
    QUERY_COMMENT_REGEX.replace_all(content, "\n")
}

#[derive(Debug, PartialEq, Eq)]
enum StatementKind {
    VariableDefinition,
    Use,
    Query
}

fn classify(statement: &str) -> StatementKind {
    let keyword: String = statement
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_ascii_lowercase();
    match keyword.as_str() {
        "set" | "declare" => StatementKind::VariableDefinition,
        "use" => StatementKind::Use,
        _ => StatementKind::Query
    }
}

/// Split already cleaned and rendered SQL into explainable queries.
pub fn split_queries(content: &str) -> Vec<ExplainableQuery> {
    let mut queries = Vec::new();
    let mut variables_seen_so_far: Vec<String> = Vec::new();

    for candidate in content.split(';') {
        let statement = candidate
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }

        match classify(statement) {
            StatementKind::VariableDefinition => {
                variables_seen_so_far.push(statement.to_string())
            }
            StatementKind::Use => {}
            StatementKind::Query => queries.push(ExplainableQuery {
                variable_definitions: variables_seen_so_far.clone(),
                query:                statement.to_string()
            })
        }
    }

    queries
}
