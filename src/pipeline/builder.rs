//! Pipeline graph construction from definition files.
//!
//! A pipeline lives in a directory holding a `pipeline.yml`:
//!
//! ```yaml
//! name: analytics
//! schedule: "@daily"
//! ```
//!
//! Tasks are read from the tasks directory next to it, either from YAML
//! task files:
//!
//! ```yaml
//! name: load_users
//! type: bq.sql
//! run: load_users.sql
//! depends:
//!   - extract_users
//! ```
//!
//! or from annotations at the top of a `.sql` / `.py` file that no YAML task
//! claims:
//!
//! ```sql
//! -- @task.name: load_users
//! -- @task.type: bq.sql
//! -- @task.depends: extract_users, extract_events
//! SELECT 1;
//! ```

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock}
};

use regex::Regex;
use serde::Deserialize;

use super::{DefinitionFile, DefinitionKind, ExecutableFile, Pipeline, Task};
use crate::{
    config::DiscoveryConfig,
    error::{AppResult, file_read_error, pipeline_build_error}
};

/// Matches a single `@task.<key>: <value>` annotation inside a comment.
static ANNOTATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@task\.([A-Za-z_]+)\s*:\s*(.*?)\s*$").expect("valid regex")
});

/// File layout the builder expects.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub pipeline_file_name:   String,
    pub tasks_directory_name: String,
    pub tasks_file_name:      String
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

impl From<&DiscoveryConfig> for BuilderConfig {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            pipeline_file_name:   config.pipeline_file.clone(),
            tasks_directory_name: config.tasks_dir.clone(),
            tasks_file_name:      config.task_file.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
struct PipelineDefinition {
    #[serde(default)]
    name:     String,
    #[serde(default)]
    schedule: String
}

#[derive(Debug, Deserialize)]
struct TaskDefinition {
    #[serde(default)]
    name:      String,
    #[serde(default, rename = "type")]
    task_type: String,
    #[serde(default)]
    run:       Option<String>,
    #[serde(default)]
    depends:   Vec<String>
}

/// Builds [`Pipeline`] graphs from directories on disk.
#[derive(Debug, Clone, Default)]
pub struct Builder {
    config: BuilderConfig
}

impl Builder {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config
        }
    }

    /// Build the pipeline rooted at `path`.
    ///
    /// `path` may be the pipeline directory or its definition file.
    pub fn create_pipeline_from_path(&self, path: &Path) -> AppResult<Pipeline> {
        let definition_path = if path.is_dir() {
            path.join(&self.config.pipeline_file_name)
        } else {
            path.to_path_buf()
        };
        let pipeline_dir = definition_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let definition_display = definition_path.display().to_string();
        let content = fs::read_to_string(&definition_path)
            .map_err(|e| file_read_error(&definition_display, e))?;
        let definition: PipelineDefinition = serde_yaml::from_str(&content)
            .map_err(|e| pipeline_build_error(&definition_display, e.to_string()))?;

        let tasks_dir = pipeline_dir.join(&self.config.tasks_directory_name);
        let mut tasks = self.yaml_tasks(&tasks_dir)?;
        let claimed: HashSet<PathBuf> = tasks
            .iter()
            .filter_map(|t| t.executable_file.as_ref().map(|e| e.path.clone()))
            .collect();
        tasks.extend(comment_tasks(&tasks_dir, &claimed)?);

        tracing::debug!(
            pipeline = %definition.name,
            path = %definition_display,
            tasks = tasks.len(),
            "Built pipeline"
        );

        Ok(Pipeline {
            name: definition.name,
            schedule: definition.schedule,
            tasks: tasks.into_iter().map(Arc::new).collect(),
            definition_file: definition_path
        })
    }

    fn yaml_tasks(&self, tasks_dir: &Path) -> AppResult<Vec<Task>> {
        let pattern = format!(
            "{}/**/{}",
            glob::Pattern::escape(&tasks_dir.display().to_string()),
            self.config.tasks_file_name
        );
        let mut tasks = Vec::new();
        for path in glob_files(&pattern)? {
            let path_display = path.display().to_string();
            let content =
                fs::read_to_string(&path).map_err(|e| file_read_error(&path_display, e))?;
            let definition: TaskDefinition = serde_yaml::from_str(&content)
                .map_err(|e| pipeline_build_error(&path_display, e.to_string()))?;

            let task_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            let executable_file = definition.run.filter(|r| !r.is_empty()).map(|run| {
                let executable_path = task_dir.join(&run);
                ExecutableFile {
                    name: executable_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or(run),
                    path: executable_path
                }
            });

            tasks.push(Task {
                name: definition.name,
                task_type: definition.task_type,
                depends_on: definition.depends,
                executable_file,
                definition_file: DefinitionFile {
                    path,
                    kind: DefinitionKind::Yaml
                }
            });
        }
        Ok(tasks)
    }
}

fn glob_files(pattern: &str) -> AppResult<Vec<PathBuf>> {
    let entries =
        glob::glob(pattern).map_err(|e| pipeline_build_error(pattern, e.to_string()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| pipeline_build_error(pattern, e.to_string()))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn comment_tasks(tasks_dir: &Path, claimed: &HashSet<PathBuf>) -> AppResult<Vec<Task>> {
    let pattern = format!("{}/**/*", glob::Pattern::escape(&tasks_dir.display().to_string()));
    let mut tasks = Vec::new();
    for path in glob_files(&pattern)? {
        if claimed.contains(&path) {
            continue;
        }
        let Some(marker) = comment_marker(&path) else {
            continue;
        };
        let path_display = path.display().to_string();
        let content = fs::read_to_string(&path).map_err(|e| file_read_error(&path_display, e))?;
        if let Some(task) = task_from_comments(&path, &content, marker) {
            tasks.push(task);
        }
    }
    Ok(tasks)
}

fn comment_marker(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "sql" => Some("--"),
        "py" => Some("#"),
        _ => None
    }
}

/// Build a task from the leading comment block of an executable.
///
/// Returns `None` when the file carries no `@task.` annotation.
fn task_from_comments(path: &Path, content: &str, marker: &str) -> Option<Task> {
    let mut task = Task {
        executable_file: Some(ExecutableFile {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf()
        }),
        definition_file: DefinitionFile {
            path: path.to_path_buf(),
            kind: DefinitionKind::Comment
        },
        ..Default::default()
    };
    let mut annotated = false;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(comment) = line.strip_prefix(marker) else {
            break;
        };
        let Some(captures) = ANNOTATION_REGEX.captures(comment.trim()) else {
            continue;
        };
        let value = captures[2].to_string();
        match &captures[1] {
            "name" => task.name = value,
            "type" => task.task_type = value,
            "depends" => task.depends_on.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(String::from)
            ),
            _ => continue
        }
        annotated = true;
    }

    annotated.then_some(task)
}
