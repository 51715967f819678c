//! Structural rules over a single pipeline.
//!
//! Every rule is a plain function of the [`Pipeline`]; the executable check
//! closes over a [`Filesystem`]. They are wrapped into [`Rule`](super::Rule)
//! objects by [`FnRule`](super::FnRule) in [`get_rules`](super::get_rules).

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, LazyLock}
};

use indexmap::IndexMap;
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::{DfsEvent, depth_first_search}
};
use regex::Regex;

use super::{Issue, schedule::is_valid_schedule};
use crate::{
    error::{AppResult, filesystem_error},
    fs::Filesystem,
    pipeline::{Pipeline, TASK_TYPE_PYTHON, Task}
};

pub const TASK_NAME_MUST_EXIST: &str = "Task name must exist";
pub const TASK_NAME_MUST_BE_ALPHANUMERIC: &str =
    "Task name must be alphanumeric, only letters, digits, dashes and underscores are allowed";
pub const PIPELINE_NAME_CANNOT_BE_EMPTY: &str = "A pipeline must have a name";
pub const PIPELINE_NAME_MUST_BE_ALPHANUMERIC: &str =
    "A pipeline name must be made of alphanumeric characters, dashes or underscores";
pub const PIPELINE_CONTAINS_CYCLE: &str = "The pipeline has a cycle with dependencies";
pub const EXECUTABLE_FILE_CANNOT_BE_EMPTY: &str = "Executable file cannot be empty";
pub const EXECUTABLE_FILE_DOES_NOT_EXIST: &str = "Executable file does not exist";
pub const EXECUTABLE_FILE_IS_A_DIRECTORY: &str = "Executable file is a directory";
pub const EXECUTABLE_FILE_IS_EMPTY: &str = "Executable file is empty";
pub const EXECUTABLE_FILE_IS_NOT_EXECUTABLE: &str = "Executable file is not executable";

/// Task types a pipeline may declare.
pub const VALID_TASK_TYPES: &[&str] = &[
    "bq.sql",
    "bq.sensor.table",
    "bq.sensor.query",
    "bq.transfer",
    "sf.sql",
    "athena.sql",
    "bash",
    "empty",
    "gcs.from.s3",
    "gcs.sensor.object_sensor_with_prefix",
    "s3.sensor.key_sensor",
    TASK_TYPE_PYTHON
];

static VALID_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

pub fn ensure_task_name_is_valid(pipeline: &Pipeline) -> AppResult<Vec<Issue>> {
    let mut issues = Vec::new();
    for task in &pipeline.tasks {
        if task.name.is_empty() {
            issues.push(Issue::for_task(task, TASK_NAME_MUST_EXIST));
        } else if !VALID_NAME_REGEX.is_match(&task.name) {
            issues.push(Issue::for_task(task, TASK_NAME_MUST_BE_ALPHANUMERIC));
        }
    }
    Ok(issues)
}

pub fn ensure_task_name_is_unique(pipeline: &Pipeline) -> AppResult<Vec<Issue>> {
    let mut groups: IndexMap<&str, Vec<&Arc<Task>>> = IndexMap::new();
    for task in &pipeline.tasks {
        if task.name.is_empty() {
            continue;
        }
        groups.entry(task.name.as_str()).or_default().push(task);
    }

    let issues = groups
        .into_iter()
        .filter(|(_, tasks)| tasks.len() > 1)
        .map(|(name, tasks)| {
            let context = tasks
                .iter()
                .map(|t| t.definition_file.path.display().to_string())
                .collect();
            Issue::for_task(
                tasks[0],
                format!(
                    "Task name '{}' is not unique, please make sure all the task names are unique",
                    name
                )
            )
            .with_context(context)
        })
        .collect();
    Ok(issues)
}

pub fn ensure_dependency_exists(pipeline: &Pipeline) -> AppResult<Vec<Issue>> {
    let mut issues = Vec::new();
    for task in &pipeline.tasks {
        for dependency in &task.depends_on {
            if !pipeline.has_task(dependency) {
                issues.push(Issue::for_task(
                    task,
                    format!("Dependency '{}' does not exist", dependency)
                ));
            }
        }
    }
    Ok(issues)
}

/// Report self-loops first, then every cycle closed by a DFS back edge.
/// All cycle issues are pipeline-level.
pub fn ensure_pipeline_has_no_cycles(pipeline: &Pipeline) -> AppResult<Vec<Issue>> {
    let mut issues = Vec::new();
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for task in &pipeline.tasks {
        let name = task.name.as_str();
        nodes.entry(name).or_insert_with(|| graph.add_node(name));
    }

    for task in &pipeline.tasks {
        for dependency in &task.depends_on {
            if *dependency == task.name {
                issues.push(
                    Issue::for_pipeline(PIPELINE_CONTAINS_CYCLE)
                        .with_context(vec![format!("Task '{}' depends on itself", task.name)])
                );
                continue;
            }
            // unknown dependencies are reported by the dependency rule
            if let (Some(&from), Some(&to)) =
                (nodes.get(task.name.as_str()), nodes.get(dependency.as_str()))
            {
                graph.update_edge(from, to, ());
            }
        }
    }

    let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    depth_first_search(&graph, graph.node_indices(), |event| match event {
        DfsEvent::TreeEdge(parent, child) => {
            parents.insert(child, parent);
        }
        DfsEvent::BackEdge(from, to) => {
            issues.push(
                Issue::for_pipeline(PIPELINE_CONTAINS_CYCLE)
                    .with_context(cycle_edges(&graph, &parents, from, to))
            );
        }
        _ => {}
    });

    Ok(issues)
}

/// Edges of the cycle closed by the back edge `from -> to`, walking the DFS
/// tree from `to` down to `from`.
fn cycle_edges(
    graph: &DiGraph<&str, ()>,
    parents: &HashMap<NodeIndex, NodeIndex>,
    from: NodeIndex,
    to: NodeIndex
) -> Vec<String> {
    let mut path = vec![from];
    let mut current = from;
    while current != to {
        let Some(&parent) = parents.get(&current) else {
            break;
        };
        path.push(parent);
        current = parent;
    }
    path.reverse();

    let mut edges: Vec<String> = path
        .windows(2)
        .map(|pair| format!("{} -> {}", graph[pair[0]], graph[pair[1]]))
        .collect();
    edges.push(format!("{} -> {}", graph[from], graph[to]));
    edges
}

pub fn ensure_pipeline_schedule_is_valid_cron(pipeline: &Pipeline) -> AppResult<Vec<Issue>> {
    if pipeline.schedule.is_empty() || is_valid_schedule(&pipeline.schedule) {
        return Ok(Vec::new());
    }
    Ok(vec![Issue::for_pipeline(format!(
        "Invalid cron schedule '{}'",
        pipeline.schedule
    ))])
}

pub fn ensure_pipeline_name_is_valid(pipeline: &Pipeline) -> AppResult<Vec<Issue>> {
    if pipeline.name.is_empty() {
        return Ok(vec![Issue::for_pipeline(PIPELINE_NAME_CANNOT_BE_EMPTY)]);
    }
    if !VALID_NAME_REGEX.is_match(&pipeline.name) {
        return Ok(vec![Issue::for_pipeline(PIPELINE_NAME_MUST_BE_ALPHANUMERIC)]);
    }
    Ok(Vec::new())
}

pub fn ensure_only_accepted_task_types_are_there(pipeline: &Pipeline) -> AppResult<Vec<Issue>> {
    let issues = pipeline
        .tasks
        .iter()
        .filter(|t| !t.task_type.is_empty() && !VALID_TASK_TYPES.contains(&t.task_type.as_str()))
        .map(|t| Issue::for_task(t, format!("Invalid task type '{}'", t.task_type)))
        .collect();
    Ok(issues)
}

/// Build the executable check over the given filesystem.
pub fn ensure_executable_file_is_valid(
    fs: Arc<dyn Filesystem>
) -> impl Fn(&Pipeline) -> AppResult<Vec<Issue>> + Send + Sync {
    move |pipeline: &Pipeline| {
        let mut issues = Vec::new();
        for task in &pipeline.tasks {
            if task.is_comment_task() {
                continue;
            }

            let path = task
                .executable_file
                .as_ref()
                .map(|e| e.path.as_path())
                .filter(|p| !p.as_os_str().is_empty());
            let Some(path) = path else {
                if task.task_type == TASK_TYPE_PYTHON {
                    issues.push(Issue::for_task(task, EXECUTABLE_FILE_CANNOT_BE_EMPTY));
                }
                continue;
            };

            issues.extend(check_executable(fs.as_ref(), task, path)?);
        }
        Ok(issues)
    }
}

fn check_executable(fs: &dyn Filesystem, task: &Arc<Task>, path: &Path) -> AppResult<Vec<Issue>> {
    let stat = fs
        .stat(path)
        .map_err(|e| filesystem_error(&path.display().to_string(), e))?;
    let Some(stat) = stat else {
        return Ok(vec![Issue::for_task(task, EXECUTABLE_FILE_DOES_NOT_EXIST)]);
    };
    if stat.is_dir {
        return Ok(vec![Issue::for_task(task, EXECUTABLE_FILE_IS_A_DIRECTORY)]);
    }

    let mut issues = Vec::new();
    if stat.len == 0 {
        issues.push(Issue::for_task(task, EXECUTABLE_FILE_IS_EMPTY));
    }
    if !stat.executable {
        issues.push(Issue::for_task(task, EXECUTABLE_FILE_IS_NOT_EXECUTABLE));
    }
    Ok(issues)
}
