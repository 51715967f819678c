//! Pipeline graph model.
//!
//! A [`Pipeline`] is a named collection of [`Task`]s with dependencies and an
//! optional run schedule. The graph is built once per validation run by the
//! [`builder`] and is read-only afterwards: tasks are shared as `Arc<Task>`
//! so that issues and concurrent rules can hold on to them without copying.
//!
//! ```
//! use std::sync::Arc;
//!
//! use pipeline_lint::pipeline::{Pipeline, Task};
//!
//! let pipeline = Pipeline {
//!     name: "analytics".into(),
//!     tasks: vec![Arc::new(Task {
//!         name: "load_users".into(),
//!         task_type: "bq.sql".into(),
//!         ..Default::default()
//!     })],
//!     ..Default::default()
//! };
//!
//! assert!(pipeline.has_task("load_users"));
//! ```

pub mod builder;

use std::{path::PathBuf, sync::Arc};

pub use builder::{Builder, BuilderConfig};

/// Task type that runs a Python script and therefore requires an executable.
pub const TASK_TYPE_PYTHON: &str = "python";

/// How a task was declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefinitionKind {
    /// Declared in a `task.yml` file
    #[default]
    Yaml,
    /// Synthesized from annotations in the executable's own comments
    Comment
}

/// Source file a task was declared in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionFile {
    pub path: PathBuf,
    pub kind: DefinitionKind
}

/// Script executed by a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutableFile {
    pub name: String,
    pub path: PathBuf
}

/// One unit of work in a pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Task {
    pub name:            String,
    pub task_type:       String,
    pub depends_on:      Vec<String>,
    pub executable_file: Option<ExecutableFile>,
    pub definition_file: DefinitionFile
}

impl Task {
    /// Whether the task was synthesized from source-file comments.
    pub fn is_comment_task(&self) -> bool {
        self.definition_file.kind == DefinitionKind::Comment
    }
}

/// A named, scheduled set of tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub name:            String,
    pub schedule:        String,
    pub tasks:           Vec<Arc<Task>>,
    pub definition_file: PathBuf
}

impl Pipeline {
    pub fn has_task(&self, name: &str) -> bool {
        self.tasks.iter().any(|t| t.name == name)
    }

    /// Tasks of the given type, in discovery order.
    pub fn tasks_of_type<'a>(&'a self, task_type: &'a str) -> impl Iterator<Item = &'a Arc<Task>> {
        self.tasks.iter().filter(move |t| t.task_type == task_type)
    }
}
