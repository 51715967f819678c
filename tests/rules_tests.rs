// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use std::{
    collections::{HashMap, HashSet},
    io,
    path::{Path, PathBuf},
    sync::Arc
};

use pipeline_lint::{
    fs::{FileStat, Filesystem},
    lint::{Issue, rules::*},
    pipeline::{DefinitionFile, DefinitionKind, ExecutableFile, Pipeline, Task}
};
use pretty_assertions::assert_eq;

fn task(name: &str, depends_on: &[&str]) -> Task {
    Task {
        name: name.into(),
        depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
        ..Default::default()
    }
}

fn pipeline(tasks: Vec<Task>) -> Pipeline {
    Pipeline {
        name: "pipeline".into(),
        tasks: tasks.into_iter().map(Arc::new).collect(),
        ..Default::default()
    }
}

fn descriptions(issues: &[Issue]) -> Vec<&str> {
    issues.iter().map(|i| i.description.as_str()).collect()
}

#[derive(Default)]
struct MockFilesystem {
    files: HashMap<PathBuf, FileStat>
}

impl MockFilesystem {
    fn with(mut self, path: &str, stat: FileStat) -> Self {
        self.files.insert(PathBuf::from(path), stat);
        self
    }
}

impl Filesystem for MockFilesystem {
    fn stat(&self, path: &Path) -> io::Result<Option<FileStat>> {
        Ok(self.files.get(path).copied())
    }

    fn read_to_string(&self, _path: &Path) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "not needed"))
    }
}

struct BrokenFilesystem;

impl Filesystem for BrokenFilesystem {
    fn stat(&self, _path: &Path) -> io::Result<Option<FileStat>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }

    fn read_to_string(&self, _path: &Path) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }
}

fn executable_task(name: &str, task_type: &str, path: &str) -> Task {
    Task {
        name: name.into(),
        task_type: task_type.into(),
        executable_file: Some(ExecutableFile {
            name: path.rsplit('/').next().unwrap_or(path).into(),
            path: PathBuf::from(path)
        }),
        ..Default::default()
    }
}

fn file(len: u64, executable: bool) -> FileStat {
    FileStat {
        is_dir: false,
        len,
        executable
    }
}

// ============================================================================
// Task names
// ============================================================================

#[test]
fn test_task_names_valid() {
    let p = pipeline(vec![task("task1", &[]), task("task-2_b", &[])]);
    assert!(ensure_task_name_is_valid(&p).unwrap().is_empty());
}

#[test]
fn test_task_name_missing_and_malformed() {
    let p = pipeline(vec![task("", &[]), task("task 1", &[]), task("ok", &[])]);
    let issues = ensure_task_name_is_valid(&p).unwrap();

    assert_eq!(
        descriptions(&issues),
        vec![TASK_NAME_MUST_EXIST, TASK_NAME_MUST_BE_ALPHANUMERIC]
    );
    assert_eq!(issues[1].task.as_ref().unwrap().name, "task 1");
}

#[test]
fn test_task_name_unique() {
    let mut tasks = Vec::new();
    for (name, path) in [("a", "p1"), ("b", "p2"), ("a", "p3")] {
        tasks.push(Task {
            name: name.into(),
            definition_file: DefinitionFile {
                path: PathBuf::from(path),
                kind: DefinitionKind::Yaml
            },
            ..Default::default()
        });
    }
    let issues = ensure_task_name_is_unique(&pipeline(tasks)).unwrap();

    assert_eq!(issues.len(), 1);
    let owner = issues[0].task.as_ref().unwrap();
    assert_eq!(owner.name, "a");
    assert_eq!(owner.definition_file.path, PathBuf::from("p1"));
    assert_eq!(issues[0].context, vec!["p1", "p3"]);
}

#[test]
fn test_task_name_unique_ignores_empty_names() {
    let p = pipeline(vec![task("", &[]), task("", &[]), task("x", &[])]);
    assert!(ensure_task_name_is_unique(&p).unwrap().is_empty());
}

#[test]
fn test_task_name_unique_is_case_sensitive() {
    let p = pipeline(vec![task("load", &[]), task("Load", &[])]);
    assert!(ensure_task_name_is_unique(&p).unwrap().is_empty());
}

// ============================================================================
// Dependencies
// ============================================================================

#[test]
fn test_dependency_exists() {
    let p = pipeline(vec![
        task("task1", &[]),
        task("task2", &["task1", "task3", "task5"]),
        task("task3", &[]),
    ]);
    let issues = ensure_dependency_exists(&p).unwrap();

    assert_eq!(descriptions(&issues), vec!["Dependency 'task5' does not exist"]);
    assert_eq!(issues[0].task.as_ref().unwrap().name, "task2");
}

#[test]
fn test_multiple_missing_dependencies_on_one_task() {
    let p = pipeline(vec![task("task1", &["x", "y"])]);
    assert_eq!(ensure_dependency_exists(&p).unwrap().len(), 2);
}

// ============================================================================
// Cycles
// ============================================================================

#[test]
fn test_no_cycles() {
    let p = pipeline(vec![
        task("task1", &[]),
        task("task2", &["task1"]),
        task("task3", &["task1", "task2"]),
    ]);
    assert!(ensure_pipeline_has_no_cycles(&p).unwrap().is_empty());
}

#[test]
fn test_self_loop_and_three_cycle() {
    let p = pipeline(vec![
        task("task1", &["task2"]),
        task("task2", &["task3"]),
        task("task3", &["task1"]),
        task("task4", &["task1"]),
        task("task5", &[]),
        task("task6", &["task6"]),
    ]);
    let issues = ensure_pipeline_has_no_cycles(&p).unwrap();
    assert_eq!(issues.len(), 2);

    let self_loop = &issues[0];
    assert_eq!(self_loop.description, PIPELINE_CONTAINS_CYCLE);
    assert!(self_loop.task.is_none());
    assert_eq!(self_loop.context, vec!["Task 'task6' depends on itself"]);

    let cycle = &issues[1];
    assert_eq!(cycle.description, PIPELINE_CONTAINS_CYCLE);
    assert!(cycle.task.is_none());
    let edges: HashSet<&str> = cycle.context.iter().map(String::as_str).collect();
    assert_eq!(
        edges,
        HashSet::from(["task1 -> task2", "task2 -> task3", "task3 -> task1"])
    );
}

#[test]
fn test_disjoint_cycles_are_all_reported() {
    let p = pipeline(vec![
        task("a", &["b"]),
        task("b", &["a"]),
        task("c", &["d"]),
        task("d", &["c"]),
    ]);
    let issues = ensure_pipeline_has_no_cycles(&p).unwrap();
    assert_eq!(issues.len(), 2);
    for issue in &issues {
        assert_eq!(issue.context.len(), 2);
    }
}

#[test]
fn test_cycle_through_unknown_dependency_is_ignored() {
    let p = pipeline(vec![task("a", &["ghost"])]);
    assert!(ensure_pipeline_has_no_cycles(&p).unwrap().is_empty());
}

// ============================================================================
// Pipeline attributes
// ============================================================================

#[test]
fn test_schedule_validity() {
    for schedule in ["", "* * * 1 *", "@daily", "0 */2 * * MON-FRI", "@every 1h30m"] {
        let p = Pipeline {
            schedule: schedule.into(),
            ..Default::default()
        };
        assert!(
            ensure_pipeline_schedule_is_valid_cron(&p).unwrap().is_empty(),
            "{schedule} should be valid"
        );
    }

    let p = Pipeline {
        schedule: "some random schedule".into(),
        ..Default::default()
    };
    let issues = ensure_pipeline_schedule_is_valid_cron(&p).unwrap();
    assert_eq!(
        descriptions(&issues),
        vec!["Invalid cron schedule 'some random schedule'"]
    );
    assert!(issues[0].task.is_none());
}

#[test]
fn test_pipeline_name() {
    let mut p = pipeline(vec![]);
    assert!(ensure_pipeline_name_is_valid(&p).unwrap().is_empty());

    p.name = String::new();
    assert_eq!(
        descriptions(&ensure_pipeline_name_is_valid(&p).unwrap()),
        vec![PIPELINE_NAME_CANNOT_BE_EMPTY]
    );

    p.name = "my pipeline!".into();
    assert_eq!(
        descriptions(&ensure_pipeline_name_is_valid(&p).unwrap()),
        vec![PIPELINE_NAME_MUST_BE_ALPHANUMERIC]
    );
}

#[test]
fn test_task_types() {
    let mut known = task("known", &[]);
    known.task_type = "bq.sql".into();
    let mut untyped = task("untyped", &[]);
    untyped.task_type = String::new();
    let mut unknown = task("unknown", &[]);
    unknown.task_type = "spark.job".into();

    let issues =
        ensure_only_accepted_task_types_are_there(&pipeline(vec![known, untyped, unknown]))
            .unwrap();
    assert_eq!(descriptions(&issues), vec!["Invalid task type 'spark.job'"]);
    assert_eq!(issues[0].task.as_ref().unwrap().name, "unknown");
}

// ============================================================================
// Executables
// ============================================================================

#[test]
fn test_executable_checks() {
    let fs = MockFilesystem::default()
        .with("ok.sql", file(10, true))
        .with("dir", FileStat {
            is_dir:     true,
            len:        0,
            executable: true
        })
        .with("empty.sql", file(0, true))
        .with("plain.sql", file(10, false))
        .with("empty-plain.sql", file(0, false));
    let check = ensure_executable_file_is_valid(Arc::new(fs));

    let cases = [
        ("ok.sql", vec![]),
        ("missing.sql", vec![EXECUTABLE_FILE_DOES_NOT_EXIST]),
        ("dir", vec![EXECUTABLE_FILE_IS_A_DIRECTORY]),
        ("empty.sql", vec![EXECUTABLE_FILE_IS_EMPTY]),
        ("plain.sql", vec![EXECUTABLE_FILE_IS_NOT_EXECUTABLE]),
        (
            "empty-plain.sql",
            vec![EXECUTABLE_FILE_IS_EMPTY, EXECUTABLE_FILE_IS_NOT_EXECUTABLE]
        ),
    ];
    for (path, expected) in cases {
        let p = pipeline(vec![executable_task("t", "bq.sql", path)]);
        let issues = check(&p).unwrap();
        assert_eq!(descriptions(&issues), expected, "{path}");
    }
}

#[test]
fn test_python_task_requires_executable() {
    let check = ensure_executable_file_is_valid(Arc::new(MockFilesystem::default()));
    let mut python = task("py", &[]);
    python.task_type = "python".into();
    let mut sql = task("sql", &[]);
    sql.task_type = "bq.sql".into();

    let issues = check(&pipeline(vec![python, sql])).unwrap();
    assert_eq!(descriptions(&issues), vec![EXECUTABLE_FILE_CANNOT_BE_EMPTY]);
    assert_eq!(issues[0].task.as_ref().unwrap().name, "py");
}

#[test]
fn test_comment_tasks_skip_executable_checks() {
    let check = ensure_executable_file_is_valid(Arc::new(MockFilesystem::default()));
    let mut comment = executable_task("c", "bq.sql", "missing.sql");
    comment.definition_file.kind = DefinitionKind::Comment;

    assert!(check(&pipeline(vec![comment])).unwrap().is_empty());
}

#[test]
fn test_filesystem_failure_is_fatal() {
    let check = ensure_executable_file_is_valid(Arc::new(BrokenFilesystem));
    let p = pipeline(vec![executable_task("t", "bash", "run.sh")]);
    assert!(check(&p).is_err());
}

#[cfg(unix)]
#[test]
fn test_executable_permissions_on_disk() {
    use std::{fs, os::unix::fs::PermissionsExt};

    use pipeline_lint::fs::OsFilesystem;

    let dir = tempfile::tempdir().unwrap();
    let empty = dir.path().join("empty.sh");
    fs::write(&empty, "").unwrap();
    fs::set_permissions(&empty, fs::Permissions::from_mode(0o755)).unwrap();
    let plain = dir.path().join("plain.sh");
    fs::write(&plain, "echo hi").unwrap();
    fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).unwrap();

    let check = ensure_executable_file_is_valid(Arc::new(OsFilesystem));
    let p = pipeline(vec![
        executable_task("empty", "bash", empty.to_str().unwrap()),
        executable_task("plain", "bash", plain.to_str().unwrap()),
    ]);
    let issues = check(&p).unwrap();

    assert_eq!(
        descriptions(&issues),
        vec![EXECUTABLE_FILE_IS_EMPTY, EXECUTABLE_FILE_IS_NOT_EXECUTABLE]
    );
    assert_eq!(issues[0].task.as_ref().unwrap().name, "empty");
    assert_eq!(issues[1].task.as_ref().unwrap().name, "plain");
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_rules_are_deterministic() {
    let p = pipeline(vec![
        task("a", &["b", "missing"]),
        task("b", &["c"]),
        task("c", &["a"]),
        task("a", &[]),
        task("bad name", &["bad name"]),
    ]);

    assert_eq!(
        ensure_pipeline_has_no_cycles(&p).unwrap(),
        ensure_pipeline_has_no_cycles(&p).unwrap()
    );
    assert_eq!(
        ensure_task_name_is_unique(&p).unwrap(),
        ensure_task_name_is_unique(&p).unwrap()
    );
    assert_eq!(
        ensure_dependency_exists(&p).unwrap(),
        ensure_dependency_exists(&p).unwrap()
    );
    assert_eq!(
        ensure_task_name_is_valid(&p).unwrap(),
        ensure_task_name_is_valid(&p).unwrap()
    );
}
