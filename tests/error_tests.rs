// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use pipeline_lint::error::{
    build_task_error, config_error, file_read_error, filesystem_error, pipeline_build_error,
    query_validation_error, rule_error
};

#[test]
fn test_file_read_error() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error = file_read_error("/path/to/pipeline.yml", io_error);
    let _msg = error.to_string();
}

#[test]
fn test_config_error() {
    let error = config_error("Invalid configuration");
    let _msg = error.to_string();
}

#[test]
fn test_pipeline_build_error() {
    let error = pipeline_build_error("pipeline.yml", "missing field `name`");
    let _msg = error.to_string();
}

#[test]
fn test_pipeline_build_error_with_position() {
    let error = pipeline_build_error("task.yml", "invalid type: sequence at line 3 column 7");
    let _msg = error.to_string();
}

#[test]
fn test_build_task_error() {
    let error = build_task_error("task 7 panicked");
    assert!(!error.to_string().is_empty());
}

#[test]
fn test_filesystem_error() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error = filesystem_error("tasks/run.sh", io_error);
    let _msg = error.to_string();
}

#[test]
fn test_rule_error() {
    let error = rule_error("bigquery-query-validator", "all workers stopped");
    let _msg = error.to_string();
}

#[test]
fn test_query_validation_error() {
    let error = query_validation_error("Syntax error at position 7");
    let _msg = error.to_string();
}

#[test]
fn test_error_display_not_empty() {
    let config_err = config_error("test");
    assert!(!config_err.to_string().is_empty());

    let build_err = pipeline_build_error("p.yml", "test");
    assert!(!build_err.to_string().is_empty());
}
