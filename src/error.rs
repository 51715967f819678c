pub use masterror::{AppError, AppResult};

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Create pipeline build error for a definition file that cannot be turned
/// into a pipeline graph
pub fn pipeline_build_error(path: &str, message: impl Into<String>) -> AppError {
    AppError::bad_request(format_yaml_error(path, &message.into()))
}

/// Create error for a pipeline build task that panicked or was cancelled
pub fn build_task_error(message: impl Into<String>) -> AppError {
    AppError::internal(format!("Pipeline build task failed: {}", message.into()))
}

/// Create filesystem error raised while a structural rule inspects a file
pub fn filesystem_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to inspect '{}': {}", path, source))
}

/// Create rule error for contract violations inside a rule
pub fn rule_error(rule: &str, message: impl Into<String>) -> AppError {
    AppError::internal(format!("Rule '{}' failed: {}", rule, message.into()))
}

/// Create query validation error carrying the warehouse diagnostic
pub fn query_validation_error(message: impl Into<String>) -> AppError {
    AppError::service(message.into())
}

/// Format YAML error with position highlighting
fn format_yaml_error(path: &str, message: &str) -> String {
    // serde_yaml format: "... at line X column Y"
    if let Some(pos) = extract_position(message) {
        format!(
            "Invalid definition '{}' at line {}, column {}:\n  {}",
            path, pos.line, pos.column, message
        )
    } else {
        format!("Invalid definition '{}':\n  {}", path, message)
    }
}

struct YamlPosition {
    line:   usize,
    column: usize
}

fn extract_position(message: &str) -> Option<YamlPosition> {
    let line_marker = "line ";
    let col_marker = " column ";

    let line_start = message.rfind(line_marker)?;
    let line_num_start = line_start + line_marker.len();
    let col_start = message[line_num_start..].find(col_marker)?;
    let line_str = &message[line_num_start..line_num_start + col_start];
    let col_num_start = line_num_start + col_start + col_marker.len();

    let col_end = message[col_num_start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(message.len() - col_num_start);
    let col_str = &message[col_num_start..col_num_start + col_end];

    match (line_str.parse(), col_str.parse()) {
        (Ok(line), Ok(column)) => Some(YamlPosition { line, column }),
        _ => None
    }
}
