//! # Pipeline Lint Library
//!
//! Static validation of data pipeline definitions: pipeline and task model,
//! structural rules, SQL statement extraction and dry-run query validation.

pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod lint;
pub mod logging;
pub mod output;
pub mod path;
pub mod pipeline;
pub mod query;
pub mod validator;
