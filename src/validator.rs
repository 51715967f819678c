//! Dry-run validators for rendered SQL.
//!
//! A [`QueryValidator`] answers whether a rendered `EXPLAIN` script compiles
//! on the target warehouse. Live warehouse clients plug in behind the same
//! trait; [`ParserValidator`] is the offline implementation that checks the
//! script against the warehouse dialect's grammar.

use async_trait::async_trait;
use sqlparser::{
    dialect::{BigQueryDialect, Dialect, GenericDialect, SnowflakeDialect},
    parser::Parser
};

use crate::error::{AppResult, query_validation_error};

/// Warehouse dry-run capability.
///
/// `Ok(true)` means the statement compiles. `Ok(false)` or an error both mean
/// it does not; the error message should carry the warehouse diagnostic.
#[async_trait]
pub trait QueryValidator: Send + Sync {
    async fn is_valid(&self, query: &str) -> AppResult<bool>;
}

/// Warehouse SQL dialect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum WarehouseDialect {
    #[default]
    Generic,
    BigQuery,
    Snowflake
}

impl WarehouseDialect {
    /// Convert to sqlparser dialect for parsing
    pub fn into_parser_dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::BigQuery => Box::new(BigQueryDialect {}),
            Self::Snowflake => Box::new(SnowflakeDialect {})
        }
    }
}

impl std::fmt::Display for WarehouseDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::BigQuery => write!(f, "bigquery"),
            Self::Snowflake => write!(f, "snowflake")
        }
    }
}

/// Offline validator that parses the script with sqlparser.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserValidator {
    dialect: WarehouseDialect
}

impl ParserValidator {
    pub fn new(dialect: WarehouseDialect) -> Self {
        Self {
            dialect
        }
    }
}

#[async_trait]
impl QueryValidator for ParserValidator {
    async fn is_valid(&self, query: &str) -> AppResult<bool> {
        let dialect = self.dialect.into_parser_dialect();
        match Parser::parse_sql(dialect.as_ref(), query) {
            Ok(statements) => Ok(!statements.is_empty()),
            Err(e) => Err(query_validation_error(e.to_string()))
        }
    }
}
