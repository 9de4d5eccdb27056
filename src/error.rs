//! Error types for tql.

use thiserror::Error;

/// The main error type for tql operations.
#[derive(Debug, Error)]
pub enum TqlError {
    /// A clause slot was filled twice on the same query.
    #[error("Cannot apply {clause} to query because it already has one")]
    ClauseAlreadySet { clause: &'static str },

    /// An expression references a table outside the query's relation.
    #[error(
        "Cannot apply {clause} to query because the expression contains a table not in the query: {table}"
    )]
    TableNotInScope { clause: &'static str, table: String },

    /// HAVING requires a GROUP BY.
    #[error("Cannot apply having to query without a group by")]
    HavingWithoutGroupBy,

    /// Invalid ON/USING constraint on a join.
    #[error("Invalid join constraint: {0}")]
    InvalidJoinConstraint(String),

    /// LIMIT or OFFSET above what SQLite accepts.
    #[error("Cannot apply {clause} of {value}: the largest accepted value is {max}", max = i64::MAX)]
    LimitOutOfRange { clause: &'static str, value: u64 },

    /// Union operand carries ORDER BY or LIMIT.
    #[error("Invalid union: {0}")]
    InvalidUnion(String),

    /// Requested value type does not match the column's declared type.
    #[error("Column {table}.{column} is declared {declared} but was requested as {expected}")]
    TypeMismatch {
        table: String,
        column: String,
        expected: &'static str,
        declared: &'static str,
    },

    /// Table is not in the database.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Column is not in the table.
    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },

    /// Statement failed to prepare.
    #[error("Failed to prepare statement \"{sql}\": {source}")]
    Prepare {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A bind call failed for a parameter position.
    #[error("Failed to bind parameter ?{index}: {source}")]
    Bind {
        index: usize,
        #[source]
        source: rusqlite::Error,
    },

    /// Step returned something other than a row or done.
    #[error("Failed to step statement \"{sql}\": {source}")]
    Step {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Select one found no row.
    #[error("Select returned no result")]
    NoResult,

    /// Select one found more than one row.
    #[error("More than one result returned")]
    MultipleResults,

    /// Fixed-size blob column has the wrong length.
    #[error("Size of data ({actual}) does not match size of object ({expected})")]
    BlobSize { expected: usize, actual: usize },

    /// Variable-size blob column is not a whole number of elements.
    #[error("Size of data ({size}) is not a multiple of size of object ({element})")]
    BlobAlignment { size: usize, element: usize },

    /// Column value could not be converted to the requested type.
    #[error("Cannot decode column {column}: {message}")]
    Decode { column: usize, message: String },

    /// Value row length differs from the statement's column list.
    #[error("Expected {expected} values but got {got}")]
    ArityMismatch { expected: usize, got: usize },

    /// Failed to parse a filter or order expression.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other engine error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TqlError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn decode(column: usize, message: impl Into<String>) -> Self {
        Self::Decode {
            column,
            message: message.into(),
        }
    }

    /// The SQLite result code behind this error, if it came from the engine.
    pub fn sqlite_code(&self) -> Option<rusqlite::ErrorCode> {
        let source = match self {
            Self::Prepare { source, .. }
            | Self::Bind { source, .. }
            | Self::Step { source, .. }
            | Self::Database(source) => source,
            _ => return None,
        };
        source.sqlite_error_code()
    }

    /// True for errors raised while building a query, before any engine call.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Self::ClauseAlreadySet { .. }
                | Self::TableNotInScope { .. }
                | Self::HavingWithoutGroupBy
                | Self::InvalidJoinConstraint(_)
                | Self::InvalidUnion(_)
                | Self::LimitOutOfRange { .. }
                | Self::TypeMismatch { .. }
        )
    }
}

/// Result type alias for tql operations.
pub type TqlResult<T> = Result<T, TqlError>;
