//! Database Error Types
//!
//! Errors raised by the libsql-backed page store: opening the database file,
//! creating the schema, running statements and decoding rows.

use std::path::PathBuf;
use thiserror::Error;

/// libsql page store errors
///
/// Storage-interface failures (not found, transient, conflict) live in
/// [`StoreError`](crate::db::StoreError); this enum only covers the database
/// machinery underneath.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open the database file
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to create the pages schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Failed to create the parent directory of the database file
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A stored row could not be turned back into a page
    #[error("Invalid row in '{table}': {reason}")]
    InvalidRow { table: String, reason: String },
}

impl DatabaseError {
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    pub fn invalid_row(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRow {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Unique index violation reported by SQLite
    pub fn is_unique_violation(&self) -> bool {
        self.to_string().contains("UNIQUE constraint failed")
    }
}
