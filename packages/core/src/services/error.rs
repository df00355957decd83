//! Service Layer Error Types
//!
//! Errors surfaced by page sessions and the page service. Inside a running
//! session most failures become state transitions and log lines; these types
//! are what callers see from the handle and from one-shot service calls.

use crate::codec::CodecError;
use crate::db::StoreError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// The identifier matched no page
    #[error("Page not found: {identifier}")]
    NotFound { identifier: String },

    /// Loading kept failing after every allowed attempt
    ///
    /// The cause is shared so the failure can also sit in session snapshots.
    #[error("Failed to load page after {attempts} attempt(s): {source}")]
    LoadFailed {
        attempts: u32,
        #[source]
        source: Arc<StoreError>,
    },

    /// The session actor is gone (closed, deleted or never loaded)
    #[error("Page session is closed")]
    SessionClosed,

    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Content encoding failed: {0}")]
    Codec(#[from] CodecError),
}

impl SessionError {
    pub fn not_found(identifier: impl ToString) -> Self {
        Self::NotFound {
            identifier: identifier.to_string(),
        }
    }

    pub fn load_failed(attempts: u32, source: StoreError) -> Self {
        Self::LoadFailed {
            attempts,
            source: Arc::new(source),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_load_failed_keeps_cause() {
        let err = SessionError::load_failed(3, StoreError::policy_recursion("pages policy"));
        assert_eq!(
            err.to_string(),
            "Failed to load page after 3 attempt(s): Transient backend error [42P17]: pages policy"
        );
        assert!(err.source().is_some());
    }
}
