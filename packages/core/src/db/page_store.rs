//! PageStore Trait - Storage Interface
//!
//! The narrow persistence contract the page session depends on. Backends
//! (in-memory, libsql, or a remote service client) implement it; the session
//! never knows which one it talks to.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: every call may cross a network or hit disk
//! 2. **Typed failures**: [`StoreError`] separates "nothing there", retryable
//!    backend hiccups and hard failures, since the session reacts to each
//!    differently
//! 3. **Stateless**: no client-side transactions or locks; the backend
//!    decides last-writer-wins at the row level
//! 4. **Optional realtime**: `subscribe_to_changes` may return `None`, in
//!    which case consumers refresh manually

use crate::db::{DatabaseError, PageSubscription};
use crate::models::{NewPage, Page, PageIdentifier, PageUpdate};
use async_trait::async_trait;
use thiserror::Error;

/// Backend error code for row-level policy recursion
///
/// This is the canonical transient condition: the policy evaluation races a
/// concurrent session bootstrap and succeeds when retried.
pub const POLICY_RECURSION_CODE: &str = "42P17";

/// Storage interface failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Page not found: {0}")]
    NotFound(String),

    /// Retryable backend error (only ever retried on load)
    #[error("Transient backend error [{code}]: {message}")]
    Transient { code: String, message: String },

    /// Write rejected by a uniqueness rule (per-owner slug)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend failure: {0}")]
    Fatal(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl StoreError {
    pub fn not_found(identifier: impl ToString) -> Self {
        Self::NotFound(identifier.to_string())
    }

    pub fn transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The policy-recursion error class
    pub fn policy_recursion(message: impl Into<String>) -> Self {
        Self::transient(POLICY_RECURSION_CODE, message)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Classify a backend error code, keeping unknown codes fatal
    pub fn from_backend_code(code: &str, message: impl Into<String>) -> Self {
        if code == POLICY_RECURSION_CODE {
            Self::transient(code, message)
        } else {
            Self::Fatal(format!("[{}] {}", code, message.into()))
        }
    }
}

/// Persistence contract consumed by page sessions
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Fetch a page by id or slug
    ///
    /// # Errors
    ///
    /// - `NotFound` when no page matches
    /// - `Transient` for retryable backend conditions
    async fn load_page(&self, identifier: &PageIdentifier) -> Result<Page, StoreError>;

    /// Apply a partial update and return the stored page
    async fn save_page(&self, id: &str, update: PageUpdate) -> Result<Page, StoreError>;

    /// Insert a page; fails with `Conflict` if the owner already uses the slug
    async fn create_page(&self, new_page: NewPage) -> Result<Page, StoreError>;

    /// Delete a page and, by cascade, its sub-pages
    async fn delete_page(&self, id: &str) -> Result<(), StoreError>;

    /// All pages of an owner, most recently updated first
    async fn list_pages(&self, owner_id: &str) -> Result<Vec<Page>, StoreError>;

    /// Realtime change feed for an owner, `None` if unsupported
    fn subscribe_to_changes(&self, owner_id: &str) -> Option<PageSubscription>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_policy_recursion_is_transient() {
        assert!(StoreError::from_backend_code("42P17", "infinite recursion").is_transient());
        assert!(!StoreError::from_backend_code("57014", "statement timeout").is_transient());
        assert!(!StoreError::fatal("502 bad gateway").is_transient());
        assert!(StoreError::not_found("slug:x").is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::policy_recursion("policy for pages");
        assert_eq!(
            err.to_string(),
            "Transient backend error [42P17]: policy for pages"
        );
    }
}
