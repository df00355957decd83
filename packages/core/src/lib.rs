//! Folio Core - Page Editor Logic
//!
//! This crate provides the document model, editing commands, serialization
//! and persistence reconciliation behind the Folio page editor.
//!
//! # Architecture
//!
//! - **Typed document tree**: every page body is a [`Document`] of tagged
//!   [`Node`]s; the JSON tags double as the storage format
//! - **Pure commands**: editing commands map `(Document, Selection)` to a new
//!   document and never fail
//! - **Lenient decoding**: malformed stored content degrades to the empty
//!   document instead of erroring
//! - **Actor sessions**: each open page is a [`PageSession`] that debounces
//!   saves and slug changes against an injected [`PageStore`]
//!
//! # Modules
//!
//! - [`models`] - Document tree, selections and page records
//! - [`operations`] - Editor commands and the slash-command palette
//! - [`codec`] - Document <-> persisted JSON
//! - [`db`] - Storage interface with in-memory and libsql backends
//! - [`services`] - Page sessions, loading and page management
//! - [`utils`] - Markdown export

pub mod codec;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod operations;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use codec::CodecError;
pub use config::SessionConfig;
pub use db::{LibsqlPageStore, MemoryPageStore, PageStore, StoreError};
pub use models::*;
pub use operations::{CommandPalette, CommandResult, EditorCommand};
pub use services::*;
