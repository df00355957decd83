//! Database Layer
//!
//! This module holds the storage interface the page session consumes and the
//! backends that implement it:
//!
//! - [`PageStore`] - async persistence contract with a typed [`StoreError`]
//! - [`MemoryPageStore`] - in-process store for tests and embedding hosts
//! - [`LibsqlPageStore`] - local SQLite persistence through libsql
//! - [`PageChange`] / [`PageSubscription`] - realtime change feed per owner
//!
//! # Architecture
//!
//! The session treats the store as a stateless client: no client-side
//! transactions or locks. Ordering and last-writer-wins are the backend's job.

mod error;
pub mod events;
mod libsql_store;
mod memory_store;
mod page_store;

pub use error::DatabaseError;
pub use events::{PageChange, PageChangeHandler, PageSubscription, PAGE_CHANGE_CHANNEL_CAPACITY};
pub use libsql_store::LibsqlPageStore;
pub use memory_store::MemoryPageStore;
pub use page_store::{PageStore, StoreError, POLICY_RECURSION_CODE};
