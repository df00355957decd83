//! Data Models
//!
//! This module contains the core data structures used throughout Folio:
//!
//! - `Document` / `Node` / `Mark` - The structured page content tree
//! - `Selection` / `EditorState` - Runtime-only caret and range data
//! - `Page` - The persisted page record and its update payloads
//!
//! The document tree is wire-shaped: its serde form is exactly the JSON that
//! is persisted in a page's `content` field.

mod document;
mod page;
mod selection;

pub use document::{
    add_mark, is_valid_document, merge_inline, remove_mark, Alignment, Attrs, Document,
    DocumentKind, Mark, MarkKind, Node, NodeKind, ValidationError, ATTR_CHECKED, ATTR_LEVEL,
    ATTR_TEXT_ALIGN, DOC_KIND, MAX_HEADING_LEVEL,
};
pub use page::{generate_slug, NewPage, Page, PageIdentifier, PageUpdate, DEFAULT_PAGE_TITLE};
pub use selection::{EditorState, NodePath, Position, Selection};
