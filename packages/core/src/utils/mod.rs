//! Utility functions for Folio Core
//!
//! This module provides helpers that sit beside the core layers.

mod markdown;

pub use markdown::document_to_markdown;
