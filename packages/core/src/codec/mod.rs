//! Serialization Codec
//!
//! Converts between the live [`Document`] and the persisted JSON tree.
//!
//! - `encode` is an identity transform: the model's tags and attrs are the
//!   wire format. Runtime-only data (the selection carried by
//!   [`EditorState`]) never reaches the output.
//! - `decode` runs the validity gate ([`is_valid_document`]) and then a typed
//!   parse. Any failure yields [`Document::empty`]; decoding never errors.
//!   Unknown fields on nodes are dropped by the typed parse.
//!
//! For every valid document `d`, `decode(&encode(&d)?) == d`.

use crate::models::{is_valid_document, Document, EditorState};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed document: {reason}")]
    Malformed { reason: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CodecError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Document to persisted JSON
pub fn encode(document: &Document) -> Result<Value, CodecError> {
    Ok(serde_json::to_value(document)?)
}

/// Persisted JSON for a live editor state, dropping the selection
pub fn encode_state(state: &EditorState) -> Result<Value, CodecError> {
    encode(&state.document)
}

/// Compact JSON text, as stored in a page's `content` column
pub fn encode_to_string(document: &Document) -> Result<String, CodecError> {
    Ok(serde_json::to_string(document)?)
}

/// Strict decode that reports why a candidate was rejected
pub fn try_decode(candidate: &Value) -> Result<Document, CodecError> {
    if !is_valid_document(candidate) {
        return Err(CodecError::malformed(
            "expected an object with kind \"doc\" and a children array",
        ));
    }
    Document::deserialize(candidate).map_err(|e| CodecError::malformed(e.to_string()))
}

/// Lenient decode: malformed input degrades to the canonical empty document
pub fn decode(candidate: &Value) -> Document {
    match try_decode(candidate) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Substituting empty document for malformed content: {}", e);
            Document::empty()
        }
    }
}

/// Lenient decode from JSON text
pub fn decode_str(json: &str) -> Document {
    match serde_json::from_str::<Value>(json) {
        Ok(value) => decode(&value),
        Err(e) => {
            tracing::warn!("Substituting empty document for unparseable content: {}", e);
            Document::empty()
        }
    }
}
