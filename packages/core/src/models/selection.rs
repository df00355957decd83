//! Selection Context
//!
//! Addresses positions inside a [`Document`](crate::models::Document) the way a
//! live editor does: a [`NodePath`] of child indices from the document root down
//! to a textblock (paragraph, heading or code block), plus a character offset
//! into that textblock's inline text.
//!
//! Textblocks never contain other textblocks, so the lexicographic order of
//! their paths is also their document order. Commands rely on this to walk the
//! blocks between the two ends of a range selection.

use crate::models::Document;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Child-index path from the document root to a node
///
/// The empty path addresses the document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// Path of the document root
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the containing node, `None` for the root
    pub fn parent(&self) -> Option<NodePath> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    /// Index of this node within its parent
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn child(&self, index: usize) -> NodePath {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// First `depth` indices of this path
    pub fn prefix(&self, depth: usize) -> NodePath {
        Self(self.0[..depth.min(self.0.len())].to_vec())
    }

    pub fn starts_with(&self, other: &NodePath) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// A caret location: textblock path plus character offset into its text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub path: NodePath,
    pub offset: usize,
}

impl Position {
    pub fn new(path: impl Into<NodePath>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

/// Current selection: `anchor` is where it started, `head` where the caret is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
}

impl Selection {
    /// Collapsed selection (a plain caret)
    pub fn cursor(path: impl Into<NodePath>, offset: usize) -> Self {
        let position = Position::new(path, offset);
        Self {
            anchor: position.clone(),
            head: position,
        }
    }

    pub fn range(anchor: Position, head: Position) -> Self {
        Self { anchor, head }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Both ends in document order
    pub fn ordered(&self) -> (&Position, &Position) {
        if self.anchor <= self.head {
            (&self.anchor, &self.head)
        } else {
            (&self.head, &self.anchor)
        }
    }
}

/// Live editor state: the document plus runtime-only selection data
///
/// Only `document` is persisted; the selection never reaches the wire format.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditorState {
    pub document: Document,
    pub selection: Option<Selection>,
}

impl EditorState {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            selection: None,
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parent_and_child() {
        let path = NodePath::new(vec![2, 0, 1]);
        assert_eq!(path.parent(), Some(NodePath::new(vec![2, 0])));
        assert_eq!(path.last(), Some(1));
        assert_eq!(path.child(4), NodePath::new(vec![2, 0, 1, 4]));
        assert_eq!(NodePath::root().parent(), None);
        assert_eq!(path.to_string(), "/2/0/1");
        assert_eq!(NodePath::root().to_string(), "/");
    }

    #[test]
    fn test_path_order_matches_document_order() {
        let first = NodePath::new(vec![0, 3]);
        let second = NodePath::new(vec![1]);
        let third = NodePath::new(vec![1, 0, 0]);
        assert!(first < second);
        assert!(second < third);
    }

    #[test]
    fn test_selection_ordered_swaps_backwards_range() {
        let selection = Selection::range(Position::new(vec![2], 1), Position::new(vec![0], 4));
        let (from, to) = selection.ordered();
        assert_eq!(from.path, NodePath::new(vec![0]));
        assert_eq!(to.path, NodePath::new(vec![2]));
        assert!(!selection.is_collapsed());
        assert!(Selection::cursor(vec![0], 0).is_collapsed());
    }
}
