//! Document Tree Model
//!
//! This module defines the canonical structured representation of a page's
//! content: a [`Document`] root holding an ordered tree of [`Node`]s.
//!
//! # Architecture
//!
//! - **Wire-shaped**: variant tags (`kind`), `attrs`, `children` and `marks` are
//!   exactly the persisted JSON shape, so the codec is a checked identity
//!   transform
//! - **Open attrs**: variant options live in a JSON object (`level`,
//!   `textAlign`, `checked`, ...) with typed accessors on [`Node`]
//! - **Validation gate**: [`is_valid_document`] is the single predicate every
//!   consumer runs on untrusted JSON before adopting it
//!
//! # Examples
//!
//! ```rust
//! use folio_core::models::{Document, Node};
//!
//! let doc = Document::new(vec![
//!     Node::heading(1, vec![Node::text("Meeting Notes")]),
//!     Node::paragraph_with_text("Agenda"),
//! ]);
//! assert!(doc.validate().is_ok());
//! assert_eq!(Document::empty().children, vec![Node::paragraph()]);
//! ```

use crate::models::NodePath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Tag carried by every document root
pub const DOC_KIND: &str = "doc";

/// Highest heading level the editor offers
pub const MAX_HEADING_LEVEL: u8 = 3;

/// Attribute key for heading levels
pub const ATTR_LEVEL: &str = "level";

/// Attribute key for block alignment
pub const ATTR_TEXT_ALIGN: &str = "textAlign";

/// Attribute key for task item state
pub const ATTR_CHECKED: &str = "checked";

/// Variant-specific node options
pub type Attrs = Map<String, Value>;

/// Structural invariant violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Document root must have kind 'doc', found {0}")]
    InvalidRootKind(String),

    #[error("Document children must be an array")]
    MissingChildren,

    #[error("Heading at {path} has level {level}, expected 1..={max}", max = MAX_HEADING_LEVEL)]
    InvalidHeadingLevel { path: String, level: i64 },

    #[error("Node '{kind}' at {path} must contain at least one child")]
    EmptyContainer { kind: String, path: String },

    #[error("Link mark at {path} has an empty href")]
    EmptyLinkHref { path: String },

    #[error("Node '{child}' at {path} is not allowed inside '{parent}'")]
    InvalidChild {
        parent: String,
        child: String,
        path: String,
    },

    #[error("Marks are only allowed on text nodes, found on '{kind}' at {path}")]
    MarksOnNonText { kind: String, path: String },

    #[error("Text node at {path} has no text")]
    MissingText { path: String },
}

/// Node variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    TaskList,
    TaskItem,
    Blockquote,
    CodeBlock,
    Section,
    Text,
}

impl NodeKind {
    /// Wire name of the variant
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::BulletList => "bulletList",
            Self::OrderedList => "orderedList",
            Self::ListItem => "listItem",
            Self::TaskList => "taskList",
            Self::TaskItem => "taskItem",
            Self::Blockquote => "blockquote",
            Self::CodeBlock => "codeBlock",
            Self::Section => "section",
            Self::Text => "text",
        }
    }

    /// Blocks whose children are inline text
    pub fn is_textblock(&self) -> bool {
        matches!(self, Self::Paragraph | Self::Heading | Self::CodeBlock)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::BulletList | Self::OrderedList | Self::TaskList)
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, Self::ListItem | Self::TaskItem)
    }

    /// Nodes that may appear wherever a block is expected
    pub fn is_block(&self) -> bool {
        !matches!(self, Self::Text | Self::ListItem | Self::TaskItem)
    }

    /// Wrappers that hold blocks and must never be empty
    pub fn requires_block_content(&self) -> bool {
        matches!(
            self,
            Self::Section | Self::ListItem | Self::TaskItem | Self::Blockquote
        )
    }

    /// Item variant a list holds, `None` for non-lists
    pub fn item_kind(&self) -> Option<NodeKind> {
        match self {
            Self::BulletList | Self::OrderedList => Some(Self::ListItem),
            Self::TaskList => Some(Self::TaskItem),
            _ => None,
        }
    }

    /// Whether alignment applies to this variant
    pub fn supports_alignment(&self) -> bool {
        matches!(self, Self::Paragraph | Self::Heading)
    }

    /// Whether inline marks are allowed inside this textblock
    pub fn allows_marks(&self) -> bool {
        matches!(self, Self::Paragraph | Self::Heading)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block alignment, mutually exclusive values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

impl FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(format!("Invalid alignment: {}", s)),
        }
    }
}

/// Inline decoration kinds without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkKind {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Link,
}

/// Inline text decoration
///
/// Serialized as `{"kind": "bold"}` or `{"kind": "link", "attrs": {"href": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "attrs", rename_all = "lowercase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Link { href: String },
}

impl Mark {
    pub fn kind(&self) -> MarkKind {
        match self {
            Self::Bold => MarkKind::Bold,
            Self::Italic => MarkKind::Italic,
            Self::Underline => MarkKind::Underline,
            Self::Strike => MarkKind::Strike,
            Self::Code => MarkKind::Code,
            Self::Link { .. } => MarkKind::Link,
        }
    }

    pub fn link(href: impl Into<String>) -> Self {
        Self::Link { href: href.into() }
    }
}

/// Insert `mark` into a mark set, replacing any mark of the same kind
///
/// Mark sets are kept sorted so equal sets compare equal.
pub fn add_mark(marks: &mut Vec<Mark>, mark: Mark) {
    marks.retain(|m| m.kind() != mark.kind());
    marks.push(mark);
    marks.sort();
}

/// Remove every mark of `kind` from a mark set
pub fn remove_mark(marks: &mut Vec<Mark>, kind: MarkKind) {
    marks.retain(|m| m.kind() != kind);
}

/// One element of the document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Attrs,

    /// Absent for leaves and for empty textblocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,

    /// Only meaningful on `text` nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,

    /// Inline content of `text` nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Node {
    /// Bare node of the given kind with no attrs or children
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Attrs::new(),
            children: None,
            marks: Vec::new(),
            text: None,
        }
    }

    /// Node wrapping `children`
    pub fn with_children(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            children: Some(children),
            ..Self::new(kind)
        }
    }

    /// Empty paragraph, the canonical insertion point
    pub fn paragraph() -> Self {
        Self::new(NodeKind::Paragraph)
    }

    pub fn paragraph_with(inline: Vec<Node>) -> Self {
        if inline.is_empty() {
            return Self::paragraph();
        }
        Self::with_children(NodeKind::Paragraph, inline)
    }

    pub fn paragraph_with_text(text: &str) -> Self {
        Self::paragraph_with(vec![Self::text(text)])
    }

    pub fn heading(level: u8, inline: Vec<Node>) -> Self {
        let mut node = if inline.is_empty() {
            Self::new(NodeKind::Heading)
        } else {
            Self::with_children(NodeKind::Heading, inline)
        };
        node.attrs.insert(ATTR_LEVEL.to_string(), Value::from(level));
        node
    }

    pub fn code_block(code: &str) -> Self {
        if code.is_empty() {
            return Self::new(NodeKind::CodeBlock);
        }
        Self::with_children(NodeKind::CodeBlock, vec![Self::text(code)])
    }

    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::new(NodeKind::Text)
        }
    }

    pub fn text_with_marks(text: &str, mut marks: Vec<Mark>) -> Self {
        marks.sort();
        marks.dedup();
        Self {
            marks,
            ..Self::text(text)
        }
    }

    /// Section holding one empty paragraph
    pub fn section() -> Self {
        Self::with_children(NodeKind::Section, vec![Self::paragraph()])
    }

    pub fn list_item(blocks: Vec<Node>) -> Self {
        Self::with_children(NodeKind::ListItem, blocks)
    }

    pub fn task_item(checked: bool, blocks: Vec<Node>) -> Self {
        let mut node = Self::with_children(NodeKind::TaskItem, blocks);
        node.attrs
            .insert(ATTR_CHECKED.to_string(), Value::Bool(checked));
        node
    }

    /// Child nodes, empty for leaves
    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Mutable child list, created on demand
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        self.children.get_or_insert_with(Vec::new)
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Heading level if this is a heading with a numeric level
    pub fn heading_level(&self) -> Option<u8> {
        if self.kind != NodeKind::Heading {
            return None;
        }
        self.attrs
            .get(ATTR_LEVEL)
            .and_then(Value::as_u64)
            .and_then(|level| u8::try_from(level).ok())
    }

    pub fn alignment(&self) -> Option<Alignment> {
        self.attrs
            .get(ATTR_TEXT_ALIGN)
            .and_then(Value::as_str)
            .and_then(|value| value.parse().ok())
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.attrs.insert(
            ATTR_TEXT_ALIGN.to_string(),
            Value::String(alignment.as_str().to_string()),
        );
    }

    /// Task item state, `false` when unset
    pub fn is_checked(&self) -> bool {
        self.attrs
            .get(ATTR_CHECKED)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn has_mark(&self, kind: MarkKind) -> bool {
        self.marks.iter().any(|mark| mark.kind() == kind)
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }

    /// Length of the inline text in characters
    pub fn text_len(&self) -> usize {
        match &self.text {
            Some(text) => text.chars().count(),
            None => self.children().iter().map(Node::text_len).sum(),
        }
    }

    pub fn is_empty_paragraph(&self) -> bool {
        self.kind == NodeKind::Paragraph && self.text_len() == 0
    }

    fn validate_at(&self, path: &NodePath) -> Result<(), ValidationError> {
        let location = path.to_string();

        if self.kind != NodeKind::Text && !self.marks.is_empty() {
            return Err(ValidationError::MarksOnNonText {
                kind: self.kind.to_string(),
                path: location,
            });
        }

        match self.kind {
            NodeKind::Text => {
                if self.text.is_none() {
                    return Err(ValidationError::MissingText { path: location });
                }
                for mark in &self.marks {
                    if let Mark::Link { href } = mark {
                        if href.trim().is_empty() {
                            return Err(ValidationError::EmptyLinkHref { path: location });
                        }
                    }
                }
                return Ok(());
            }
            NodeKind::Heading => {
                let level = self.attrs.get(ATTR_LEVEL).and_then(Value::as_i64).unwrap_or(0);
                if !(1..=i64::from(MAX_HEADING_LEVEL)).contains(&level) {
                    return Err(ValidationError::InvalidHeadingLevel {
                        path: location,
                        level,
                    });
                }
            }
            _ => {}
        }

        if (self.kind.requires_block_content() || self.kind.is_list()) && self.child_count() == 0 {
            return Err(ValidationError::EmptyContainer {
                kind: self.kind.to_string(),
                path: location,
            });
        }

        for (index, child) in self.children().iter().enumerate() {
            let allowed = if self.kind.is_textblock() {
                child.kind == NodeKind::Text
            } else if let Some(item_kind) = self.kind.item_kind() {
                child.kind == item_kind
            } else {
                child.kind.is_block()
            };
            let child_path = path.child(index);
            if !allowed {
                return Err(ValidationError::InvalidChild {
                    parent: self.kind.to_string(),
                    child: child.kind.to_string(),
                    path: child_path.to_string(),
                });
            }
            child.validate_at(&child_path)?;
        }

        Ok(())
    }

    fn normalize_in_place(&mut self) {
        if self.kind != NodeKind::Text {
            self.marks.clear();
        }

        match self.kind {
            NodeKind::Text => {
                self.marks.retain(|mark| match mark {
                    Mark::Link { href } => !href.trim().is_empty(),
                    _ => true,
                });
                self.marks.sort();
                self.marks.dedup();
                return;
            }
            NodeKind::Heading => {
                let level = self
                    .attrs
                    .get(ATTR_LEVEL)
                    .and_then(Value::as_i64)
                    .unwrap_or(1)
                    .clamp(1, i64::from(MAX_HEADING_LEVEL));
                self.attrs.insert(ATTR_LEVEL.to_string(), Value::from(level));
            }
            _ => {}
        }

        if self.kind.is_textblock() {
            let inline = self.children.take().unwrap_or_default();
            let merged = merge_inline(inline, self.kind == NodeKind::CodeBlock);
            self.children = if merged.is_empty() { None } else { Some(merged) };
            return;
        }

        for child in self.children_mut() {
            child.normalize_in_place();
        }

        if self.kind.requires_block_content() && self.child_count() == 0 {
            self.children_mut().push(Node::paragraph());
        }

        if let Some(item_kind) = self.kind.item_kind() {
            if self.child_count() == 0 {
                let item = Node::with_children(item_kind, vec![Node::paragraph()]);
                self.children_mut().push(item);
            }
        }
    }
}

/// Merge adjacent text nodes with equal mark sets and drop empty ones
///
/// With `strip_marks` every mark is removed first (code blocks hold plain text).
pub fn merge_inline(inline: Vec<Node>, strip_marks: bool) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(inline.len());
    for mut node in inline {
        if node.kind != NodeKind::Text {
            continue;
        }
        if strip_marks {
            node.marks.clear();
        }
        node.normalize_in_place();
        let text = node.text.clone().unwrap_or_default();
        if text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(previous) if previous.marks == node.marks => {
                previous.text.get_or_insert_with(String::new).push_str(&text);
            }
            _ => merged.push(node),
        }
    }
    merged
}

/// Document root tag, always `"doc"` on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    #[default]
    #[serde(rename = "doc")]
    Doc,
}

/// Root structured-content value for one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub kind: DocumentKind,
    pub children: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            kind: DocumentKind::Doc,
            children,
        }
    }

    /// Canonical empty document: `{kind: "doc", children: [{kind: "paragraph"}]}`
    pub fn empty() -> Self {
        Self::new(vec![Node::paragraph()])
    }

    /// Node at `path`, `None` for the root or an out-of-range path
    pub fn node_at(&self, path: &NodePath) -> Option<&Node> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = self.children.get(*first)?;
        for index in rest {
            node = node.children.as_ref()?.get(*index)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for index in rest {
            node = node.children.as_mut()?.get_mut(*index)?;
        }
        Some(node)
    }

    /// Child list of the container at `path` (the root's children for `/`)
    pub fn children_at(&self, path: &NodePath) -> Option<&[Node]> {
        if path.is_root() {
            return Some(&self.children);
        }
        self.node_at(path).map(Node::children)
    }

    pub fn children_at_mut(&mut self, path: &NodePath) -> Option<&mut Vec<Node>> {
        if path.is_root() {
            return Some(&mut self.children);
        }
        self.node_at_mut(path).map(Node::children_mut)
    }

    /// Paths of every textblock in document order
    pub fn textblock_paths(&self) -> Vec<NodePath> {
        let mut paths = Vec::new();
        for (index, child) in self.children.iter().enumerate() {
            collect_textblocks(child, NodePath::new(vec![index]), &mut paths);
        }
        paths
    }

    /// Check every structural invariant of the tree
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, child) in self.children.iter().enumerate() {
            let path = NodePath::new(vec![index]);
            if !child.kind.is_block() {
                return Err(ValidationError::InvalidChild {
                    parent: DOC_KIND.to_string(),
                    child: child.kind.to_string(),
                    path: path.to_string(),
                });
            }
            child.validate_at(&path)?;
        }
        Ok(())
    }

    /// Repair the editor invariants in place
    ///
    /// Empty wrappers receive an empty paragraph, heading levels are clamped
    /// into range, empty links are dropped and adjacent text with equal marks
    /// is merged. A document that already validates is left unchanged.
    pub fn normalize(&mut self) {
        for child in &mut self.children {
            child.normalize_in_place();
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Plain text of the whole document, one line per textblock
    pub fn plain_text(&self) -> String {
        self.textblock_paths()
            .iter()
            .filter_map(|path| self.node_at(path))
            .map(Node::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn collect_textblocks(node: &Node, path: NodePath, out: &mut Vec<NodePath>) {
    if node.kind.is_textblock() {
        out.push(path);
        return;
    }
    for (index, child) in node.children().iter().enumerate() {
        collect_textblocks(child, path.child(index), out);
    }
}

/// Validity predicate for untrusted document JSON
///
/// A candidate is a document iff it is an object with `kind == "doc"` and a
/// `children` array (possibly empty). Consumers that fail this check must
/// substitute [`Document::empty`].
pub fn is_valid_document(candidate: &Value) -> bool {
    candidate.get("kind").and_then(Value::as_str) == Some(DOC_KIND)
        && candidate.get("children").is_some_and(Value::is_array)
}

#[cfg(test)]
#[path = "document_test.rs"]
mod document_test;
