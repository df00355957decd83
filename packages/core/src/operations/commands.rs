//! Editor Commands
//!
//! Named edit operations that transform a [`Document`] under a selection.
//! Every command is a pure function of `(document, selection)`: the input is
//! never mutated and an invalid selection yields the document unchanged with
//! `applied == false`. Commands never panic and never return errors.
//!
//! # Block toggles
//!
//! Heading, list, blockquote and code block toggles work on *units*: the
//! direct children of the innermost container that holds the selection.
//! Sections always count as containers; blockquotes do too, except for the
//! blockquote toggle itself. A list unit is split at item boundaries so only
//! the selected items take part. If every unit already has the requested shape
//! the toggle unwraps one level. Otherwise the conflicting wrapping is cleared
//! and the new shape is applied: lists, headings and code blocks clear down to
//! paragraphs, while a blockquote wraps its units as they are. Applying the
//! same toggle twice returns the prior state. Sections are opaque to toggles
//! and stay in place.
//!
//! # Marks
//!
//! Mark toggles split text nodes at the selection boundaries. A toggle removes
//! the mark when every selected character already carries it and adds it
//! otherwise. Code blocks hold plain text and are skipped.

use crate::models::{
    add_mark, merge_inline, remove_mark, Alignment, Document, Mark, MarkKind, Node, NodeKind,
    NodePath, Position, Selection, ATTR_LEVEL, ATTR_TEXT_ALIGN, MAX_HEADING_LEVEL,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::ops::Range;

/// Edit operation catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum EditorCommand {
    SetHeading { level: u8 },
    ToggleBulletList,
    ToggleOrderedList,
    ToggleBlockquote,
    ToggleCodeBlock,
    ToggleTaskList,
    /// Insert a section holding one empty paragraph after the caret's block
    InsertSection,
    /// Toggle an inline mark; links go through [`EditorCommand::SetLink`]
    ToggleMark { mark: MarkKind },
    /// Set or replace the link on the selection, `None`/empty removes it
    SetLink { href: Option<String> },
    SetTextAlign { alignment: Alignment },
}

impl EditorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetHeading { .. } => "setHeading",
            Self::ToggleBulletList => "toggleBulletList",
            Self::ToggleOrderedList => "toggleOrderedList",
            Self::ToggleBlockquote => "toggleBlockquote",
            Self::ToggleCodeBlock => "toggleCodeBlock",
            Self::ToggleTaskList => "toggleTaskList",
            Self::InsertSection => "insertSection",
            Self::ToggleMark { .. } => "toggleMark",
            Self::SetLink { .. } => "setLink",
            Self::SetTextAlign { .. } => "setTextAlign",
        }
    }

    /// Apply this command to `document` under `selection`
    pub fn apply(&self, document: &Document, selection: Option<&Selection>) -> CommandResult {
        let Some(selection) = selection else {
            tracing::debug!("{} ignored: no active selection", self.name());
            return CommandResult::unchanged(document, None);
        };
        let Some((from, to)) = resolve_selection(document, selection) else {
            tracing::debug!("{} ignored: selection does not address text", self.name());
            return CommandResult::unchanged(document, Some(selection));
        };

        let outcome = match self {
            Self::SetHeading { level } => {
                if !(1..=MAX_HEADING_LEVEL).contains(level) {
                    None
                } else {
                    toggle_block(document, &from, &to, BlockTarget::Heading(*level))
                }
            }
            Self::ToggleBulletList => {
                toggle_block(document, &from, &to, BlockTarget::List(NodeKind::BulletList))
            }
            Self::ToggleOrderedList => {
                toggle_block(document, &from, &to, BlockTarget::List(NodeKind::OrderedList))
            }
            Self::ToggleTaskList => {
                toggle_block(document, &from, &to, BlockTarget::List(NodeKind::TaskList))
            }
            Self::ToggleBlockquote => toggle_block(document, &from, &to, BlockTarget::Blockquote),
            Self::ToggleCodeBlock => toggle_block(document, &from, &to, BlockTarget::CodeBlock),
            Self::InsertSection => insert_section(document, &selection.head),
            Self::ToggleMark { mark } => {
                let mark = match mark {
                    MarkKind::Bold => Mark::Bold,
                    MarkKind::Italic => Mark::Italic,
                    MarkKind::Underline => Mark::Underline,
                    MarkKind::Strike => Mark::Strike,
                    MarkKind::Code => Mark::Code,
                    MarkKind::Link => return CommandResult::unchanged(document, Some(selection)),
                };
                apply_marks(document, &from, &to, MarkEdit::Toggle(mark))
                    .map(|doc| (doc, selection.clone()))
            }
            Self::SetLink { href } => {
                let edit = match href.as_deref().map(str::trim) {
                    Some(href) if !href.is_empty() => MarkEdit::Add(Mark::link(href)),
                    _ => MarkEdit::Remove(MarkKind::Link),
                };
                apply_marks(document, &from, &to, edit).map(|doc| (doc, selection.clone()))
            }
            Self::SetTextAlign { alignment } => {
                set_alignment(document, &from, &to, *alignment).map(|doc| (doc, selection.clone()))
            }
        };

        match outcome {
            Some((document, selection)) => CommandResult {
                document,
                selection: Some(selection),
                applied: true,
            },
            None => CommandResult::unchanged(document, Some(selection)),
        }
    }
}

impl fmt::Display for EditorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of a command: the new document and where the selection ends up
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub document: Document,
    pub selection: Option<Selection>,
    /// `false` when the command was a no-op
    pub applied: bool,
}

impl CommandResult {
    fn unchanged(document: &Document, selection: Option<&Selection>) -> Self {
        Self {
            document: document.clone(),
            selection: selection.cloned(),
            applied: false,
        }
    }
}

/// Plain Enter on an empty paragraph inserts a section
///
/// Returns `None` when the key press is not handled here (shift held, a
/// range selection, or a non-empty / non-paragraph block) and the editor
/// should fall back to its default line break.
pub fn handle_line_break(
    document: &Document,
    selection: Option<&Selection>,
    shift: bool,
) -> Option<CommandResult> {
    if shift {
        return None;
    }
    let selection = selection?;
    if !selection.is_collapsed() {
        return None;
    }
    let block = document.node_at(&selection.head.path)?;
    if !block.is_empty_paragraph() {
        return None;
    }
    Some(EditorCommand::InsertSection.apply(document, Some(selection)))
}

/// Validate both ends and return them in document order
fn resolve_selection(document: &Document, selection: &Selection) -> Option<(Position, Position)> {
    let (from, to) = selection.ordered();
    for position in [from, to] {
        let block = document.node_at(&position.path)?;
        if !block.kind.is_textblock() || position.offset > block.text_len() {
            return None;
        }
    }
    Some((from.clone(), to.clone()))
}

// ---------------------------------------------------------------------------
// Block toggles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum BlockTarget {
    Heading(u8),
    List(NodeKind),
    Blockquote,
    CodeBlock,
}

impl BlockTarget {
    fn matches(&self, node: &Node) -> bool {
        match self {
            Self::Heading(level) => node.heading_level() == Some(*level),
            Self::List(kind) => node.kind == *kind,
            Self::Blockquote => node.kind == NodeKind::Blockquote,
            Self::CodeBlock => node.kind == NodeKind::CodeBlock,
        }
    }

    /// Whether an enclosing blockquote stays around the toggled units
    fn keeps_blockquote(&self) -> bool {
        !matches!(self, Self::Blockquote)
    }

    /// Strip the wrapping of `node` that conflicts with this target
    fn clear(&self, node: Node) -> Vec<Node> {
        match self {
            Self::Blockquote => vec![node],
            _ => flatten(node),
        }
    }

    /// Remove exactly the wrapping this target adds
    fn unwrap(&self, node: Node) -> Vec<Node> {
        if node.kind == NodeKind::Section {
            return vec![node];
        }
        match self {
            Self::Heading(_) | Self::CodeBlock => vec![to_paragraph(node)],
            Self::List(_) => node
                .children
                .unwrap_or_default()
                .into_iter()
                .flat_map(|item| item.children.unwrap_or_default())
                .collect(),
            Self::Blockquote => node.children.unwrap_or_default(),
        }
    }

    /// Apply this target's shape to units already passed through [`Self::clear`]
    fn wrap(&self, flat: Vec<Node>) -> Vec<Node> {
        match self {
            Self::Heading(level) => flat
                .into_iter()
                .map(|node| match node.kind {
                    NodeKind::Paragraph => {
                        let mut heading = node;
                        heading.kind = NodeKind::Heading;
                        heading
                            .attrs
                            .insert(ATTR_LEVEL.to_string(), Value::from(*level));
                        heading
                    }
                    _ => node,
                })
                .collect(),
            Self::CodeBlock => flat
                .into_iter()
                .map(|node| match node.kind {
                    NodeKind::Paragraph => Node::code_block(&node.text_content()),
                    _ => node,
                })
                .collect(),
            Self::List(kind) => group_runs(flat, |run| {
                let items = run
                    .into_iter()
                    .map(|paragraph| match kind {
                        NodeKind::TaskList => Node::task_item(false, vec![paragraph]),
                        _ => Node::list_item(vec![paragraph]),
                    })
                    .collect();
                Node::with_children(*kind, items)
            }),
            Self::Blockquote => {
                group_runs(flat, |run| Node::with_children(NodeKind::Blockquote, run))
            }
        }
    }
}

/// Wrap each maximal run of non-section blocks with `wrap_run`
fn group_runs(flat: Vec<Node>, wrap_run: impl Fn(Vec<Node>) -> Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut run = Vec::new();
    for node in flat {
        if node.kind == NodeKind::Section {
            if !run.is_empty() {
                out.push(wrap_run(std::mem::take(&mut run)));
            }
            out.push(node);
        } else {
            run.push(node);
        }
    }
    if !run.is_empty() {
        out.push(wrap_run(run));
    }
    out
}

/// Textblock to paragraph; headings keep alignment, code blocks keep only text
fn to_paragraph(node: Node) -> Node {
    match node.kind {
        NodeKind::Paragraph => node,
        NodeKind::Heading => {
            let mut paragraph = Node::paragraph();
            if let Some(align) = node.attrs.get(ATTR_TEXT_ALIGN) {
                paragraph
                    .attrs
                    .insert(ATTR_TEXT_ALIGN.to_string(), align.clone());
            }
            paragraph.children = node.children;
            paragraph
        }
        NodeKind::CodeBlock => {
            let text = node.text_content();
            if text.is_empty() {
                Node::paragraph()
            } else {
                Node::paragraph_with_text(&text)
            }
        }
        _ => node,
    }
}

/// Clear every wrapper down to paragraphs, leaving sections intact
fn flatten(node: Node) -> Vec<Node> {
    match node.kind {
        NodeKind::Section => vec![node],
        NodeKind::Text => Vec::new(),
        kind if kind.is_textblock() => vec![to_paragraph(node)],
        _ => node
            .children
            .unwrap_or_default()
            .into_iter()
            .flat_map(flatten)
            .collect(),
    }
}

fn split_list(list: Node, at: usize) -> (Node, Node) {
    let mut items = list.children.clone().unwrap_or_default();
    let tail = items.split_off(at.min(items.len()));
    let mut head_list = list.clone();
    head_list.children = Some(items);
    let mut tail_list = list;
    tail_list.children = Some(tail);
    (head_list, tail_list)
}

/// Innermost container holding both ends
fn toggle_scope(
    document: &Document,
    from: &NodePath,
    to: &NodePath,
    target: BlockTarget,
) -> NodePath {
    let common = from
        .indices()
        .iter()
        .zip(to.indices())
        .take_while(|(a, b)| a == b)
        .count();
    let limit = common.min(from.depth() - 1).min(to.depth() - 1);

    let mut scope = NodePath::root();
    for depth in 1..=limit {
        let candidate = from.prefix(depth);
        if document
            .node_at(&candidate)
            .is_some_and(|node| match node.kind {
                NodeKind::Section => true,
                NodeKind::Blockquote => target.keeps_blockquote(),
                _ => false,
            })
        {
            scope = candidate;
        }
    }
    scope
}

fn toggle_block(
    document: &Document,
    from: &Position,
    to: &Position,
    target: BlockTarget,
) -> Option<(Document, Selection)> {
    let textblocks = document.textblock_paths();
    let from_ordinal = textblocks.iter().position(|path| *path == from.path)?;
    let to_ordinal = textblocks.iter().position(|path| *path == to.path)?;

    let scope = toggle_scope(document, &from.path, &to.path, target);
    let depth = scope.depth();
    let first = *from.path.indices().get(depth)?;
    let last = *to.path.indices().get(depth)?;

    let children = document.children_at(&scope)?;
    let mut before: Vec<Node> = children.get(..first)?.to_vec();
    let mut units: Vec<Node> = children.get(first..=last)?.to_vec();
    let mut after: Vec<Node> = children.get(last + 1..)?.to_vec();

    // Split list units so only the selected items take part
    let mut consumed = 0;
    if units[0].kind.is_list() {
        if let Some(&start) = from.path.indices().get(depth + 1) {
            if start > 0 {
                let (head, tail) = split_list(units[0].clone(), start);
                before.push(head);
                units[0] = tail;
                if first == last {
                    consumed = start;
                }
            }
        }
    }
    let last_unit = units.len() - 1;
    if units[last_unit].kind.is_list() {
        if let Some(&end) = to.path.indices().get(depth + 1) {
            let keep = end - consumed + 1;
            if keep < units[last_unit].child_count() {
                let (head, tail) = split_list(units[last_unit].clone(), keep);
                units[last_unit] = head;
                after.insert(0, tail);
            }
        }
    }

    let toggles: Vec<&Node> = units
        .iter()
        .filter(|unit| unit.kind != NodeKind::Section)
        .collect();
    if toggles.is_empty() {
        return None;
    }
    let all_match = toggles.iter().all(|unit| target.matches(unit));

    let replacement: Vec<Node> = if all_match {
        units.into_iter().flat_map(|unit| target.unwrap(unit)).collect()
    } else {
        let cleared: Vec<Node> = units
            .into_iter()
            .flat_map(|unit| target.clear(unit))
            .collect();
        target.wrap(cleared)
    };

    let mut next = document.clone();
    let container = next.children_at_mut(&scope)?;
    *container = before
        .into_iter()
        .chain(replacement)
        .chain(after)
        .collect();

    // Textblocks map one-to-one through clear/wrap, so ordinals survive
    let remapped = next.textblock_paths();
    let position_at = |ordinal: usize, offset: usize| -> Option<Position> {
        let path = remapped.get(ordinal)?.clone();
        let len = next.node_at(&path).map(Node::text_len).unwrap_or(0);
        Some(Position::new(path, offset.min(len)))
    };
    let selection = Selection::range(
        position_at(from_ordinal, from.offset)?,
        position_at(to_ordinal, to.offset)?,
    );

    Some((next, selection))
}

// ---------------------------------------------------------------------------
// Section insertion
// ---------------------------------------------------------------------------

fn insert_section(document: &Document, head: &Position) -> Option<(Document, Selection)> {
    let parent = head.path.parent()?;
    let index = head.path.last()?;

    let mut next = document.clone();
    let siblings = next.children_at_mut(&parent)?;
    siblings.insert(index + 1, Node::section());

    let cursor = parent.child(index + 1).child(0);
    Some((next, Selection::cursor(cursor, 0)))
}

// ---------------------------------------------------------------------------
// Marks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum MarkEdit {
    Toggle(Mark),
    Add(Mark),
    Remove(MarkKind),
}

/// Split inline text so `start..end` falls on node boundaries
///
/// Returns the new inline list and the index range of the selected pieces.
fn split_inline(inline: &[Node], start: usize, end: usize) -> (Vec<Node>, Range<usize>) {
    let mut out = Vec::with_capacity(inline.len() + 2);
    let mut selected: Option<Range<usize>> = None;
    let mut position = 0;

    for node in inline {
        let text = node.text.as_deref().unwrap_or("");
        let len = text.chars().count();
        let node_start = position;
        let node_end = position + len;
        position = node_end;

        let cut_a = start.clamp(node_start, node_end) - node_start;
        let cut_b = end.clamp(node_start, node_end) - node_start;
        for (piece_start, piece_end, is_selected) in
            [(0, cut_a, false), (cut_a, cut_b, true), (cut_b, len, false)]
        {
            if piece_start >= piece_end {
                continue;
            }
            let mut piece = node.clone();
            piece.text = Some(
                text.chars()
                    .skip(piece_start)
                    .take(piece_end - piece_start)
                    .collect(),
            );
            if is_selected {
                let index = out.len();
                selected = Some(match selected {
                    Some(range) => range.start..index + 1,
                    None => index..index + 1,
                });
            }
            out.push(piece);
        }
    }

    (out, selected.unwrap_or(0..0))
}

fn apply_marks(
    document: &Document,
    from: &Position,
    to: &Position,
    edit: MarkEdit,
) -> Option<Document> {
    if from == to {
        return None;
    }

    let mut pieces: Vec<(NodePath, Vec<Node>, Range<usize>)> = Vec::new();
    for path in document.textblock_paths() {
        if path < from.path || path > to.path {
            continue;
        }
        let Some(block) = document.node_at(&path) else {
            continue;
        };
        if !block.kind.allows_marks() {
            continue;
        }
        let start = if path == from.path { from.offset } else { 0 };
        let end = if path == to.path { to.offset } else { block.text_len() };
        if start >= end {
            continue;
        }
        let (inline, range) = split_inline(block.children(), start, end);
        if !range.is_empty() {
            pieces.push((path, inline, range));
        }
    }
    if pieces.is_empty() {
        return None;
    }

    let edit = match edit {
        MarkEdit::Toggle(mark) => {
            let kind = mark.kind();
            let everywhere = pieces
                .iter()
                .all(|(_, inline, range)| inline[range.clone()].iter().all(|n| n.has_mark(kind)));
            if everywhere {
                MarkEdit::Remove(kind)
            } else {
                MarkEdit::Add(mark)
            }
        }
        other => other,
    };

    let mut next = document.clone();
    for (path, mut inline, range) in pieces {
        for node in &mut inline[range] {
            match &edit {
                MarkEdit::Add(mark) => add_mark(&mut node.marks, mark.clone()),
                MarkEdit::Remove(kind) => remove_mark(&mut node.marks, *kind),
                MarkEdit::Toggle(_) => {}
            }
        }
        let merged = merge_inline(inline, false);
        let block = next.node_at_mut(&path)?;
        block.children = if merged.is_empty() { None } else { Some(merged) };
    }

    Some(next)
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

fn set_alignment(
    document: &Document,
    from: &Position,
    to: &Position,
    alignment: Alignment,
) -> Option<Document> {
    let targets: Vec<NodePath> = document
        .textblock_paths()
        .into_iter()
        .filter(|path| *path >= from.path && *path <= to.path)
        .filter(|path| {
            document
                .node_at(path)
                .is_some_and(|node| node.kind.supports_alignment())
        })
        .collect();
    if targets.is_empty() {
        return None;
    }

    let mut next = document.clone();
    for path in targets {
        next.node_at_mut(&path)?.set_alignment(alignment);
    }
    Some(next)
}

#[cfg(test)]
#[path = "commands_test.rs"]
mod commands_test;
