//! Command Palette
//!
//! Resolves a typed query against the static command catalog and keeps the
//! keyboard navigation state of the slash menu. The palette never touches
//! the document itself: selecting an entry yields the [`EditorCommand`] for
//! the caller to apply.

use crate::operations::EditorCommand;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Key that opens the palette from the editor
pub const TRIGGER_CHAR: char = '/';

/// Vertical gap between the caret and the palette
pub const ANCHOR_OFFSET_PX: f64 = 10.0;

/// One selectable palette entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    pub command: EditorCommand,
}

impl CommandEntry {
    pub fn new(title: &str, description: &str, command: EditorCommand) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            shortcut: None,
            command,
        }
    }

    pub fn with_shortcut(mut self, shortcut: &str) -> Self {
        self.shortcut = Some(shortcut.to_string());
        self
    }

    /// Case-insensitive substring match on title or description
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }
}

/// Block-formatting commands offered by the slash menu, in display order
pub static DEFAULT_CATALOG: LazyLock<Vec<CommandEntry>> = LazyLock::new(|| {
    vec![
        CommandEntry::new(
            "Heading 1",
            "Large section heading",
            EditorCommand::SetHeading { level: 1 },
        )
        .with_shortcut("H1"),
        CommandEntry::new(
            "Heading 2",
            "Medium section heading",
            EditorCommand::SetHeading { level: 2 },
        )
        .with_shortcut("H2"),
        CommandEntry::new(
            "Heading 3",
            "Small section heading",
            EditorCommand::SetHeading { level: 3 },
        )
        .with_shortcut("H3"),
        CommandEntry::new(
            "Bullet List",
            "Create a simple bullet list",
            EditorCommand::ToggleBulletList,
        ),
        CommandEntry::new(
            "Numbered List",
            "Create a numbered list",
            EditorCommand::ToggleOrderedList,
        ),
        CommandEntry::new("Quote", "Add a quote block", EditorCommand::ToggleBlockquote),
        CommandEntry::new("Code Block", "Add a code block", EditorCommand::ToggleCodeBlock),
        CommandEntry::new("Task List", "Add a task list", EditorCommand::ToggleTaskList),
    ]
});

/// Entries matching `query`, in catalog order
///
/// There is no relevance ranking: an entry either matches or it doesn't.
/// The empty query matches everything.
pub fn filter<'a>(query: &str, catalog: &'a [CommandEntry]) -> Vec<&'a CommandEntry> {
    catalog.iter().filter(|entry| entry.matches(query)).collect()
}

/// Caret rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CaretRect {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Current document scroll offsets
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub x: f64,
    pub y: f64,
}

/// Absolute position of the palette's top-left corner
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PaletteAnchor {
    pub top: f64,
    pub left: f64,
}

impl PaletteAnchor {
    /// Place the palette just below the caret
    pub fn below_caret(caret: CaretRect, scroll: ScrollOffset) -> Self {
        Self {
            top: caret.bottom + scroll.y + ANCHOR_OFFSET_PX,
            left: caret.left + scroll.x,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaletteKey {
    Up,
    Down,
    Enter,
    Escape,
}

/// What the host should do after a palette interaction
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteAction {
    None,
    /// Highlight moved to this index of the filtered list
    Moved(usize),
    /// Apply this command; the palette has already closed
    Invoke(EditorCommand),
    Closed,
}

/// Slash menu state: open flag, query, highlighted row and anchor
#[derive(Debug, Clone)]
pub struct CommandPalette {
    catalog: Vec<CommandEntry>,
    is_open: bool,
    query: String,
    selected_index: usize,
    anchor: Option<PaletteAnchor>,
}

impl Default for CommandPalette {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandPalette {
    /// Palette over [`DEFAULT_CATALOG`]
    pub fn new() -> Self {
        Self::with_catalog(DEFAULT_CATALOG.clone())
    }

    pub fn with_catalog(catalog: Vec<CommandEntry>) -> Self {
        Self {
            catalog,
            is_open: false,
            query: String::new(),
            selected_index: 0,
            anchor: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    /// Anchor computed at the last open, `None` while closed
    pub fn anchor(&self) -> Option<PaletteAnchor> {
        self.anchor
    }

    pub fn results(&self) -> Vec<&CommandEntry> {
        filter(&self.query, &self.catalog)
    }

    /// Open at the current caret; the anchor is recomputed on every open
    pub fn open(&mut self, caret: CaretRect, scroll: ScrollOffset) {
        self.is_open = true;
        self.query.clear();
        self.selected_index = 0;
        self.anchor = Some(PaletteAnchor::below_caret(caret, scroll));
    }

    /// Editor keystroke hook; returns `true` when the palette opened
    pub fn handle_trigger(&mut self, typed: char, caret: CaretRect, scroll: ScrollOffset) -> bool {
        if typed != TRIGGER_CHAR || self.is_open {
            return false;
        }
        self.open(caret, scroll);
        true
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.selected_index = 0;
    }

    pub fn close(&mut self) {
        self.is_open = false;
        self.query.clear();
        self.selected_index = 0;
        self.anchor = None;
    }

    /// Pointer hover highlights a row
    pub fn hover(&mut self, index: usize) {
        if index < self.results().len() {
            self.selected_index = index;
        }
    }

    /// Pick the entry at `index` of the filtered list and close
    pub fn select(&mut self, index: usize) -> PaletteAction {
        let command = self.results().get(index).map(|entry| entry.command.clone());
        match command {
            Some(command) => {
                self.close();
                PaletteAction::Invoke(command)
            }
            None => PaletteAction::None,
        }
    }

    pub fn handle_key(&mut self, key: PaletteKey) -> PaletteAction {
        if !self.is_open {
            return PaletteAction::None;
        }

        let count = self.results().len();
        match key {
            PaletteKey::Escape => {
                self.close();
                PaletteAction::Closed
            }
            PaletteKey::Down if count > 0 => {
                self.selected_index = (self.selected_index + 1) % count;
                PaletteAction::Moved(self.selected_index)
            }
            PaletteKey::Up if count > 0 => {
                self.selected_index = (self.selected_index + count - 1) % count;
                PaletteAction::Moved(self.selected_index)
            }
            PaletteKey::Enter => self.select(self.selected_index),
            _ => PaletteAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caret(bottom: f64, left: f64) -> CaretRect {
        CaretRect {
            top: bottom - 18.0,
            bottom,
            left,
        }
    }

    fn titles(entries: &[&CommandEntry]) -> Vec<String> {
        entries.iter().map(|e| e.title.clone()).collect()
    }

    #[test]
    fn test_catalog_has_eight_entries_with_heading_shortcuts() {
        assert_eq!(DEFAULT_CATALOG.len(), 8);
        assert_eq!(DEFAULT_CATALOG[0].shortcut.as_deref(), Some("H1"));
        assert_eq!(DEFAULT_CATALOG[2].shortcut.as_deref(), Some("H3"));
        assert!(DEFAULT_CATALOG[3..].iter().all(|e| e.shortcut.is_none()));
    }

    #[test]
    fn test_filter_matches_title_or_description_case_insensitively() {
        assert_eq!(
            titles(&filter("HEAD", &DEFAULT_CATALOG)),
            vec!["Heading 1", "Heading 2", "Heading 3"]
        );
        assert_eq!(
            titles(&filter("list", &DEFAULT_CATALOG)),
            vec!["Bullet List", "Numbered List", "Task List"]
        );
        // Matches Quote by description and Code Block by title
        assert_eq!(
            titles(&filter("block", &DEFAULT_CATALOG)),
            vec!["Quote", "Code Block"]
        );
        assert_eq!(filter("", &DEFAULT_CATALOG).len(), 8);
        assert!(filter("zzz", &DEFAULT_CATALOG).is_empty());
    }

    #[test]
    fn test_navigation_wraps_both_ways() {
        let mut palette = CommandPalette::new();
        palette.open(caret(100.0, 40.0), ScrollOffset::default());
        palette.set_query("heading");

        assert_eq!(palette.handle_key(PaletteKey::Up), PaletteAction::Moved(2));
        assert_eq!(palette.handle_key(PaletteKey::Down), PaletteAction::Moved(0));
        assert_eq!(palette.handle_key(PaletteKey::Down), PaletteAction::Moved(1));
    }

    #[test]
    fn test_enter_invokes_selected_and_resets() {
        let mut palette = CommandPalette::new();
        palette.open(caret(100.0, 40.0), ScrollOffset::default());
        palette.set_query("quote");

        let action = palette.handle_key(PaletteKey::Enter);
        assert_eq!(action, PaletteAction::Invoke(EditorCommand::ToggleBlockquote));
        assert!(!palette.is_open());
        assert_eq!(palette.query(), "");
        assert_eq!(palette.selected_index(), 0);
    }

    #[test]
    fn test_empty_results_ignore_navigation_and_enter() {
        let mut palette = CommandPalette::new();
        palette.open(caret(100.0, 40.0), ScrollOffset::default());
        palette.set_query("nothing matches");

        assert_eq!(palette.handle_key(PaletteKey::Down), PaletteAction::None);
        assert_eq!(palette.handle_key(PaletteKey::Up), PaletteAction::None);
        assert_eq!(palette.handle_key(PaletteKey::Enter), PaletteAction::None);
        assert!(palette.is_open());
    }

    #[test]
    fn test_escape_closes_and_resets() {
        let mut palette = CommandPalette::new();
        palette.open(caret(100.0, 40.0), ScrollOffset::default());
        palette.set_query("list");
        palette.handle_key(PaletteKey::Down);

        assert_eq!(palette.handle_key(PaletteKey::Escape), PaletteAction::Closed);
        assert!(!palette.is_open());
        assert_eq!(palette.query(), "");
        assert_eq!(palette.selected_index(), 0);
        assert_eq!(palette.anchor(), None);
    }

    #[test]
    fn test_slash_opens_below_caret_and_reanchors_on_reopen() {
        let mut palette = CommandPalette::new();
        let scroll = ScrollOffset { x: 5.0, y: 200.0 };

        assert!(!palette.handle_trigger('a', caret(100.0, 40.0), scroll));
        assert!(palette.handle_trigger('/', caret(100.0, 40.0), scroll));
        assert_eq!(
            palette.anchor(),
            Some(PaletteAnchor {
                top: 310.0,
                left: 45.0
            })
        );
        // Already open: a second slash is plain text
        assert!(!palette.handle_trigger('/', caret(300.0, 10.0), scroll));

        palette.handle_key(PaletteKey::Escape);
        assert!(palette.handle_trigger('/', caret(300.0, 10.0), scroll));
        assert_eq!(
            palette.anchor(),
            Some(PaletteAnchor {
                top: 510.0,
                left: 15.0
            })
        );
    }

    #[test]
    fn test_hover_highlights_only_valid_rows() {
        let mut palette = CommandPalette::new();
        palette.open(caret(0.0, 0.0), ScrollOffset::default());
        palette.hover(5);
        assert_eq!(palette.selected_index(), 5);
        palette.hover(42);
        assert_eq!(palette.selected_index(), 5);
        assert_eq!(
            palette.select(5),
            PaletteAction::Invoke(EditorCommand::ToggleBlockquote)
        );
    }
}
