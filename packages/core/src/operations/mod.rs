//! Editor Operations
//!
//! Pure transforms over the document tree and the slash-command palette
//! that drives them:
//!
//! - [`EditorCommand`] - block toggles, marks, links and alignment
//! - [`handle_line_break`] - Enter handling that inserts sections
//! - [`CommandPalette`] - `/` menu state, filtering and key navigation
//!
//! Commands never fail: an invalid or missing selection yields the input
//! document unchanged with `applied == false`.

mod commands;
mod palette;

pub use commands::{handle_line_break, CommandResult, EditorCommand};
pub use palette::{
    filter, CaretRect, CommandEntry, CommandPalette, PaletteAction, PaletteAnchor, PaletteKey,
    ScrollOffset, ANCHOR_OFFSET_PX, DEFAULT_CATALOG, TRIGGER_CHAR,
};
