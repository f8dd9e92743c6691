//! Emoji-matching puzzle engine.
//!
//! A puzzle is two 5-slot symbol rows sharing one base symbol. The back row
//! is fixed; the user rotates the front row until the base symbol lines up
//! with its position in the back row. Generation guarantees the two slots
//! never coincide at creation, so a puzzle is never pre-solved.

mod generator;
mod render;
mod sessions;

pub use generator::{generate, is_correct, rotate};
pub use render::{JpegRenderer, PuzzleRenderer, render, resolve_font_path};
pub use sessions::{SessionEntry, SessionMap, Stage};

/// Slots per row
pub const ROW_LEN: usize = 5;

/// Fixed symbol pool. All glyphs are covered by DejaVu Sans so the renderer
/// never hits a missing-glyph box.
pub const SYMBOL_POOL: [char; 16] = [
    '☀', '☂', '☎', '☠', '☢', '☮', '☯', '♠', '♣', '♥', '♦', '♩', '♫', '★', '☾', '☑',
];

/// Transient emoji-matching challenge state for one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleSession {
    /// The symbol the user must align
    pub base: char,
    /// Fixed background row; contains `base` exactly once
    pub back_row: [char; ROW_LEN],
    /// Rotatable foreground row; contains `base` exactly once
    pub front_row: [char; ROW_LEN],
}

impl PuzzleSession {
    /// Slot index of the base symbol in the back row
    pub fn back_index(&self) -> usize {
        self.back_row.iter().position(|&c| c == self.base).unwrap_or(0)
    }

    /// Slot index of the base symbol in the front row
    pub fn front_index(&self) -> usize {
        self.front_row.iter().position(|&c| c == self.base).unwrap_or(0)
    }
}
