//! Caret marker codec.
//!
//! Contract:
//! - `encode` embeds one [`CARET_MARKER`] at the collapsed caret, only when the
//!   caret lies inside the editable container and the text has no marker yet.
//! - `decode` reports the first marker as a character offset into the
//!   marker-free text and removes every marker.
//! - Offsets are counted in `char`s, the same unit the patch engine uses.
//! - The marker is U+FDD0, a noncharacter that never appears in interchange
//!   text, so it cannot collide with user content.

use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

pub const CARET_MARKER: char = '\u{FDD0}';

/// Where the caret currently lives relative to the editable region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Editable,
    /// Focus is somewhere else (toolbar, another pane). Nothing is encoded.
    Outside,
}

/// A collapsed selection as reported by the editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub container: Container,
    /// Character offset into the marker-free content.
    pub offset: usize,
}

impl Selection {
    pub fn editable(offset: usize) -> Self {
        Self {
            container: Container::Editable,
            offset,
        }
    }

    pub fn outside() -> Self {
        Self {
            container: Container::Outside,
            offset: 0,
        }
    }
}

/// Where to put the caret after rendering a reconstructed snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretTarget {
    Offset(usize),
    /// No marker survived; collapse to the end of the content.
    End,
}

impl CaretTarget {
    /// Concrete character offset in a text of `len` characters.
    pub fn resolve(self, len: usize) -> usize {
        match self {
            CaretTarget::Offset(n) => n.min(len),
            CaretTarget::End => len,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub caret: CaretTarget,
}

pub fn has_marker(text: &str) -> bool {
    text.contains(CARET_MARKER)
}

/// Byte index of character offset `offset`, clamped to the end of `text`.
pub fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map_or(text.len(), |(byte, _)| byte)
}

/// Largest grapheme boundary at or before `byte`.
fn snap_to_grapheme(text: &str, byte: usize) -> usize {
    if byte >= text.len() {
        return text.len();
    }
    text.grapheme_indices(true)
        .map(|(start, _)| start)
        .take_while(|start| *start <= byte)
        .last()
        .unwrap_or(0)
}

/// Embed the caret into `content`.
pub fn encode(content: &str, selection: Option<&Selection>) -> String {
    let Some(sel) = selection else {
        return content.to_string();
    };
    if sel.container != Container::Editable || has_marker(content) {
        return content.to_string();
    }
    let at = snap_to_grapheme(content, char_to_byte(content, sel.offset));
    let mut out = String::with_capacity(content.len() + CARET_MARKER.len_utf8());
    out.push_str(&content[..at]);
    out.push(CARET_MARKER);
    out.push_str(&content[at..]);
    out
}

/// Locate and remove the caret marker.
pub fn decode(rendered: &str) -> Decoded {
    let caret = match rendered.chars().position(|c| c == CARET_MARKER) {
        Some(n) => CaretTarget::Offset(n),
        None => {
            debug!(target: "text.caret", len = rendered.len(), "marker_not_found");
            CaretTarget::End
        }
    };
    Decoded {
        text: strip(rendered),
        caret,
    }
}

/// Canonical text with every caret marker removed.
pub fn strip(text: &str) -> String {
    text.chars().filter(|c| *c != CARET_MARKER).collect()
}
