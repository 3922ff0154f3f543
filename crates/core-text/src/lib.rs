//! Caret-aware text helpers.
//!
//! Snapshots captured for undo history carry the caret as a placeholder
//! character embedded in the text itself, so that patches move the caret
//! along with the content they restore. See [`caret`].

pub mod caret;

pub use caret::{
    CARET_MARKER, CaretTarget, Container, Decoded, Selection, char_to_byte, decode, encode,
    has_marker, strip,
};
