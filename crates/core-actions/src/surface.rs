//! Collaborator seams: the editing surface and the toolbar.
//!
//! The engine never owns document rendering or widgets. It reads serialized
//! content and the caret through [`EditingSurface`], hands reconstructed
//! snapshots back to it, and reports action availability through [`Toolbar`].
//! [`MemorySurface`] and [`MemoryToolbar`] are plain in-memory versions used
//! by the script host and by tests.

use core_state::EditMode;
use core_text::{CaretTarget, Container, Selection, char_to_byte};

/// History actions whose availability is reported to the toolbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Undo,
    Redo,
}

/// Flags passed to the post-render hook after a history step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostRender {
    /// Whether the host should treat the render as a new edit to capture.
    pub capture: bool,
    /// Whether to show inline hints.
    pub hint: bool,
    /// Whether to fire input listeners (counters, outline, autosave).
    pub input: bool,
}

impl PostRender {
    pub const AFTER_HISTORY_STEP: PostRender = PostRender {
        capture: false,
        hint: false,
        input: true,
    };
}

pub trait EditingSurface {
    /// Current content of the mode's editing region, marker-free.
    fn serialized_content(&self, mode: EditMode) -> String;
    /// Collapsed caret, or `None` when nothing is selected.
    fn selection(&self) -> Option<Selection>;
    fn set_selection(&mut self, target: CaretTarget);
    fn is_read_only(&self, mode: EditMode) -> bool;
    fn render_snapshot(&mut self, mode: EditMode, content: &str);
    fn notify_post_render(&mut self, mode: EditMode, flags: PostRender);
}

pub trait Toolbar {
    fn set_action_enabled(&mut self, action: Action, enabled: bool);
}

/// Single-region text surface with a character-offset caret.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    content: String,
    caret: usize,
    focused: bool,
    read_only: bool,
    renders: usize,
    last_post_render: Option<(EditMode, PostRender)>,
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new("")
    }
}

impl MemorySurface {
    /// Focused surface with the caret at the end of `content`.
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            caret: content.chars().count(),
            focused: true,
            read_only: false,
            renders: 0,
            last_post_render: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }
    pub fn caret(&self) -> usize {
        self.caret
    }
    pub fn renders(&self) -> usize {
        self.renders
    }
    pub fn last_post_render(&self) -> Option<(EditMode, PostRender)> {
        self.last_post_render
    }

    /// Replace the whole content (loading a document); caret goes to the end.
    pub fn load(&mut self, content: &str) {
        self.content = content.to_string();
        self.caret = content.chars().count();
    }

    pub fn set_caret(&mut self, offset: usize) {
        self.caret = offset.min(self.content.chars().count());
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Insert at the caret and advance it.
    pub fn type_text(&mut self, text: &str) {
        let at = char_to_byte(&self.content, self.caret);
        self.content.insert_str(at, text);
        self.caret += text.chars().count();
    }

    /// Delete the character before the caret. Returns false at the start.
    pub fn backspace(&mut self) -> bool {
        if self.caret == 0 {
            return false;
        }
        let at = char_to_byte(&self.content, self.caret - 1);
        self.content.remove(at);
        self.caret -= 1;
        true
    }
}

impl EditingSurface for MemorySurface {
    fn serialized_content(&self, _mode: EditMode) -> String {
        self.content.clone()
    }

    fn selection(&self) -> Option<Selection> {
        if !self.focused {
            return None;
        }
        Some(Selection {
            container: Container::Editable,
            offset: self.caret,
        })
    }

    fn set_selection(&mut self, target: CaretTarget) {
        self.caret = target.resolve(self.content.chars().count());
    }

    fn is_read_only(&self, _mode: EditMode) -> bool {
        self.read_only
    }

    fn render_snapshot(&mut self, _mode: EditMode, content: &str) {
        self.content = content.to_string();
        self.caret = self.caret.min(self.content.chars().count());
        self.renders += 1;
    }

    fn notify_post_render(&mut self, mode: EditMode, flags: PostRender) {
        self.last_post_render = Some((mode, flags));
    }
}

/// Records the latest enabled state of each action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryToolbar {
    pub undo_enabled: bool,
    pub redo_enabled: bool,
    pub updates: usize,
}

impl Toolbar for MemoryToolbar {
    fn set_action_enabled(&mut self, action: Action, enabled: bool) {
        match action {
            Action::Undo => self.undo_enabled = enabled,
            Action::Redo => self.redo_enabled = enabled,
        }
        self.updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_and_backspace_track_caret() {
        let mut s = MemorySurface::new("ac");
        s.set_caret(1);
        s.type_text("b");
        assert_eq!((s.content(), s.caret()), ("abc", 2));
        assert!(s.backspace());
        assert_eq!((s.content(), s.caret()), ("ac", 1));
        s.set_caret(0);
        assert!(!s.backspace());
    }

    #[test]
    fn unfocused_surface_has_no_selection() {
        let mut s = MemorySurface::new("x");
        assert!(s.selection().is_some());
        s.set_focused(false);
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn selection_target_end_resolves_to_length() {
        let mut s = MemorySurface::new("héllo");
        s.set_caret(0);
        s.set_selection(CaretTarget::End);
        assert_eq!(s.caret(), 5);
        s.set_selection(CaretTarget::Offset(2));
        assert_eq!(s.caret(), 2);
    }

    #[test]
    fn toolbar_records_updates() {
        let mut t = MemoryToolbar::default();
        t.set_action_enabled(Action::Undo, true);
        t.set_action_enabled(Action::Redo, false);
        assert!(t.undo_enabled);
        assert!(!t.redo_enabled);
        assert_eq!(t.updates, 2);
    }
}
