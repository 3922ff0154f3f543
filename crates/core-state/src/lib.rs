//! Per-mode undo/redo state.
//!
//! Each [`EditMode`] owns an independent [`ModeHistory`]: its own baseline,
//! undo stack, redo stack and discard-redo flag. [`HistoryStore`] holds the
//! three histories plus the active mode; every operation goes to the active
//! history only.
//!
//! Telemetry:
//! - History mutations emit trace events on target `state.history`
//!   (`capture_recorded`, `capture_discarded`, `undo_pop`, `redo_pop`,
//!   `undo_stack_trimmed`, `redo_stack_cleared_on_new_edit`, `sentinel_rebased`).
//! - Apply drift is logged at debug level; snapshot text is never logged.

pub mod history;

pub use history::{CaptureOutcome, DEFAULT_STACK_BOUND, ModeHistory};

use tracing::debug;

/// Editing modes, each with its own history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditMode {
    /// WYSIWYG editing.
    Rich,
    /// Markdown source that renders inline as it is typed.
    InstantRender,
    /// Source pane beside a live preview.
    SourceSplit,
}

impl EditMode {
    pub const ALL: [EditMode; 3] = [EditMode::Rich, EditMode::InstantRender, EditMode::SourceSplit];

    pub fn name(self) -> &'static str {
        match self {
            EditMode::Rich => "rich",
            EditMode::InstantRender => "instant_render",
            EditMode::SourceSplit => "source_split",
        }
    }

    /// Mode for a host-supplied name (`rich`, `instant_render`, `source_split`).
    pub fn lookup(name: &str) -> Option<EditMode> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// The three mode histories and which one is active.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    rich: ModeHistory,
    instant_render: ModeHistory,
    source_split: ModeHistory,
    active: EditMode,
}

impl HistoryStore {
    pub fn new(stack_bound: usize, active: EditMode) -> Self {
        Self {
            rich: ModeHistory::new(stack_bound),
            instant_render: ModeHistory::new(stack_bound),
            source_split: ModeHistory::new(stack_bound),
            active,
        }
    }

    pub fn get(&self, mode: EditMode) -> &ModeHistory {
        match mode {
            EditMode::Rich => &self.rich,
            EditMode::InstantRender => &self.instant_render,
            EditMode::SourceSplit => &self.source_split,
        }
    }

    pub fn get_mut(&mut self, mode: EditMode) -> &mut ModeHistory {
        match mode {
            EditMode::Rich => &mut self.rich,
            EditMode::InstantRender => &mut self.instant_render,
            EditMode::SourceSplit => &mut self.source_split,
        }
    }

    pub fn active_mode(&self) -> EditMode {
        self.active
    }

    pub fn active(&self) -> &ModeHistory {
        self.get(self.active)
    }

    pub fn active_mut(&mut self) -> &mut ModeHistory {
        self.get_mut(self.active)
    }

    pub fn set_active(&mut self, mode: EditMode) {
        if mode != self.active {
            debug!(target: "state.history", from = self.active.name(), to = mode.name(), "mode_switch");
            self.active = mode;
        }
    }

    /// New document: every history back to bootstrap.
    pub fn reset_all(&mut self) {
        for mode in EditMode::ALL {
            self.get_mut(mode).reset();
        }
    }
}

/// Which history actions can currently be offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Availability {
    pub undo: bool,
    pub redo: bool,
}

impl Availability {
    pub fn of(history: &ModeHistory) -> Self {
        Self {
            undo: history.can_undo(),
            redo: history.can_redo(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_diff::PatchEngine;

    #[test]
    fn lookup_round_trips_names() {
        for mode in EditMode::ALL {
            assert_eq!(EditMode::lookup(mode.name()), Some(mode));
        }
        assert_eq!(EditMode::lookup("wysiwyg"), None);
    }

    #[test]
    fn histories_are_independent() {
        let e = PatchEngine::default();
        let mut store = HistoryStore::new(10, EditMode::Rich);
        for s in ["a", "ab"] {
            store.active_mut().capture(&e, s.into());
        }
        store.set_active(EditMode::SourceSplit);
        assert_eq!(store.active().undo_depth(), 0);
        store.active_mut().capture(&e, "# title".into());
        assert_eq!(store.get(EditMode::Rich).undo_depth(), 2);
        assert_eq!(store.get(EditMode::SourceSplit).baseline(), "# title");
        assert_eq!(store.get(EditMode::InstantRender).undo_depth(), 0);
    }

    #[test]
    fn reset_all_clears_every_mode() {
        let e = PatchEngine::default();
        let mut store = HistoryStore::new(10, EditMode::Rich);
        for mode in EditMode::ALL {
            store.get_mut(mode).capture(&e, mode.name().into());
        }
        store.reset_all();
        assert!(EditMode::ALL.iter().all(|m| store.get(*m).undo_depth() == 0));
    }

    #[test]
    fn availability_follows_depths() {
        let e = PatchEngine::default();
        let mut h = ModeHistory::default();
        assert_eq!(Availability::of(&h), Availability { undo: false, redo: false });
        h.capture(&e, "a".into());
        assert_eq!(Availability::of(&h), Availability { undo: false, redo: false });
        h.capture(&e, "ab".into());
        assert_eq!(Availability::of(&h), Availability { undo: true, redo: false });
        h.undo(&e);
        assert_eq!(Availability::of(&h), Availability { undo: false, redo: true });
    }
}
