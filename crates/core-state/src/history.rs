use core_diff::{Applied, Patch, PatchEngine};
use core_text::strip;
use tracing::{debug, trace};

/// Default cap on undo entries per mode.
pub const DEFAULT_STACK_BOUND: usize = 50;

/// Whether a capture produced a new undo entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Recorded,
    /// Nothing changed since the baseline.
    Discarded,
}

/// Undo/redo history of one editing mode.
///
/// Every stored patch points backwards: applied to the snapshot captured with
/// it, it yields the snapshot before. Redo entries keep that orientation and
/// are reversed when stepped forward.
///
/// The first capture after construction or [`reset`](Self::reset) is always
/// recorded, even when nothing changed, and acts as the sentinel at index 0.
/// The sentinel itself is never undone.
#[derive(Debug, Clone)]
pub struct ModeHistory {
    baseline: String,
    undo_stack: Vec<Patch>,
    redo_stack: Vec<Patch>,
    has_undo: bool,
    stack_bound: usize,
    captures_discarded: u64,
}

impl Default for ModeHistory {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_BOUND)
    }
}

impl ModeHistory {
    pub fn new(stack_bound: usize) -> Self {
        Self {
            baseline: String::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            has_undo: false,
            stack_bound: stack_bound.max(1),
            captures_discarded: 0,
        }
    }

    pub fn baseline(&self) -> &str {
        &self.baseline
    }
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn has_undo(&self) -> bool {
        self.has_undo
    }
    pub fn stack_bound(&self) -> usize {
        self.stack_bound
    }
    pub fn captures_discarded(&self) -> u64 {
        self.captures_discarded
    }
    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Back to the freshly constructed state.
    pub fn reset(&mut self) {
        self.baseline.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.has_undo = false;
        trace!(target: "state.history", "history_reset");
    }

    /// Record `snapshot` as the newest state.
    pub fn capture(&mut self, engine: &PatchEngine, snapshot: String) -> CaptureOutcome {
        let diffs = engine.diff(&snapshot, &self.baseline);
        let patch = engine.make_patch(&snapshot, &self.baseline, &diffs);
        if patch.is_empty() && !self.undo_stack.is_empty() {
            self.captures_discarded += 1;
            trace!(target: "state.history", undo_depth = self.undo_stack.len(), "capture_discarded");
            return CaptureOutcome::Discarded;
        }

        self.baseline = snapshot;
        self.undo_stack.push(patch);
        if self.undo_stack.len() > self.stack_bound {
            self.undo_stack.remove(0);
            trace!(target: "state.history", bound = self.stack_bound, "undo_stack_trimmed");
        }
        if self.has_undo {
            self.redo_stack.clear();
            self.has_undo = false;
            trace!(target: "state.history", "redo_stack_cleared_on_new_edit");
        }
        trace!(
            target: "state.history",
            undo_depth = self.undo_stack.len(),
            redo_depth = self.redo_stack.len(),
            baseline_len = self.baseline.len(),
            "capture_recorded"
        );
        CaptureOutcome::Recorded
    }

    /// Step back one entry. Returns the reconstructed prior snapshot, or
    /// `None` when only the sentinel is left.
    pub fn undo(&mut self, engine: &PatchEngine) -> Option<Applied> {
        if !self.can_undo() {
            return None;
        }
        let patch = self.undo_stack.pop()?;
        let applied = engine.apply_patch(&patch, &self.baseline);
        if !applied.is_clean() {
            debug!(target: "state.history", failed = applied.failed(), "undo_apply_drift");
        }
        self.baseline.clone_from(&applied.text);
        self.redo_stack.push(patch);
        self.has_undo = true;
        trace!(target: "state.history", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
        Some(applied)
    }

    /// Step forward one entry.
    pub fn redo(&mut self, engine: &PatchEngine) -> Option<Applied> {
        let patch = self.redo_stack.pop()?;
        let applied = engine.apply_patch(&engine.reverse(&patch), &self.baseline);
        if !applied.is_clean() {
            debug!(target: "state.history", failed = applied.failed(), "redo_apply_drift");
        }
        self.baseline.clone_from(&applied.text);
        self.undo_stack.push(patch);
        trace!(target: "state.history", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "redo_pop");
        Some(applied)
    }

    /// Re-anchor the sentinel on a caret-marked copy of the baseline.
    ///
    /// Applies only while the sentinel is the sole entry, there is nothing to
    /// redo, and `marked` differs from the baseline by caret markers alone.
    /// Afterwards undoing back to the start restores that caret.
    pub fn rebase_sentinel(&mut self, engine: &PatchEngine, marked: &str) -> bool {
        if self.undo_stack.len() != 1 || !self.redo_stack.is_empty() {
            return false;
        }
        if marked == self.baseline || strip(marked) != strip(&self.baseline) {
            return false;
        }
        let diffs = engine.diff(marked, "");
        self.undo_stack[0] = engine.make_patch(marked, "", &diffs);
        self.baseline = marked.to_string();
        trace!(target: "state.history", baseline_len = self.baseline.len(), "sentinel_rebased");
        true
    }
}
