//! The undo manager: glue between the surface, the histories and the timer.
//!
//! Capture path: surface content + caret -> caret codec -> active history.
//! Step path: active history -> optional render transform -> caret decode ->
//! surface render + caret placement. Availability is pushed to the toolbar
//! after every operation that can change it.

use core_config::Config;
use core_diff::{PatchEngine, PatchOptions};
use core_events::{CommandEvent, Event, InputEvent, KeyEvent};
use core_state::{Availability, CaptureOutcome, EditMode, HistoryStore};
use core_text::{CaretTarget, decode, encode};
use tokio::sync::mpsc::Sender;
use tracing::{debug, trace};

use crate::coordinator::CaptureCoordinator;
use crate::surface::{Action, EditingSurface, PostRender, Toolbar};

/// Why an undo/redo request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing to undo (only the sentinel) or nothing to redo.
    EmptyStack,
    ReadOnlySurface,
}

/// Result of an undo/redo request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Rendered {
        /// Marker-free text handed to the surface.
        text: String,
        caret: CaretTarget,
        /// Every hunk applied exactly where recorded.
        clean: bool,
    },
    Skipped(SkipReason),
}

/// Whether the event loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

type RenderTransform = Box<dyn Fn(&str) -> String + Send>;

pub struct UndoManager<S, T> {
    engine: PatchEngine,
    store: HistoryStore,
    coordinator: CaptureCoordinator,
    surface: S,
    toolbar: T,
    transform: Option<RenderTransform>,
}

impl<S: EditingSurface, T: Toolbar> UndoManager<S, T> {
    pub fn new(config: &Config, surface: S, toolbar: T, tx: Sender<Event>) -> Self {
        let file = &config.file;
        let engine = PatchEngine::new(PatchOptions {
            match_threshold: file.patch.match_threshold,
            match_distance: file.patch.match_distance,
            patch_margin: file.patch.patch_margin,
            delete_threshold: file.patch.delete_threshold,
        });
        Self {
            engine,
            store: HistoryStore::new(file.history.stack_bound, EditMode::Rich),
            coordinator: CaptureCoordinator::new(
                config.debounce(),
                file.capture.event_ordering,
                tx,
            ),
            surface,
            toolbar,
            transform: None,
        }
    }

    /// Rewrite reconstructed snapshots before they are rendered (e.g. a
    /// preview pass). History keeps the untransformed text.
    pub fn with_render_transform(
        mut self,
        transform: impl Fn(&str) -> String + Send + 'static,
    ) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
    pub fn toolbar(&self) -> &T {
        &self.toolbar
    }
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }
    pub fn engine(&self) -> &PatchEngine {
        &self.engine
    }
    pub fn coordinator(&self) -> &CaptureCoordinator {
        &self.coordinator
    }
    pub fn mode(&self) -> EditMode {
        self.store.active_mode()
    }
    pub fn availability(&self) -> Availability {
        Availability::of(self.store.active())
    }

    /// Route one loop event.
    pub fn handle_event(&mut self, event: Event) -> Flow {
        match event {
            Event::Input(InputEvent::KeyDown(key)) => self.on_key_down(&key),
            Event::Input(InputEvent::ContentChanged) => self.on_content_changed(),
            Event::Command(CommandEvent::Undo) => {
                self.undo();
            }
            Event::Command(CommandEvent::Redo) => {
                self.redo();
            }
            Event::Command(CommandEvent::CaptureNow) => {
                self.capture_now();
            }
            Event::Command(CommandEvent::Clear) => self.clear(),
            Event::CaptureDue { generation } => {
                if self.coordinator.capture_due(generation) {
                    self.capture();
                }
            }
            Event::Command(CommandEvent::Quit) | Event::Shutdown => return Flow::Quit,
        }
        Flow::Continue
    }

    /// First-keystroke bookkeeping at the start of an edit burst.
    pub fn on_key_down(&mut self, key: &KeyEvent) {
        let mode = self.mode();
        let selection = self.surface.selection();
        if !self
            .coordinator
            .first_keystroke_allowed(key, selection.is_some())
        {
            return;
        }
        let marked = encode(&self.surface.serialized_content(mode), selection.as_ref());
        if self.store.active_mut().rebase_sentinel(&self.engine, &marked) {
            debug!(target: "actions.capture", mode = mode.name(), "first_keystroke_recorded");
        }
    }

    /// The user edited the surface: restart the debounce window. Outside a
    /// tokio runtime the window only closes through a flush or `capture_now`.
    pub fn on_content_changed(&mut self) {
        self.coordinator.content_changed();
    }

    /// Capture immediately, discarding any pending debounce window.
    pub fn capture_now(&mut self) -> CaptureOutcome {
        self.coordinator.cancel();
        self.capture()
    }

    fn capture(&mut self) -> CaptureOutcome {
        let mode = self.mode();
        let content = self.surface.serialized_content(mode);
        let snapshot = encode(&content, self.surface.selection().as_ref());
        let outcome = self.store.active_mut().capture(&self.engine, snapshot);
        trace!(target: "actions.capture", mode = mode.name(), ?outcome, undo_depth = self.store.active().undo_depth(), "capture");
        self.notify_availability();
        outcome
    }

    /// Record an edit still waiting in the debounce window.
    fn flush_pending(&mut self) {
        if self.coordinator.cancel() {
            trace!(target: "actions.capture", "flush_pending_capture");
            self.capture();
        }
    }

    pub fn undo(&mut self) -> StepOutcome {
        let mode = self.mode();
        if self.surface.is_read_only(mode) {
            debug!(target: "actions.undo", mode = mode.name(), "undo_skipped_read_only");
            return StepOutcome::Skipped(SkipReason::ReadOnlySurface);
        }
        self.flush_pending();
        let Some(applied) = self.store.active_mut().undo(&self.engine) else {
            trace!(target: "actions.undo", mode = mode.name(), "undo_skipped_empty");
            return StepOutcome::Skipped(SkipReason::EmptyStack);
        };
        let outcome = self.render(mode, &applied.text, applied.is_clean());
        self.notify_availability();
        outcome
    }

    pub fn redo(&mut self) -> StepOutcome {
        let mode = self.mode();
        if self.surface.is_read_only(mode) {
            debug!(target: "actions.undo", mode = mode.name(), "redo_skipped_read_only");
            return StepOutcome::Skipped(SkipReason::ReadOnlySurface);
        }
        self.flush_pending();
        let Some(applied) = self.store.active_mut().redo(&self.engine) else {
            trace!(target: "actions.undo", mode = mode.name(), "redo_skipped_empty");
            return StepOutcome::Skipped(SkipReason::EmptyStack);
        };
        let outcome = self.render(mode, &applied.text, applied.is_clean());
        self.notify_availability();
        outcome
    }

    fn render(&mut self, mode: EditMode, snapshot: &str, clean: bool) -> StepOutcome {
        let decoded = match &self.transform {
            Some(transform) => decode(&transform(snapshot)),
            None => decode(snapshot),
        };
        self.surface.render_snapshot(mode, &decoded.text);
        self.surface.set_selection(decoded.caret);
        self.surface
            .notify_post_render(mode, PostRender::AFTER_HISTORY_STEP);
        trace!(target: "actions.undo", mode = mode.name(), len = decoded.text.len(), clean, "snapshot_rendered");
        StepOutcome::Rendered {
            text: decoded.text,
            caret: decoded.caret,
            clean,
        }
    }

    /// Make `mode` active. Pending edits are recorded in the mode being left;
    /// a mode visited for the first time bootstraps its history from the
    /// current surface content.
    pub fn switch_mode(&mut self, mode: EditMode) {
        if mode == self.mode() {
            return;
        }
        self.flush_pending();
        self.store.set_active(mode);
        if self.store.active().undo_depth() == 0 {
            self.capture();
        } else {
            self.notify_availability();
        }
    }

    /// New document: drop every history. The host captures the loaded
    /// content afterwards to seed the sentinel.
    pub fn clear(&mut self) {
        self.coordinator.cancel();
        self.store.reset_all();
        debug!(target: "actions.undo", "histories_cleared");
        self.notify_availability();
    }

    fn notify_availability(&mut self) {
        let available = self.availability();
        self.toolbar.set_action_enabled(Action::Undo, available.undo);
        self.toolbar.set_action_enabled(Action::Redo, available.redo);
        trace!(target: "actions.undo", undo = available.undo, redo = available.redo, "availability");
    }
}
