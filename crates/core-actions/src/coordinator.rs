//! When to capture: debounce windows and first-keystroke gating.
//!
//! The coordinator holds no history. It tells the manager whether a capture
//! (or first-keystroke bookkeeping) should happen, and owns the debounce
//! timer that turns a burst of edits into one undo step.

use core_config::EventOrdering;
use core_events::{DebounceTimer, Event, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tracing::trace;

pub struct CaptureCoordinator {
    timer: DebounceTimer,
    ordering: EventOrdering,
}

impl CaptureCoordinator {
    pub fn new(delay: Duration, ordering: EventOrdering, tx: Sender<Event>) -> Self {
        Self {
            timer: DebounceTimer::new(delay, tx),
            ordering,
        }
    }

    pub fn ordering(&self) -> EventOrdering {
        self.ordering
    }

    pub fn delay(&self) -> Duration {
        self.timer.delay()
    }

    /// An edit burst is in progress and not yet captured.
    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// A qualifying edit happened: (re)open the debounce window.
    pub fn content_changed(&mut self) -> u64 {
        self.timer.restart()
    }

    /// Whether a `CaptureDue` expiry should trigger a capture now.
    pub fn capture_due(&mut self, generation: u64) -> bool {
        self.timer.fire(generation)
    }

    /// Close the window without capturing. Returns whether one was open.
    pub fn cancel(&mut self) -> bool {
        self.timer.cancel()
    }

    /// Whether a key press at the start of a burst may rebase the sentinel.
    pub fn first_keystroke_allowed(&self, key: &KeyEvent, has_selection: bool) -> bool {
        if self.timer.is_pending() {
            return false;
        }
        let allowed = has_selection
            && match self.ordering {
                EventOrdering::Standard => true,
                EventOrdering::KeyBeforeMutation => !key.code.is_deletion(),
                EventOrdering::InputBeforeKey => false,
            };
        trace!(target: "actions.capture", key = %key, has_selection, allowed, "first_keystroke_gate");
        allowed
    }
}
