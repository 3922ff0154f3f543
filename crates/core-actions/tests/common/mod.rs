#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_actions::{MemorySurface, MemoryToolbar, UndoManager};
use core_config::{Config, EventOrdering};
use core_events::Event;
use tokio::sync::mpsc::{self, Receiver};

pub type TestManager = UndoManager<MemorySurface, MemoryToolbar>;

pub const TEST_DEBOUNCE_MS: u64 = 20;

pub fn config(ordering: EventOrdering) -> Config {
    let mut cfg = Config::default();
    cfg.file.capture.debounce_ms = TEST_DEBOUNCE_MS;
    cfg.file.capture.event_ordering = ordering;
    cfg
}

pub fn manager_with(
    content: &str,
    cfg: &Config,
) -> (TestManager, Receiver<Event>) {
    let (tx, rx) = mpsc::channel(core_events::EVENT_CHANNEL_CAP);
    let m = UndoManager::new(cfg, MemorySurface::new(content), MemoryToolbar::default(), tx);
    (m, rx)
}

/// Manager over `content` with the bootstrap capture already taken.
pub fn loaded(content: &str) -> (TestManager, Receiver<Event>) {
    let (mut m, rx) = manager_with(content, &config(EventOrdering::Standard));
    m.capture_now();
    (m, rx)
}

/// Type at the caret and capture immediately.
pub fn type_and_capture(m: &mut TestManager, text: &str) {
    m.surface_mut().type_text(text);
    m.capture_now();
}
