//! Core event types, the capture debounce timer and channel policy.

use std::fmt;
use std::sync::atomic::AtomicU64;

pub mod debounce;

pub use debounce::DebounceTimer;

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// A single bounded mpsc channel carries host input, commands and timer expiries to the event
// loop. Producers await `send`, so a slow consumer applies backpressure instead of dropping edits.
// The debounce task is the only internal producer; it sends at most one event per restart.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 1024;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters, inspected by tests and logged by the host on shutdown.
// -------------------------------------------------------------------------------------------------
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static DEBOUNCE_RESTARTS: AtomicU64 = AtomicU64::new(0);
pub static DEBOUNCE_CANCELS: AtomicU64 = AtomicU64::new(0);
pub static DEBOUNCE_FIRES: AtomicU64 = AtomicU64::new(0);
pub static DEBOUNCE_STALE: AtomicU64 = AtomicU64::new(0); // expiries ignored as superseded

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Input(InputEvent),
    Command(CommandEvent),
    /// The capture debounce window elapsed. Only the latest generation counts.
    CaptureDue { generation: u64 },
    Shutdown,
}

/// Notifications from the editing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key went down. Depending on platform ordering the content may or may
    /// not already reflect it.
    KeyDown(KeyEvent),
    /// The surface content was mutated by the user.
    ContentChanged,
}

/// Explicit requests from toolbar buttons or hotkeys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEvent {
    Undo,
    Redo,
    /// Capture immediately (programmatic edit), bypassing the debounce window.
    CaptureNow,
    /// New document; every history is reset.
    Clear,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            mods: KeyModifiers::empty(),
        }
    }

    pub fn with_mods(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Delete,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
}

impl KeyCode {
    /// Keys whose effect is to remove content.
    pub fn is_deletion(self) -> bool {
        matches!(self, KeyCode::Backspace | KeyCode::Delete)
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
        const SHIFT= 0b0000_0100;
        const META = 0b0000_1000;
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.code, self.mods)
    }
}
