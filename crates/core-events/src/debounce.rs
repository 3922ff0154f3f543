//! Cancelable, restartable capture debounce.
//!
//! Each restart aborts the previous sleeper task and spawns a new one tagged
//! with a fresh generation. When the sleep elapses the task posts
//! `Event::CaptureDue { generation }`. The owner calls [`DebounceTimer::fire`]
//! with that generation; anything but the latest generation is stale, so a
//! late-arriving expiry from an aborted window never triggers a capture.
//!
//! Outside a tokio runtime no sleeper can be spawned: the window still opens,
//! so an explicit flush records the edit, but it never expires on its own.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::mpsc::Sender;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::{
    CHANNEL_SEND_FAILURES, DEBOUNCE_CANCELS, DEBOUNCE_FIRES, DEBOUNCE_RESTARTS, DEBOUNCE_STALE,
    Event,
};

pub struct DebounceTimer {
    delay: Duration,
    tx: Sender<Event>,
    handle: Option<JoinHandle<()>>,
    open: bool,
    generation: u64,
}

impl DebounceTimer {
    pub fn new(delay: Duration, tx: Sender<Event>) -> Self {
        Self {
            delay,
            tx,
            handle: None,
            open: false,
            generation: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A window is open and its expiry has not been consumed yet.
    pub fn is_pending(&self) -> bool {
        self.open
    }

    /// Open a new window, superseding any pending one.
    pub fn restart(&mut self) -> u64 {
        let was_open = self.open;
        self.abort();
        self.open = true;
        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;
        match Handle::try_current() {
            Ok(runtime) => {
                let tx = self.tx.clone();
                self.handle = Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if tx.send(Event::CaptureDue { generation }).await.is_err() {
                        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                    }
                }));
            }
            Err(_) if !was_open => {
                warn!(target: "runtime.events", generation, "debounce_without_runtime");
            }
            Err(_) => {}
        }
        DEBOUNCE_RESTARTS.fetch_add(1, Ordering::Relaxed);
        trace!(target: "runtime.events", generation, delay_ms = delay.as_millis() as u64, "debounce_restart");
        generation
    }

    /// Drop the pending window, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        let pending = self.abort();
        if pending {
            // An expiry already in the channel must not match anymore.
            self.generation += 1;
            DEBOUNCE_CANCELS.fetch_add(1, Ordering::Relaxed);
            trace!(target: "runtime.events", generation = self.generation, "debounce_cancel");
        }
        pending
    }

    /// Consume an expiry. Returns true when it belongs to the current window.
    pub fn fire(&mut self, generation: u64) -> bool {
        if generation != self.generation || !self.open {
            DEBOUNCE_STALE.fetch_add(1, Ordering::Relaxed);
            trace!(target: "runtime.events", generation, current = self.generation, "debounce_stale");
            return false;
        }
        self.handle = None;
        self.open = false;
        DEBOUNCE_FIRES.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Stop the sleeper and close the window. Returns whether it was open.
    fn abort(&mut self) -> bool {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        std::mem::replace(&mut self.open, false)
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.abort();
    }
}
