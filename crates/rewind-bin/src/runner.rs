//! Replays a parsed script through the same event path a host editor uses:
//! key and content notifications go through `UndoManager::handle_event`, and
//! debounce expiries arrive on the shared mpsc channel.

use core_actions::{Flow, MemorySurface, MemoryToolbar, StepOutcome, UndoManager};
use core_config::Config;
use core_events::{CommandEvent, EVENT_CHANNEL_CAP, Event, InputEvent, KeyCode, KeyEvent};
use core_text::CaretTarget;
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info};

use crate::script::ScriptCommand;

pub struct ScriptRunner {
    manager: UndoManager<MemorySurface, MemoryToolbar>,
    rx: Receiver<Event>,
    transcript: Vec<String>,
}

impl ScriptRunner {
    /// Fresh empty document with its bootstrap capture taken.
    pub fn new(config: &Config) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAP);
        let mut manager = UndoManager::new(
            config,
            MemorySurface::default(),
            MemoryToolbar::default(),
            tx,
        );
        manager.capture_now();
        Self {
            manager,
            rx,
            transcript: Vec::new(),
        }
    }

    pub fn manager(&self) -> &UndoManager<MemorySurface, MemoryToolbar> {
        &self.manager
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Run every command, then let the last debounce window settle.
    pub async fn run(&mut self, commands: &[ScriptCommand]) -> Vec<String> {
        for cmd in commands {
            self.drain_ready();
            debug!(target: "runtime.script", ?cmd, "script_command");
            if self.execute(cmd).await == Flow::Quit {
                break;
            }
        }
        if self.manager.coordinator().is_pending() {
            let settle = self.manager.coordinator().delay() * 2;
            self.pump_for(settle).await;
        }
        info!(
            target: "runtime",
            commands = commands.len(),
            undo_depth = self.manager.store().active().undo_depth(),
            "script_complete"
        );
        std::mem::take(&mut self.transcript)
    }

    async fn execute(&mut self, cmd: &ScriptCommand) -> Flow {
        match cmd {
            ScriptCommand::Type(text) => {
                for c in text.chars() {
                    let code = if c == '\n' {
                        KeyCode::Enter
                    } else {
                        KeyCode::Char(c)
                    };
                    self.key(code, |s| s.type_text(c.encode_utf8(&mut [0u8; 4])));
                }
            }
            ScriptCommand::Backspace(n) => {
                for _ in 0..*n {
                    self.key(KeyCode::Backspace, |s| {
                        s.backspace();
                    });
                }
            }
            ScriptCommand::Caret(n) => self.manager.surface_mut().set_caret(*n),
            ScriptCommand::Wait(d) => self.pump_for(*d).await,
            ScriptCommand::Undo => {
                let outcome = self.manager.undo();
                self.report("undo", outcome);
            }
            ScriptCommand::Redo => {
                let outcome = self.manager.redo();
                self.report("redo", outcome);
            }
            ScriptCommand::Capture => {
                return self
                    .manager
                    .handle_event(Event::Command(CommandEvent::CaptureNow));
            }
            ScriptCommand::Clear => {
                let flow = self.manager.handle_event(Event::Command(CommandEvent::Clear));
                self.manager.surface_mut().load("");
                self.manager.capture_now();
                return flow;
            }
            ScriptCommand::Mode(mode) => self.manager.switch_mode(*mode),
            ScriptCommand::ReadOnly(on) => self.manager.surface_mut().set_read_only(*on),
            ScriptCommand::Show => self.show(),
        }
        Flow::Continue
    }

    /// Key down, surface mutation, content-changed notification: the order a
    /// standard platform reports a keystroke in.
    fn key(&mut self, code: KeyCode, mutate: impl FnOnce(&mut MemorySurface)) {
        self.manager
            .handle_event(Event::Input(InputEvent::KeyDown(KeyEvent::new(code))));
        let before = self.manager.surface().content().len();
        mutate(self.manager.surface_mut());
        let changed = self.manager.surface().content().len() != before;
        if changed {
            self.manager
                .handle_event(Event::Input(InputEvent::ContentChanged));
        }
    }

    fn drain_ready(&mut self) {
        while let Ok(ev) = self.rx.try_recv() {
            self.manager.handle_event(ev);
        }
    }

    async fn pump_for(&mut self, d: Duration) {
        let deadline = Instant::now() + d;
        while let Ok(Some(ev)) = timeout_at(deadline, self.rx.recv()).await {
            if self.manager.handle_event(ev) == Flow::Quit {
                break;
            }
        }
    }

    fn report(&mut self, what: &str, outcome: StepOutcome) {
        let line = match outcome {
            StepOutcome::Rendered { text, caret, clean } => format!(
                "{what}: {text:?} caret={}{}",
                caret_label(caret),
                if clean { "" } else { " (fuzzy)" }
            ),
            StepOutcome::Skipped(reason) => format!("{what}: skipped ({reason:?})"),
        };
        self.transcript.push(line);
    }

    fn show(&mut self) {
        let surface = self.manager.surface();
        let available = self.manager.availability();
        let line = format!(
            "[{}] {:?} caret={} undo={} redo={}",
            self.manager.mode().name(),
            surface.content(),
            surface.caret(),
            if available.undo { "on" } else { "off" },
            if available.redo { "on" } else { "off" },
        );
        self.transcript.push(line);
    }
}

fn caret_label(caret: CaretTarget) -> String {
    match caret {
        CaretTarget::Offset(n) => n.to_string(),
        CaretTarget::End => "end".to_string(),
    }
}
