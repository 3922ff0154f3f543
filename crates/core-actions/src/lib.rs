//! Undo/redo orchestration over an external editing surface.
//!
//! * `surface`     - collaborator traits plus in-memory implementations
//! * `coordinator` - debounce window and first-keystroke gating
//! * `manager`     - `UndoManager`, routing events into capture/undo/redo

mod coordinator;
mod manager;
mod surface;

pub use coordinator::CaptureCoordinator;
pub use manager::{Flow, SkipReason, StepOutcome, UndoManager};
pub use surface::{Action, EditingSurface, MemorySurface, MemoryToolbar, PostRender, Toolbar};
