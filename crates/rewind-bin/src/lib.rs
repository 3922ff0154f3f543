//! Edit-script replay host for the undo engine.
//!
//! * `script` - line-oriented script parsing
//! * `runner` - drives an `UndoManager` over a `MemorySurface` through the
//!   event channel, producing a printable transcript

pub mod runner;
pub mod script;

pub use runner::ScriptRunner;
pub use script::{ScriptCommand, parse_script};
