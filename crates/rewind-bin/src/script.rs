//! Script format: one command per line. `#` starts a comment, either on its
//! own line or after any command except `type`, whose argument is taken
//! verbatim.
//!
//! ```text
//! # escapes: \n \t \\
//! type Hello\nworld
//! backspace 3
//! caret 0
//! wait 900              # milliseconds; lets debounce windows expire
//! undo | redo | capture | clear | show
//! mode source_split     # rich | instant_render | source_split
//! readonly on           # on | off
//! ```

use anyhow::{Context, Result, anyhow, bail};
use core_state::EditMode;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Type(String),
    Backspace(usize),
    Caret(usize),
    Wait(Duration),
    Undo,
    Redo,
    Capture,
    Clear,
    Mode(EditMode),
    ReadOnly(bool),
    Show,
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => bail!("unknown escape \\{other}"),
            None => bail!("dangling backslash"),
        }
    }
    Ok(out)
}

fn number(arg: Option<&str>, what: &str) -> Result<usize> {
    let arg = arg.ok_or_else(|| anyhow!("{what} expects a number"))?;
    arg.trim()
        .parse()
        .with_context(|| format!("{what}: invalid number {arg:?}"))
}

fn strip_comment(arg: &str) -> &str {
    arg.split_once('#').map_or(arg, |(before, _)| before).trim()
}

fn parse_line(line: &str) -> Result<Option<ScriptCommand>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let (word, arg) = match trimmed.split_once(' ') {
        Some((w, rest)) => (w, Some(rest)),
        None => (trimmed.trim_end(), None),
    };
    let arg = if word == "type" {
        arg
    } else {
        arg.map(strip_comment).filter(|a| !a.is_empty())
    };
    let cmd = match word {
        "type" => ScriptCommand::Type(unescape(arg.unwrap_or(""))?),
        "backspace" => ScriptCommand::Backspace(arg.map_or(Ok(1), |a| number(Some(a), word))?),
        "caret" => ScriptCommand::Caret(number(arg, word)?),
        "wait" => ScriptCommand::Wait(Duration::from_millis(number(arg, word)? as u64)),
        "undo" => ScriptCommand::Undo,
        "redo" => ScriptCommand::Redo,
        "capture" => ScriptCommand::Capture,
        "clear" => ScriptCommand::Clear,
        "show" => ScriptCommand::Show,
        "mode" => {
            let name = arg.map(str::trim).unwrap_or("");
            ScriptCommand::Mode(
                EditMode::lookup(name).ok_or_else(|| anyhow!("unknown mode {name:?}"))?,
            )
        }
        "readonly" => match arg.map(str::trim) {
            Some("on") => ScriptCommand::ReadOnly(true),
            Some("off") => ScriptCommand::ReadOnly(false),
            other => bail!("readonly expects on|off, got {other:?}"),
        },
        other => bail!("unknown command {other:?}"),
    };
    Ok(Some(cmd))
}

pub fn parse_script(src: &str) -> Result<Vec<ScriptCommand>> {
    let mut out = Vec::new();
    for (idx, line) in src.lines().enumerate() {
        if let Some(cmd) = parse_line(line).with_context(|| format!("line {}", idx + 1))? {
            out.push(cmd);
        }
    }
    Ok(out)
}
