//! Configuration loading and parsing.
//!
//! Parses `rewind.toml` (or an override path provided by the binary):
//!
//! ```toml
//! [history]
//! stack_bound = 50
//! [capture]
//! debounce_ms = 800
//! event_ordering = "standard"
//! [patch]
//! match_threshold = 0.5
//! match_distance = 1000
//! patch_margin = 4
//! delete_threshold = 0.5
//! ```
//!
//! Every field is optional. A missing file yields defaults; a malformed file
//! yields defaults plus a warning. Out-of-range values are clamped by
//! [`Config::clamp`] and the clamp is logged on target `config`. Unknown fields
//! are ignored so older binaries tolerate newer files.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HistoryConfig {
    #[serde(default = "HistoryConfig::default_stack_bound")]
    pub stack_bound: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            stack_bound: Self::default_stack_bound(),
        }
    }
}

impl HistoryConfig {
    const fn default_stack_bound() -> usize {
        50
    }
}

/// Order in which the host platform reports a keystroke and the content
/// mutation it causes. Decides whether first-keystroke bookkeeping can trust
/// the content it reads.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventOrdering {
    /// Key event first, content still unmodified when it is observed.
    #[default]
    Standard,
    /// Key event fires before a deletion is observable; deletions are skipped.
    KeyBeforeMutation,
    /// Input is delivered before the key event; no first-keystroke tracking.
    InputBeforeKey,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CaptureConfig {
    #[serde(default = "CaptureConfig::default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub event_ordering: EventOrdering,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            debounce_ms: Self::default_debounce_ms(),
            event_ordering: EventOrdering::default(),
        }
    }
}

impl CaptureConfig {
    const fn default_debounce_ms() -> u64 {
        800
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PatchConfig {
    #[serde(default = "PatchConfig::default_threshold")]
    pub match_threshold: f64,
    #[serde(default = "PatchConfig::default_match_distance")]
    pub match_distance: usize,
    #[serde(default = "PatchConfig::default_patch_margin")]
    pub patch_margin: usize,
    #[serde(default = "PatchConfig::default_threshold")]
    pub delete_threshold: f64,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            match_threshold: Self::default_threshold(),
            match_distance: Self::default_match_distance(),
            patch_margin: Self::default_patch_margin(),
            delete_threshold: Self::default_threshold(),
        }
    }
}

impl PatchConfig {
    pub const MARGIN_RANGE: std::ops::RangeInclusive<usize> = 1..=8;

    const fn default_threshold() -> f64 {
        0.5
    }
    const fn default_match_distance() -> usize {
        1000
    }
    const fn default_patch_margin() -> usize {
        4
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub patch: PatchConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data, clamped
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("rewind.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("rewind").join("rewind.toml");
    }
    PathBuf::from("rewind.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            let mut cfg = Config {
                raw: Some(content),
                file,
            };
            cfg.clamp();
            Ok(cfg)
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

fn clamp_unit(name: &'static str, value: &mut f64) -> bool {
    let clamped = if value.is_nan() { 0.5 } else { value.clamp(0.0, 1.0) };
    if clamped != *value {
        info!(target: "config", field = name, raw = *value, clamped, "config_value_clamped");
        *value = clamped;
        return true;
    }
    false
}

impl Config {
    /// Force every value into its valid range. Returns how many were changed.
    pub fn clamp(&mut self) -> usize {
        let mut changed = 0;
        let history = &mut self.file.history;
        if history.stack_bound == 0 {
            info!(target: "config", field = "stack_bound", raw = 0, clamped = 1, "config_value_clamped");
            history.stack_bound = 1;
            changed += 1;
        }
        let patch = &mut self.file.patch;
        let margin = patch
            .patch_margin
            .clamp(*PatchConfig::MARGIN_RANGE.start(), *PatchConfig::MARGIN_RANGE.end());
        if margin != patch.patch_margin {
            info!(target: "config", field = "patch_margin", raw = patch.patch_margin, clamped = margin, "config_value_clamped");
            patch.patch_margin = margin;
            changed += 1;
        }
        changed += usize::from(clamp_unit("match_threshold", &mut patch.match_threshold));
        changed += usize::from(clamp_unit("delete_threshold", &mut patch.delete_threshold));
        changed
    }

    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.file.capture.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), body).unwrap();
        tmp
    }

    fn captured_logs(f: impl FnOnce()) -> String {
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();
        with_default(subscriber, f);
        String::from_utf8(buffer.lock().unwrap().clone()).unwrap()
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.file, ConfigFile::default());
        assert_eq!(cfg.file.history.stack_bound, 50);
        assert_eq!(cfg.file.capture.debounce_ms, 800);
        assert_eq!(cfg.file.capture.event_ordering, EventOrdering::Standard);
        assert_eq!(cfg.file.patch.patch_margin, 4);
        assert!(cfg.raw.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let tmp = write_config(
            "[history]\nstack_bound = 7\n\
             [capture]\ndebounce_ms = 120\nevent_ordering = \"key_before_mutation\"\n\
             [patch]\nmatch_threshold = 0.25\nmatch_distance = 64\npatch_margin = 2\ndelete_threshold = 0.75\n",
        );
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.history.stack_bound, 7);
        assert_eq!(cfg.file.capture.debounce_ms, 120);
        assert_eq!(cfg.debounce(), std::time::Duration::from_millis(120));
        assert_eq!(cfg.file.capture.event_ordering, EventOrdering::KeyBeforeMutation);
        assert_eq!(cfg.file.patch.match_threshold, 0.25);
        assert_eq!(cfg.file.patch.match_distance, 64);
        assert_eq!(cfg.file.patch.patch_margin, 2);
        assert_eq!(cfg.file.patch.delete_threshold, 0.75);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = write_config("[capture]\nevent_ordering = \"input_before_key\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.capture.event_ordering, EventOrdering::InputBeforeKey);
        assert_eq!(cfg.file.capture.debounce_ms, 800);
        assert_eq!(cfg.file.history, HistoryConfig::default());
    }

    #[test]
    fn clamps_out_of_range_values_with_log() {
        let tmp = write_config(
            "[history]\nstack_bound = 0\n[patch]\npatch_margin = 40\nmatch_threshold = 1.5\n",
        );
        let mut cfg = None;
        let logs = captured_logs(|| {
            cfg = Some(load_from(Some(tmp.path().to_path_buf())).unwrap());
        });
        let cfg = cfg.unwrap();
        assert_eq!(cfg.file.history.stack_bound, 1);
        assert_eq!(cfg.file.patch.patch_margin, 8);
        assert_eq!(cfg.file.patch.match_threshold, 1.0);
        assert!(logs.contains("INFO config:"));
        assert!(logs.contains("config_value_clamped"));
        assert!(logs.contains("patch_margin"));
    }

    #[test]
    fn clamp_reports_nothing_for_valid_values() {
        let mut cfg = Config::default();
        assert_eq!(cfg.clamp(), 0);
    }

    #[test]
    fn malformed_file_falls_back_with_warning() {
        let tmp = write_config("[history\nstack_bound = ");
        let mut cfg = None;
        let logs = captured_logs(|| {
            cfg = Some(load_from(Some(tmp.path().to_path_buf())).unwrap());
        });
        assert_eq!(cfg.unwrap().file, ConfigFile::default());
        assert!(logs.contains("WARN config:"));
        assert!(logs.contains("config_parse_failed"));
    }

    #[test]
    fn unknown_ordering_is_a_parse_failure() {
        let tmp = write_config("[capture]\nevent_ordering = \"sideways\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.capture.event_ordering, EventOrdering::Standard);
        assert!(cfg.raw.is_none());
    }
}
