//! Character-level diff, context patches and fuzzy patch application.
//!
//! [`PatchEngine`] is the entry point used by the history layer: it diffs two
//! snapshots, turns the diff into a [`Patch`] and applies patches (or their
//! reverse) to text that may have drifted from what the patch recorded.

pub mod diff;
pub mod matcher;
pub mod patch;

use tracing::trace;

pub use diff::{Diff, Op};
pub use patch::{Applied, Hunk, HunkStatus, Patch};

/// Tuning knobs for patch construction and fuzzy application.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchOptions {
    /// 0.0 requires a perfect match, 1.0 accepts anything.
    pub match_threshold: f64,
    /// How far from the expected offset a match may be, in characters, before
    /// proximity alone rules it out.
    pub match_distance: usize,
    /// Context characters kept around each hunk.
    pub patch_margin: usize,
    /// How much of a wide hunk's source may differ before the hunk is dropped.
    pub delete_threshold: f64,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            match_threshold: 0.5,
            match_distance: 1000,
            patch_margin: 4,
            delete_threshold: 0.5,
        }
    }
}

/// Stateless diff/patch service configured once with [`PatchOptions`].
#[derive(Debug, Clone, Default)]
pub struct PatchEngine {
    options: PatchOptions,
}

impl PatchEngine {
    pub const MIN_MARGIN: usize = 1;
    pub const MAX_MARGIN: usize = 8;

    pub fn new(mut options: PatchOptions) -> Self {
        options.patch_margin = options.patch_margin.clamp(Self::MIN_MARGIN, Self::MAX_MARGIN);
        options.match_threshold = options.match_threshold.clamp(0.0, 1.0);
        options.delete_threshold = options.delete_threshold.clamp(0.0, 1.0);
        Self { options }
    }

    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    pub fn diff(&self, a: &str, b: &str) -> Vec<Diff> {
        diff::diff(a, b)
    }

    /// Build a patch from `a` to `b` given their diff.
    pub fn make_patch(&self, a: &str, b: &str, diffs: &[Diff]) -> Patch {
        debug_assert_eq!(diff::diff_source(diffs), a);
        debug_assert_eq!(diff::diff_target(diffs), b);
        patch::make(a, diffs, self.options.patch_margin)
    }

    /// Diff and patch in one step.
    pub fn patch_between(&self, a: &str, b: &str) -> Patch {
        let diffs = self.diff(a, b);
        let patch = self.make_patch(a, b, &diffs);
        trace!(
            target: "diff.make",
            diffs = diffs.len(),
            hunks = patch.len(),
            "patch_made"
        );
        patch
    }

    pub fn apply_patch(&self, patch: &Patch, text: &str) -> Applied {
        let applied = patch::apply(patch, text, &self.options);
        trace!(
            target: "diff.apply",
            hunks = applied.hunks.len(),
            clean = applied.is_clean(),
            "patch_apply"
        );
        applied
    }

    pub fn reverse(&self, patch: &Patch) -> Patch {
        patch.reversed()
    }
}
