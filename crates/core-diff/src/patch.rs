//! Context-anchored patches built from a diff, and their (fuzzy) application.
//!
//! A [`Patch`] is a list of [`Hunk`]s. Each hunk carries a few characters of
//! unchanged context around its edits so that it can be relocated when the
//! text it is applied to has drifted. Offsets count characters; `start1` and
//! `start2` are expressed in the coordinates of the text as it looks once all
//! preceding hunks have been applied, which is why hunks must be applied in
//! order and why [`Patch::reversed`] also reverses the hunk order.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::PatchOptions;
use crate::diff::{Diff, Op, diff_slices, diff_source, diff_target, find, levenshtein, rfind, x_index};
use crate::matcher::{MATCH_MAX_BITS, match_main};

/// One group of edits plus surrounding context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hunk {
    pub diffs: Vec<Diff>,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

impl Hunk {
    /// The inverse hunk: polarity negated, source/target coordinates swapped.
    pub fn reversed(&self) -> Hunk {
        Hunk {
            diffs: self.diffs.iter().map(Diff::inverted).collect(),
            start1: self.start2,
            start2: self.start1,
            length1: self.length2,
            length2: self.length1,
        }
    }
}

/// A directional transformation from one snapshot to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    hunks: Vec<Hunk>,
}

impl Patch {
    pub fn new(hunks: Vec<Hunk>) -> Self {
        Self { hunks }
    }

    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    /// A patch with no hunks describes "no change".
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hunks.len()
    }

    /// The inverse patch. Applying `p` to A gives B; applying `p.reversed()`
    /// to B gives A. Equal spans and fragment order inside each hunk are kept.
    pub fn reversed(&self) -> Patch {
        Patch {
            hunks: self.hunks.iter().rev().map(Hunk::reversed).collect(),
        }
    }
}

/// How a single hunk landed during application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkStatus {
    /// Source text found verbatim at the expected offset.
    Exact,
    /// Source text found verbatim, but away from the expected offset.
    Shifted,
    /// Only an approximate match was found; edits were mapped onto it.
    Fuzzy,
    /// No acceptable match; the hunk was dropped.
    Failed,
}

/// Result of applying a patch. The text is always usable, even when some
/// hunks did not land cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub text: String,
    pub hunks: Vec<HunkStatus>,
}

impl Applied {
    /// Every hunk matched verbatim where it was expected.
    pub fn is_clean(&self) -> bool {
        self.hunks.iter().all(|s| *s == HunkStatus::Exact)
    }

    pub fn failed(&self) -> usize {
        self.hunks
            .iter()
            .filter(|s| **s == HunkStatus::Failed)
            .count()
    }
}

pub(crate) fn make(source: &str, diffs: &[Diff], margin: usize) -> Patch {
    let mut hunks = Vec::new();
    let mut hunk = Hunk::default();
    let (mut count1, mut count2) = (0usize, 0usize);
    // Context comes from the text with all previous hunks applied.
    let mut prepatch: Vec<char> = source.chars().collect();
    let mut postpatch = prepatch.clone();

    for (x, d) in diffs.iter().enumerate() {
        let len = d.char_len();
        if hunk.diffs.is_empty() && d.op != Op::Equal {
            hunk.start1 = count1;
            hunk.start2 = count2;
        }
        match d.op {
            Op::Insert => {
                hunk.diffs.push(d.clone());
                hunk.length2 += len;
                let at = count2.min(postpatch.len());
                postpatch.splice(at..at, d.text.chars());
            }
            Op::Delete => {
                hunk.diffs.push(d.clone());
                hunk.length1 += len;
                let at = count2.min(postpatch.len());
                let end = (count2 + len).min(postpatch.len());
                postpatch.drain(at..end);
            }
            Op::Equal => {
                if len <= 2 * margin && !hunk.diffs.is_empty() && x + 1 != diffs.len() {
                    // Small equality inside a hunk.
                    hunk.diffs.push(d.clone());
                    hunk.length1 += len;
                    hunk.length2 += len;
                } else if len >= 2 * margin && !hunk.diffs.is_empty() {
                    // Large equality closes the hunk.
                    add_context(&mut hunk, &prepatch, margin);
                    hunks.push(std::mem::take(&mut hunk));
                    prepatch = postpatch.clone();
                    count1 = count2;
                }
            }
        }
        if d.op != Op::Insert {
            count1 += len;
        }
        if d.op != Op::Delete {
            count2 += len;
        }
    }
    if !hunk.diffs.is_empty() {
        add_context(&mut hunk, &prepatch, margin);
        hunks.push(hunk);
    }
    Patch { hunks }
}

/// Grow context around the hunk until its source text is unique in `text`
/// (or the match width limit is reached), then add one margin more.
fn add_context(hunk: &mut Hunk, text: &[char], margin: usize) {
    if text.is_empty() {
        return;
    }
    let at = hunk.start2.min(text.len());
    let end = (hunk.start2 + hunk.length1).min(text.len());
    let mut pattern = &text[at..end.max(at)];
    let mut padding = 0;
    while find(text, pattern, 0) != rfind(text, pattern, text.len())
        && pattern.len() < MATCH_MAX_BITS.saturating_sub(2 * margin)
    {
        padding += margin;
        let lo = hunk.start2.saturating_sub(padding).min(text.len());
        let hi = (hunk.start2 + hunk.length1 + padding).min(text.len());
        pattern = &text[lo..hi.max(lo)];
    }
    padding += margin;

    let prefix = &text[hunk.start2.saturating_sub(padding).min(at)..at];
    let suffix_end = (hunk.start2 + hunk.length1 + padding).min(text.len());
    let suffix = &text[end..suffix_end.max(end)];
    if !prefix.is_empty() {
        hunk.diffs.insert(0, Diff::from_chars(Op::Equal, prefix));
    }
    if !suffix.is_empty() {
        hunk.diffs.push(Diff::from_chars(Op::Equal, suffix));
    }
    hunk.start1 = hunk.start1.saturating_sub(prefix.len());
    hunk.start2 = hunk.start2.saturating_sub(prefix.len());
    hunk.length1 += prefix.len() + suffix.len();
    hunk.length2 += prefix.len() + suffix.len();
}

pub(crate) fn apply(patch: &Patch, source: &str, options: &PatchOptions) -> Applied {
    if patch.is_empty() {
        return Applied {
            text: source.to_string(),
            hunks: Vec::new(),
        };
    }
    let margin = options.patch_margin;
    let mut hunks = patch.hunks.clone();
    let padding = add_padding(&mut hunks, margin);
    let hunks = split_max(hunks, margin);

    let mut text: Vec<char> = padding
        .iter()
        .copied()
        .chain(source.chars())
        .chain(padding.iter().copied())
        .collect();
    let mut statuses = Vec::with_capacity(hunks.len());
    let mut delta: isize = 0;

    for hunk in &hunks {
        let expected = hunk.start2 as isize + delta;
        let expected_loc = expected.max(0) as usize;
        let source_text: Vec<char> = diff_source(&hunk.diffs).chars().collect();

        let mut end_loc = None;
        let start_loc = if source_text.len() > MATCH_MAX_BITS {
            // Wide hunk: anchor head and tail separately.
            let head = &source_text[..MATCH_MAX_BITS];
            let tail = &source_text[source_text.len() - MATCH_MAX_BITS..];
            match match_main(&text, head, expected_loc, options) {
                Some(start) => {
                    end_loc = match_main(
                        &text,
                        tail,
                        expected_loc + source_text.len() - MATCH_MAX_BITS,
                        options,
                    );
                    match end_loc {
                        Some(end) if start < end => Some(start),
                        _ => None,
                    }
                }
                None => None,
            }
        } else {
            match_main(&text, &source_text, expected_loc, options)
        };

        let Some(start) = start_loc else {
            trace!(target: "diff.apply", start2 = hunk.start2, "hunk_not_found");
            statuses.push(HunkStatus::Failed);
            delta -= hunk.length2 as isize - hunk.length1 as isize;
            continue;
        };
        delta = start as isize - expected;

        let found_end = match end_loc {
            None => start + source_text.len(),
            Some(end) => end + MATCH_MAX_BITS,
        }
        .min(text.len());
        let found = &text[start..found_end];

        if found == source_text.as_slice() {
            let target: Vec<char> = diff_target(&hunk.diffs).chars().collect();
            text.splice(start..start + source_text.len(), target);
            statuses.push(if start == expected_loc {
                HunkStatus::Exact
            } else {
                HunkStatus::Shifted
            });
            continue;
        }

        // Imperfect match: map each edit through a diff of expected vs found.
        let drift = diff_slices(&source_text, found);
        if source_text.len() > MATCH_MAX_BITS
            && levenshtein(&drift) as f64 / source_text.len() as f64 > options.delete_threshold
        {
            trace!(target: "diff.apply", start2 = hunk.start2, "hunk_drift_too_large");
            statuses.push(HunkStatus::Failed);
            continue;
        }
        let mut index1 = 0;
        for d in &hunk.diffs {
            let len = d.char_len();
            match d.op {
                Op::Insert => {
                    let at = (start + x_index(&drift, index1)).min(text.len());
                    text.splice(at..at, d.text.chars());
                }
                Op::Delete => {
                    let from = (start + x_index(&drift, index1)).min(text.len());
                    let to = (start + x_index(&drift, index1 + len)).clamp(from, text.len());
                    text.drain(from..to);
                }
                Op::Equal => {}
            }
            if d.op != Op::Delete {
                index1 += len;
            }
        }
        statuses.push(HunkStatus::Fuzzy);
    }

    let lo = padding.len().min(text.len());
    let hi = text.len().saturating_sub(padding.len()).max(lo);
    let applied = Applied {
        text: text[lo..hi].iter().collect(),
        hunks: statuses,
    };
    if !applied.is_clean() {
        debug!(
            target: "diff.apply",
            hunks = applied.hunks.len(),
            failed = applied.failed(),
            "patch_applied_with_drift"
        );
    }
    applied
}

/// Surround the patch with sentinel padding so edits at either edge of the
/// text still have context to match against. Returns the padding.
fn add_padding(hunks: &mut [Hunk], margin: usize) -> Vec<char> {
    let padding: Vec<char> = (1..=margin as u32).filter_map(char::from_u32).collect();
    let pad = padding.len();
    for hunk in hunks.iter_mut() {
        hunk.start1 += pad;
        hunk.start2 += pad;
    }

    if let Some(first) = hunks.first_mut() {
        let leading = first
            .diffs
            .first()
            .filter(|d| d.op == Op::Equal)
            .map(Diff::char_len);
        match leading {
            None => {
                first.diffs.insert(0, Diff::from_chars(Op::Equal, &padding));
                first.start1 -= pad;
                first.start2 -= pad;
                first.length1 += pad;
                first.length2 += pad;
            }
            Some(len) if len < pad => {
                let extra = pad - len;
                let head: String = padding[len..].iter().collect();
                first.diffs[0].text.insert_str(0, &head);
                first.start1 -= extra;
                first.start2 -= extra;
                first.length1 += extra;
                first.length2 += extra;
            }
            Some(_) => {}
        }
    }

    if let Some(last) = hunks.last_mut() {
        let trailing = last
            .diffs
            .last()
            .filter(|d| d.op == Op::Equal)
            .map(Diff::char_len);
        match trailing {
            None => {
                last.diffs.push(Diff::from_chars(Op::Equal, &padding));
                last.length1 += pad;
                last.length2 += pad;
            }
            Some(len) if len < pad => {
                let extra = pad - len;
                if let Some(d) = last.diffs.last_mut() {
                    d.text.extend(padding[..extra].iter());
                }
                last.length1 += extra;
                last.length2 += extra;
            }
            Some(_) => {}
        }
    }
    padding
}

/// Break hunks whose source is wider than the match width into pieces that
/// each carry their own context.
fn split_max(hunks: Vec<Hunk>, margin: usize) -> Vec<Hunk> {
    let size = MATCH_MAX_BITS;
    let mut out = Vec::with_capacity(hunks.len());
    for big in hunks {
        if big.length1 <= size {
            out.push(big);
            continue;
        }
        let (mut start1, mut start2) = (big.start1, big.start2);
        let mut precontext: Vec<char> = Vec::new();
        let mut rest: VecDeque<Diff> = big.diffs.into();
        while !rest.is_empty() {
            let mut piece = Hunk {
                start1: start1.saturating_sub(precontext.len()),
                start2: start2.saturating_sub(precontext.len()),
                ..Hunk::default()
            };
            let mut empty = true;
            if !precontext.is_empty() {
                piece.length1 = precontext.len();
                piece.length2 = precontext.len();
                piece.diffs.push(Diff::from_chars(Op::Equal, &precontext));
            }
            while piece.length1 < size - margin {
                let Some(front) = rest.pop_front() else {
                    break;
                };
                let len = front.char_len();
                match front.op {
                    Op::Insert => {
                        piece.length2 += len;
                        start2 += len;
                        piece.diffs.push(front);
                        empty = false;
                    }
                    Op::Delete
                        if piece.diffs.len() == 1
                            && piece.diffs[0].op == Op::Equal
                            && len > 2 * size =>
                    {
                        // A huge deletion travels whole.
                        piece.length1 += len;
                        start1 += len;
                        piece.diffs.push(front);
                        empty = false;
                    }
                    op => {
                        let chars: Vec<char> = front.text.chars().collect();
                        let take = chars.len().min(size - piece.length1 - margin);
                        piece.length1 += take;
                        start1 += take;
                        if op == Op::Equal {
                            piece.length2 += take;
                            start2 += take;
                        } else {
                            empty = false;
                        }
                        piece.diffs.push(Diff::from_chars(op, &chars[..take]));
                        if take < chars.len() {
                            rest.push_front(Diff::from_chars(op, &chars[take..]));
                        }
                    }
                }
            }

            let target: Vec<char> = diff_target(&piece.diffs).chars().collect();
            precontext = target[target.len().saturating_sub(margin)..].to_vec();
            let postcontext: Vec<char> = rest
                .iter()
                .filter(|d| d.op != Op::Insert)
                .flat_map(|d| d.text.chars())
                .take(margin)
                .collect();
            if !postcontext.is_empty() {
                piece.length1 += postcontext.len();
                piece.length2 += postcontext.len();
                if piece.diffs.last().is_some_and(|d| d.op == Op::Equal) {
                    if let Some(d) = piece.diffs.last_mut() {
                        d.text.extend(postcontext.iter());
                    }
                } else {
                    piece.diffs.push(Diff::from_chars(Op::Equal, &postcontext));
                }
            }
            if !empty {
                out.push(piece);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff;
    use pretty_assertions::assert_eq;

    fn patch(a: &str, b: &str) -> Patch {
        make(a, &diff(a, b), PatchOptions::default().patch_margin)
    }

    #[test]
    fn identical_texts_make_empty_patch() {
        assert!(patch("same", "same").is_empty());
        assert!(patch("", "").is_empty());
    }

    #[test]
    fn hunk_carries_margin_context() {
        let p = patch(
            "The quick brown fox jumps over the lazy dog.",
            "That quick brown fox jumped over a lazy dog.",
        );
        assert_eq!(p.len(), 2);
        let first = &p.hunks()[0];
        assert_eq!(
            first.diffs,
            vec![
                Diff::equal("Th"),
                Diff::delete("e"),
                Diff::insert("at"),
                Diff::equal(" quick b"),
            ]
        );
        // "e" is ambiguous, so the context grows past one margin.
        assert_eq!((first.start1, first.length1, first.length2), (0, 11, 12));
        assert_eq!(p.hunks()[1].start1, p.hunks()[1].start2);
    }

    #[test]
    fn applies_exactly_on_matching_source() {
        let a = "The quick brown fox jumps over the lazy dog.";
        let b = "That quick brown fox jumped over a lazy dog.";
        let applied = apply(&patch(a, b), a, &PatchOptions::default());
        assert_eq!(applied.text, b);
        assert!(applied.is_clean());
        assert_eq!(applied.hunks, vec![HunkStatus::Exact, HunkStatus::Exact]);
    }

    #[test]
    fn applies_through_drift() {
        let a = "The quick brown fox jumps over the lazy dog.";
        let b = "That quick brown fox jumped over a lazy dog.";
        let drifted = "The quick red rabbit jumps over the tired tiger.";
        let applied = apply(&patch(a, b), drifted, &PatchOptions::default());
        assert_eq!(applied.text, "That quick red rabbit jumped over a tired tiger.");
        assert!(!applied.is_clean());
        assert_eq!(applied.failed(), 0);
    }

    #[test]
    fn unrelated_text_fails_hunks_but_returns_text() {
        let a = "The quick brown fox jumps over the lazy dog.";
        let b = "That quick brown fox jumped over a lazy dog.";
        let applied = apply(&patch(a, b), "I am the very model of a modern major general.", &PatchOptions::default());
        assert_eq!(applied.text, "I am the very model of a modern major general.");
        assert_eq!(applied.failed(), 2);
    }

    #[test]
    fn edits_at_text_edges_use_padding() {
        for (a, b) in [("", "test"), ("XY", "XtestY"), ("XY", "test"), ("y", "y123")] {
            let applied = apply(&patch(a, b), a, &PatchOptions::default());
            assert_eq!(applied.text, b, "{a:?} -> {b:?}");
            assert!(applied.is_clean());
        }
    }

    #[test]
    fn wide_hunks_are_split_and_applied() {
        let a = "abcdefghijklmnopqrstuvwxyz01234567890";
        let b = "XabXcdXefXghXijXklXmnXopXqrXstXuvXwxXyzX01X23X45X67X89X0";
        let applied = apply(&patch(a, b), a, &PatchOptions::default());
        assert_eq!(applied.text, b);
    }

    #[test]
    fn huge_deletion_round_trips() {
        let a = format!("head {} tail", "0123456789".repeat(10));
        let b = "head  tail".to_string();
        let p = patch(&a, &b);
        let applied = apply(&p, &a, &PatchOptions::default());
        assert_eq!(applied.text, b);
        let back = apply(&p.reversed(), &b, &PatchOptions::default());
        assert_eq!(back.text, a);
    }

    #[test]
    fn reversed_patch_restores_source() {
        let a = "alpha beta gamma delta epsilon zeta eta theta";
        let b = "alpha BETA gamma epsilon zeta ETA theta iota";
        let p = patch(a, b);
        let back = apply(&p.reversed(), b, &PatchOptions::default());
        assert_eq!(back.text, a);
        assert!(back.is_clean());
    }

    #[test]
    fn reversing_twice_is_identity() {
        let p = patch("one two three", "one 2 three four");
        assert_eq!(p.reversed().reversed(), p);
    }

    #[test]
    fn split_max_keeps_pieces_within_width() {
        let a = "abcdefghijklmnopqrstuvwxyz01234567890";
        let b = "XabXcdXefXghXijXklXmnXopXqrXstXuvXwxXyzX01X23X45X67X89X0";
        let hunks = split_max(patch(a, b).hunks.clone(), 4);
        assert!(hunks.len() > 1);
        assert!(hunks.iter().all(|h| h.length1 <= MATCH_MAX_BITS));
    }
}
