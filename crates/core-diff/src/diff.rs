//! Character-level diff between two content snapshots.
//!
//! The diff is computed over Unicode scalar values (`char`), never bytes, so
//! every fragment is valid UTF-8 and every offset reported by the patch layer
//! counts characters. The algorithm:
//!
//! 1. Trim the common prefix and suffix.
//! 2. Run `similar`'s Myers diff over what remains; replacements become a
//!    deletion followed by an insertion.
//! 3. Normalize with [`cleanup_merge`].
//!
//! No deadline is passed to `similar`: identical inputs always produce
//! identical output.

use similar::{Algorithm, DiffOp, DiffTag, capture_diff_slices};

/// Polarity of a diff fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Delete,
    Equal,
    Insert,
}

impl Op {
    /// Swap insertion and deletion; equality is its own inverse.
    pub fn inverse(self) -> Op {
        match self {
            Op::Delete => Op::Insert,
            Op::Insert => Op::Delete,
            Op::Equal => Op::Equal,
        }
    }
}

/// One tagged fragment of a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diff {
    pub op: Op,
    pub text: String,
}

impl Diff {
    pub fn new(op: Op, text: impl Into<String>) -> Self {
        Self {
            op,
            text: text.into(),
        }
    }

    pub fn equal(text: impl Into<String>) -> Self {
        Self::new(Op::Equal, text)
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self::new(Op::Insert, text)
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self::new(Op::Delete, text)
    }

    pub(crate) fn from_chars(op: Op, chars: &[char]) -> Self {
        Self::new(op, chars.iter().collect::<String>())
    }

    /// Length of the fragment in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Same fragment with insertion/deletion polarity swapped.
    pub fn inverted(&self) -> Self {
        Self::new(self.op.inverse(), self.text.clone())
    }
}

/// Compute the diff transforming `a` into `b`.
pub fn diff(a: &str, b: &str) -> Vec<Diff> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    diff_slices(&a, &b)
}

/// Diff over pre-split character slices (used by fuzzy patch application).
pub(crate) fn diff_slices(a: &[char], b: &[char]) -> Vec<Diff> {
    let mut diffs = diff_chars(a, b);
    cleanup_merge(&mut diffs);
    diffs
}

fn diff_chars(a: &[char], b: &[char]) -> Vec<Diff> {
    if a == b {
        return if a.is_empty() {
            Vec::new()
        } else {
            vec![Diff::from_chars(Op::Equal, a)]
        };
    }

    let prefix = common_prefix(a, b);
    let (head, a, b) = (&a[..prefix], &a[prefix..], &b[prefix..]);
    let suffix = common_suffix(a, b);
    let tail = &a[a.len() - suffix..];
    let (a, b) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    let mut diffs = Vec::new();
    if !head.is_empty() {
        diffs.push(Diff::from_chars(Op::Equal, head));
    }
    diffs.extend(compute(a, b));
    if !tail.is_empty() {
        diffs.push(Diff::from_chars(Op::Equal, tail));
    }
    diffs
}

/// Myers diff of the slices left after affix trimming, mapped onto [`Op`].
fn compute(a: &[char], b: &[char]) -> Vec<Diff> {
    if a.is_empty() || b.is_empty() {
        let mut diffs = Vec::with_capacity(1);
        if !a.is_empty() {
            diffs.push(Diff::from_chars(Op::Delete, a));
        }
        if !b.is_empty() {
            diffs.push(Diff::from_chars(Op::Insert, b));
        }
        return diffs;
    }

    let ops = capture_diff_slices(Algorithm::Myers, a, b);
    let mut diffs = Vec::with_capacity(ops.len() + 1);
    for (tag, old, new) in ops.iter().map(DiffOp::as_tag_tuple) {
        match tag {
            DiffTag::Equal => diffs.push(Diff::from_chars(Op::Equal, &a[old])),
            DiffTag::Delete => diffs.push(Diff::from_chars(Op::Delete, &a[old])),
            DiffTag::Insert => diffs.push(Diff::from_chars(Op::Insert, &b[new])),
            DiffTag::Replace => {
                diffs.push(Diff::from_chars(Op::Delete, &a[old]));
                diffs.push(Diff::from_chars(Op::Insert, &b[new]));
            }
        }
    }
    diffs
}

/// Normalize a diff in place: drop empty fragments, coalesce adjacent runs of
/// the same polarity, factor prefixes/suffixes shared by a delete+insert pair
/// into the surrounding equalities, and slide single edits sandwiched between
/// equalities so that one of the equalities disappears.
pub fn cleanup_merge(diffs: &mut Vec<Diff>) {
    loop {
        merge_runs(diffs);
        if !shift_single_edits(diffs) {
            break;
        }
    }
}

fn merge_runs(diffs: &mut Vec<Diff>) {
    let mut out: Vec<Diff> = Vec::with_capacity(diffs.len());
    let mut deleted = String::new();
    let mut inserted = String::new();
    for d in diffs.drain(..) {
        match d.op {
            Op::Delete => deleted.push_str(&d.text),
            Op::Insert => inserted.push_str(&d.text),
            Op::Equal => {
                let mut following = d.text;
                flush_edits(&mut out, &mut deleted, &mut inserted, &mut following);
                push_equal(&mut out, following);
            }
        }
    }
    let mut following = String::new();
    flush_edits(&mut out, &mut deleted, &mut inserted, &mut following);
    push_equal(&mut out, following);
    *diffs = out;
}

fn flush_edits(
    out: &mut Vec<Diff>,
    deleted: &mut String,
    inserted: &mut String,
    following: &mut String,
) {
    if !deleted.is_empty() && !inserted.is_empty() {
        let prefix = common_prefix_str(inserted, deleted);
        if prefix > 0 {
            push_equal(out, inserted[..prefix].to_string());
            inserted.drain(..prefix);
            deleted.drain(..prefix);
        }
        let suffix = common_suffix_str(inserted, deleted);
        if suffix > 0 {
            let split = inserted.len() - suffix;
            following.insert_str(0, &inserted[split..]);
            inserted.truncate(split);
            deleted.truncate(deleted.len() - suffix);
        }
    }
    if !deleted.is_empty() {
        out.push(Diff::delete(std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        out.push(Diff::insert(std::mem::take(inserted)));
    }
}

fn push_equal(out: &mut Vec<Diff>, text: String) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.op == Op::Equal => last.text.push_str(&text),
        _ => out.push(Diff::equal(text)),
    }
}

/// `A<ins>BA</ins>C` becomes `<ins>AB</ins>AC`, and the mirror case.
fn shift_single_edits(diffs: &mut Vec<Diff>) -> bool {
    let mut changed = false;
    let mut i = 1;
    while i + 1 < diffs.len() {
        if diffs[i - 1].op == Op::Equal && diffs[i + 1].op == Op::Equal {
            let prev = diffs[i - 1].text.clone();
            let next = diffs[i + 1].text.clone();
            if diffs[i].text.ends_with(&prev) {
                let keep = diffs[i].text.len() - prev.len();
                diffs[i].text = format!("{prev}{}", &diffs[i].text[..keep]);
                diffs[i + 1].text = format!("{prev}{next}");
                diffs.remove(i - 1);
                changed = true;
            } else if diffs[i].text.starts_with(&next) {
                diffs[i - 1].text.push_str(&next);
                diffs[i].text = format!("{}{next}", &diffs[i].text[next.len()..]);
                diffs.remove(i + 1);
                changed = true;
            }
        }
        i += 1;
    }
    changed
}

/// Source text of a diff (equalities and deletions).
pub fn diff_source(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.op != Op::Insert)
        .map(|d| d.text.as_str())
        .collect()
}

/// Target text of a diff (equalities and insertions).
pub fn diff_target(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.op != Op::Delete)
        .map(|d| d.text.as_str())
        .collect()
}

/// Number of inserted, deleted or substituted characters.
pub fn levenshtein(diffs: &[Diff]) -> usize {
    let (mut total, mut inserted, mut deleted) = (0, 0, 0);
    for d in diffs {
        match d.op {
            Op::Insert => inserted += d.char_len(),
            Op::Delete => deleted += d.char_len(),
            Op::Equal => {
                total += inserted.max(deleted);
                inserted = 0;
                deleted = 0;
            }
        }
    }
    total + inserted.max(deleted)
}

/// Map a character offset in the source text to the equivalent offset in the
/// target text. Offsets inside a deletion map to the deletion point.
pub fn x_index(diffs: &[Diff], loc: usize) -> usize {
    let (mut chars1, mut chars2) = (0, 0);
    let (mut last1, mut last2) = (0, 0);
    let mut landed_in = None;
    for d in diffs {
        let len = d.char_len();
        if d.op != Op::Insert {
            chars1 += len;
        }
        if d.op != Op::Delete {
            chars2 += len;
        }
        if chars1 > loc {
            landed_in = Some(d.op);
            break;
        }
        last1 = chars1;
        last2 = chars2;
    }
    if landed_in == Some(Op::Delete) {
        return last2;
    }
    last2 + (loc - last1)
}

fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Common prefix length in bytes, always on a char boundary.
fn common_prefix_str(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum()
}

/// Common suffix length in bytes, always on a char boundary.
fn common_suffix_str(a: &str, b: &str) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .map(|(c, _)| c.len_utf8())
        .sum()
}

/// First occurrence of `pat` in `text` starting at or after `from`.
pub(crate) fn find(text: &[char], pat: &[char], from: usize) -> Option<usize> {
    if from > text.len() {
        return None;
    }
    if pat.is_empty() {
        return Some(from);
    }
    text[from..]
        .windows(pat.len())
        .position(|w| w == pat)
        .map(|i| i + from)
}

/// Last occurrence of `pat` in `text` starting at or before `from`.
pub(crate) fn rfind(text: &[char], pat: &[char], from: usize) -> Option<usize> {
    if pat.len() > text.len() {
        return None;
    }
    let last_start = from.min(text.len() - pat.len());
    (0..=last_start)
        .rev()
        .find(|&i| text[i..i + pat.len()] == *pat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_inputs_have_single_equality() {
        assert_eq!(diff("abc", "abc"), vec![Diff::equal("abc")]);
        assert!(diff("", "").is_empty());
    }

    #[test]
    fn pure_insert_and_delete() {
        assert_eq!(diff("", "abc"), vec![Diff::insert("abc")]);
        assert_eq!(diff("abc", ""), vec![Diff::delete("abc")]);
    }

    #[test]
    fn contained_text_stays_equal() {
        assert_eq!(
            diff("abc", "xabcy"),
            vec![Diff::insert("x"), Diff::equal("abc"), Diff::insert("y")]
        );
        assert_eq!(
            diff("xabcy", "abc"),
            vec![Diff::delete("x"), Diff::equal("abc"), Diff::delete("y")]
        );
    }

    #[test]
    fn trims_common_affixes() {
        assert_eq!(
            diff("a<b>c", "a<x>c"),
            vec![
                Diff::equal("a<"),
                Diff::delete("b"),
                Diff::insert("x"),
                Diff::equal(">c"),
            ]
        );
    }

    #[test]
    fn myers_keeps_shared_middle() {
        let diffs = diff("cat", "map");
        assert!(diffs.contains(&Diff::equal("a")));
        assert_eq!(levenshtein(&diffs), 2);
        assert_eq!(diff_source(&diffs), "cat");
        assert_eq!(diff_target(&diffs), "map");
    }

    #[test]
    fn replacement_becomes_delete_then_insert() {
        assert_eq!(
            diff("xay", "xby"),
            vec![
                Diff::equal("x"),
                Diff::delete("a"),
                Diff::insert("b"),
                Diff::equal("y"),
            ]
        );
    }

    #[test]
    fn long_insert_into_repetitive_text() {
        let a = "ab".repeat(200);
        let b = format!("{}{}{}", &a[..201], "x".repeat(5000), &a[201..]);
        let diffs = diff(&a, &b);
        assert_eq!(diff_source(&diffs), a);
        assert_eq!(diff_target(&diffs), b);
        assert_eq!(levenshtein(&diffs), 5000);
    }

    #[test]
    fn fragments_reconstruct_both_sides() {
        let a = "The quick brown fox jumps over the lazy dog.";
        let b = "That quick brown fox jumped over a lazy dog.";
        let diffs = diff(a, b);
        assert_eq!(diff_source(&diffs), a);
        assert_eq!(diff_target(&diffs), b);
    }

    #[test]
    fn multibyte_text_stays_on_char_boundaries() {
        let a = "héllo wörld ✓";
        let b = "hello wörld ✗!";
        let diffs = diff(a, b);
        assert_eq!(diff_source(&diffs), a);
        assert_eq!(diff_target(&diffs), b);
    }

    #[test]
    fn cleanup_merge_coalesces_runs() {
        let mut diffs = vec![
            Diff::equal("a"),
            Diff::delete("b"),
            Diff::delete("c"),
            Diff::insert("d"),
            Diff::insert("e"),
            Diff::equal("f"),
            Diff::equal(""),
        ];
        cleanup_merge(&mut diffs);
        assert_eq!(
            diffs,
            vec![
                Diff::equal("a"),
                Diff::delete("bc"),
                Diff::insert("de"),
                Diff::equal("f"),
            ]
        );
    }

    #[test]
    fn cleanup_merge_factors_common_affixes() {
        let mut diffs = vec![
            Diff::delete("a"),
            Diff::insert("abc"),
            Diff::delete("dc"),
        ];
        cleanup_merge(&mut diffs);
        assert_eq!(
            diffs,
            vec![
                Diff::equal("a"),
                Diff::delete("d"),
                Diff::insert("b"),
                Diff::equal("c"),
            ]
        );
    }

    #[test]
    fn cleanup_merge_slides_edit_left() {
        let mut diffs = vec![Diff::equal("a"), Diff::insert("ba"), Diff::equal("c")];
        cleanup_merge(&mut diffs);
        assert_eq!(diffs, vec![Diff::insert("ab"), Diff::equal("ac")]);
    }

    #[test]
    fn cleanup_merge_slides_edit_right() {
        let mut diffs = vec![Diff::equal("a"), Diff::delete("bc"), Diff::equal("b")];
        cleanup_merge(&mut diffs);
        assert_eq!(diffs, vec![Diff::equal("ab"), Diff::delete("cb")]);
    }

    #[test]
    fn levenshtein_counts_substitutions_once() {
        let diffs = vec![Diff::delete("abc"), Diff::insert("1234"), Diff::equal("xyz")];
        assert_eq!(levenshtein(&diffs), 4);
        let diffs = vec![Diff::equal("xyz"), Diff::delete("abc"), Diff::insert("1234")];
        assert_eq!(levenshtein(&diffs), 4);
        let diffs = vec![Diff::delete("abc"), Diff::equal("xyz"), Diff::insert("1234")];
        assert_eq!(levenshtein(&diffs), 7);
    }

    #[test]
    fn x_index_translates_offsets() {
        let diffs = vec![Diff::delete("a"), Diff::insert("1234"), Diff::equal("xyz")];
        assert_eq!(x_index(&diffs, 2), 5);
        let diffs = vec![Diff::equal("a"), Diff::delete("1234"), Diff::equal("xyz")];
        assert_eq!(x_index(&diffs, 3), 1);
    }

    #[test]
    fn find_and_rfind_follow_bounds() {
        let text: Vec<char> = "abcabc".chars().collect();
        let pat: Vec<char> = "bc".chars().collect();
        assert_eq!(find(&text, &pat, 0), Some(1));
        assert_eq!(find(&text, &pat, 2), Some(4));
        assert_eq!(rfind(&text, &pat, 6), Some(4));
        assert_eq!(rfind(&text, &pat, 3), Some(1));
        assert_eq!(find(&text, &[], 3), Some(3));
    }
}
