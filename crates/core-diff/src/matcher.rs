//! Fuzzy location of a pattern near an expected offset (Bitap / shift-or with
//! error tolerance). Used by patch application when the text around a hunk
//! has drifted from what the hunk recorded.

use std::collections::HashMap;

use crate::PatchOptions;
use crate::diff::{find, rfind};

/// Width of the bit-parallel match state. Patterns longer than this are
/// matched by their head and tail separately.
pub const MATCH_MAX_BITS: usize = 32;

/// Locate `pattern` in `text` as close as possible to `loc`.
pub(crate) fn match_main(
    text: &[char],
    pattern: &[char],
    loc: usize,
    options: &PatchOptions,
) -> Option<usize> {
    let loc = loc.min(text.len());
    if text == pattern {
        return Some(0);
    }
    if text.is_empty() {
        return None;
    }
    if loc + pattern.len() <= text.len() && text[loc..loc + pattern.len()] == *pattern {
        return Some(loc);
    }
    match_bitap(text, pattern, loc, options)
}

fn alphabet(pattern: &[char]) -> HashMap<char, u32> {
    let mut masks: HashMap<char, u32> = HashMap::new();
    for (i, c) in pattern.iter().enumerate() {
        *masks.entry(*c).or_insert(0) |= 1 << (pattern.len() - i - 1);
    }
    masks
}

fn match_bitap(
    text: &[char],
    pattern: &[char],
    loc: usize,
    options: &PatchOptions,
) -> Option<usize> {
    debug_assert!(!pattern.is_empty() && pattern.len() <= MATCH_MAX_BITS);
    let masks = alphabet(pattern);

    // Errors weigh against accuracy, distance from `loc` against proximity.
    let score = |errors: usize, x: usize| -> f64 {
        let accuracy = errors as f64 / pattern.len() as f64;
        let proximity = loc.abs_diff(x);
        if options.match_distance == 0 {
            return if proximity == 0 { accuracy } else { 1.0 };
        }
        accuracy + proximity as f64 / options.match_distance as f64
    };

    let mut threshold = options.match_threshold;
    // Exact hits on either side tighten the threshold early.
    if let Some(hit) = find(text, pattern, loc) {
        threshold = threshold.min(score(0, hit));
        if let Some(hit) = rfind(text, pattern, loc + pattern.len()) {
            threshold = threshold.min(score(0, hit));
        }
    }

    let match_mask: u32 = 1 << (pattern.len() - 1);
    let mut best_loc = None;
    let mut bin_max = pattern.len() + text.len();
    let mut last_rd: Vec<u32> = Vec::new();

    for d in 0..pattern.len() {
        // Binary search for how far from `loc` a match with `d` errors may lie.
        let mut bin_min = 0;
        let mut bin_mid = bin_max;
        while bin_min < bin_mid {
            if score(d, loc + bin_mid) <= threshold {
                bin_min = bin_mid;
            } else {
                bin_max = bin_mid;
            }
            bin_mid = (bin_max - bin_min) / 2 + bin_min;
        }
        bin_max = bin_mid;

        let mut start = (loc as isize - bin_mid as isize + 1).max(1) as usize;
        let finish = (loc + bin_mid).min(text.len()) + pattern.len();
        let mut rd = vec![0u32; finish + 2];
        rd[finish + 1] = (1u32 << d) - 1;

        let previous = |i: usize| last_rd.get(i).copied().unwrap_or(0);
        let mut j = finish;
        while j >= start {
            let char_match = text
                .get(j - 1)
                .and_then(|c| masks.get(c))
                .copied()
                .unwrap_or(0);
            rd[j] = if d == 0 {
                ((rd[j + 1] << 1) | 1) & char_match
            } else {
                (((rd[j + 1] << 1) | 1) & char_match)
                    | (((previous(j + 1) | previous(j)) << 1) | 1)
                    | previous(j + 1)
            };
            if rd[j] & match_mask != 0 {
                let candidate = score(d, j - 1);
                if candidate <= threshold {
                    threshold = candidate;
                    best_loc = Some(j - 1);
                    if j - 1 > loc {
                        // Keep scanning left, but no further than the mirror of this hit.
                        start = (2 * loc as isize - (j - 1) as isize).max(1) as usize;
                    } else {
                        break;
                    }
                }
            }
            j -= 1;
        }

        if score(d + 1, loc) > threshold {
            // No hope for a better match at higher error levels.
            break;
        }
        last_rd = rd;
    }
    best_loc
}
