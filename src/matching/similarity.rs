//! Fuzzy Ratio Scoring
//!
//! Integer similarity scores in [0, 100] with the semantics of the usual
//! fuzzy-ratio family, built on rapidfuzz's normalized indel similarity:
//! - `ratio`: normalized indel similarity of the whole strings
//! - `partial_ratio`: best `ratio` of the shorter string against equally long
//!   windows of the longer one
//! - `token_sort_ratio`: `ratio` after sorting words
//! - `token_set_ratio`: `ratio` over shared words plus each side's remainder
//! - `weighted_ratio`: combination used for ranking
//!
//! # Time Complexity
//! O(m × n) for `ratio`, O(m × n × (n - m + 1)) for `partial_ratio`
//! (m ≤ n). Tokens are short, pools are restricted per batch.

use rapidfuzz::distance::indel;
use std::collections::BTreeSet;

fn ratio_raw(a: &str, b: &str) -> f64 {
    100.0 * indel::normalized_similarity(a.chars(), b.chars())
}

fn to_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Whole-string similarity
///
/// # Example
/// ```
/// use value_standardizer::matching::similarity::ratio;
///
/// assert_eq!(ratio("klebsiella", "klebsiella"), 100);
/// assert_eq!(ratio("abc", "xyz"), 0);
/// ```
pub fn ratio(a: &str, b: &str) -> u8 {
    to_score(ratio_raw(a, b))
}

fn partial_ratio_raw(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let mut best = 0.0f64;
    for window in long.windows(short.len()) {
        let score = 100.0 * indel::normalized_similarity(short.iter().copied(), window.iter().copied());
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}

/// Best substring alignment of the shorter string inside the longer one
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    to_score(partial_ratio_raw(a, b))
}

fn sorted_words(text: &str) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    words.sort_unstable();
    words.join(" ")
}

/// Word-order-insensitive similarity
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    to_score(ratio_raw(&sorted_words(a), &sorted_words(b)))
}

/// Shared words against each side's shared-plus-remaining words
fn token_set_with(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
    let words_a: BTreeSet<&str> = a.split_whitespace().collect();
    let words_b: BTreeSet<&str> = b.split_whitespace().collect();

    let join = |words: Vec<&str>| words.join(" ");
    let common = join(words_a.intersection(&words_b).copied().collect());
    let only_a = join(words_a.difference(&words_b).copied().collect());
    let only_b = join(words_b.difference(&words_a).copied().collect());

    let with_rest = |rest: &str| {
        if common.is_empty() {
            rest.to_string()
        } else if rest.is_empty() {
            common.clone()
        } else {
            format!("{} {}", common, rest)
        }
    };
    let full_a = with_rest(&only_a);
    let full_b = with_rest(&only_b);

    let mut best = scorer(&full_a, &full_b);
    if !common.is_empty() {
        best = best.max(scorer(&common, &full_a)).max(scorer(&common, &full_b));
    }
    best
}

/// Similarity that ignores words present on only one side
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    to_score(token_set_with(a, b, ratio_raw))
}

/// Combined score used for candidate ranking
///
/// Strings of similar length are compared whole (plain, word-sorted and
/// word-set). When one string is at least 1.5× longer, substring alignment
/// replaces the whole-string word scores, discounted to 0.9 (0.6 beyond 8×)
/// so that a short fragment never outranks an exact whole-string match.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a == 0 || len_b == 0 {
        return if len_a == 0 && len_b == 0 { 100 } else { 0 };
    }

    let base = ratio_raw(a, b);
    let length_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;

    if length_ratio < 1.5 {
        let sorted = ratio_raw(&sorted_words(a), &sorted_words(b)) * 0.95;
        let set = token_set_with(a, b, ratio_raw) * 0.95;
        return to_score(base.max(sorted).max(set));
    }

    let partial_scale = if length_ratio < 8.0 { 0.9 } else { 0.6 };
    let partial = partial_ratio_raw(a, b) * partial_scale;
    let partial_sorted = partial_ratio_raw(&sorted_words(a), &sorted_words(b)) * 0.95 * partial_scale;
    let partial_set = token_set_with(a, b, partial_ratio_raw) * 0.95 * partial_scale;

    to_score(base.max(partial).max(partial_sorted).max(partial_set))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("", ""), 100);
        assert_eq!(ratio("abc", ""), 0);
        assert_eq!(ratio("hello", "hello"), 100);
        // lcs("abcd", "abce") = 3 → 200·3/8 = 75
        assert_eq!(ratio("abcd", "abce"), 75);
        assert_eq!(ratio("abc", "xyz"), 0);
    }

    #[test]
    fn test_partial_ratio_substring() {
        assert_eq!(partial_ratio("klebsiella", "klebsiella pneumoniae"), 100);
        assert_eq!(partial_ratio("klebsiella pneumoniae", "klebsiella"), 100);
        assert_eq!(partial_ratio("", ""), 100);
        assert_eq!(partial_ratio("", "abc"), 0);
    }

    #[test]
    fn test_token_sort_ratio_ignores_order() {
        assert_eq!(token_sort_ratio("coli escherichia", "escherichia coli"), 100);
    }

    #[test]
    fn test_token_set_ratio_ignores_extra_words() {
        assert_eq!(token_set_ratio("sg clinic", "north sg clinic"), 100);
        assert_eq!(token_set_ratio("clinic sg", "sg clinic"), 100);
        assert!(token_set_ratio("east wing", "west ward") < 100);
        assert_eq!(token_set_ratio("abc", "xyz"), 0);
    }

    #[test]
    fn test_weighted_ratio_bounds_and_identity() {
        assert_eq!(weighted_ratio("e coli", "e coli"), 100);
        assert_eq!(weighted_ratio("", "abc"), 0);
        for (a, b) in [("mrsa", "methicillin resistant staphylococcus aureus"), ("x", "y")] {
            let score = weighted_ratio(a, b);
            assert!(score <= 100);
        }
    }

    #[test]
    fn test_weighted_ratio_prefers_close_spelling() {
        let close = weighted_ratio("klebsiella pneum", "klebsiella pneumoniae");
        let far = weighted_ratio("klebsiella pneum", "klebsiella oxytoca");
        assert!(close > far, "close={} far={}", close, far);
    }

    #[test]
    fn test_weighted_ratio_discounts_fragments() {
        // Exact whole-string match beats a substring hit
        let exact = weighted_ratio("staph", "staph");
        let fragment = weighted_ratio("staph", "staphylococcus aureus");
        assert!(exact > fragment);
        assert!(fragment >= 80);
    }

    #[test]
    fn test_weighted_ratio_extra_clinic_word() {
        // Length ratio 15/9 takes the partial branch: 100 · 0.9
        assert_eq!(weighted_ratio("sg clinic north", "sg clinic"), 90);
        // Similar length with reordered words: token set · 0.95
        assert_eq!(weighted_ratio("north sg clinic", "sg clinic north"), 95);
    }
}
