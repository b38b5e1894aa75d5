//! Fuzzy matching of business names.
//!
//! Directory sites list businesses under slightly different names than the maps listing, e.g.
//! "ABC Heating, LLC" vs "ABC Heating & Air". Scores are on a 0-100 scale.

use std::collections::BTreeSet;

/// Minimum score for a name to be considered a match
pub const DEFAULT_THRESHOLD: f64 = 70.0;

static COMPANY_SUFFIXES: [&str; 4] = ["llc", "inc", "corp", "ltd"];

/// Lowercase, strip punctuation used in company suffixes, and drop the suffixes themselves
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .replace([',', '.'], " ")
        .split_whitespace()
        .filter(|w| !COMPANY_SUFFIXES.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Weighted blend of partial, token sort and token set ratios of the normalized names
pub fn score(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize(a), normalize(b));
    partial_ratio(&a, &b) * 0.4 + token_sort_ratio(&a, &b) * 0.3 + token_set_ratio(&a, &b) * 0.3
}

/// Index and score of the best scoring choice at or above `threshold`.
/// Ties go to the earliest choice.
pub fn best_match<'a, I>(query: &str, choices: I, threshold: f64) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, f64)> = None;
    for (i, choice) in choices.into_iter().enumerate() {
        let s = score(query, choice);
        if s < threshold {
            continue;
        }
        if best.is_none_or(|(_, b)| s > b) {
            best = Some((i, s));
        }
    }
    best
}

pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    char_ratio(&a, &b)
}

/// Best ratio of the shorter string against every same-length window of the longer one
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }

    let mut best: f64 = 0.0;
    for window in long.windows(short.len()) {
        best = best.max(char_ratio(&short, window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a).join(" "), &sorted_tokens(b).join(" "))
}

/// Compares the shared tokens against each side's shared + remaining tokens, so that extra words
/// on one side don't count against the match
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();

    let common = ta.intersection(&tb).copied().collect::<Vec<_>>().join(" ");
    let only_a = ta.difference(&tb).copied().collect::<Vec<_>>().join(" ");
    let only_b = tb.difference(&ta).copied().collect::<Vec<_>>().join(" ");

    let combined_a = join_non_empty(&common, &only_a);
    let combined_b = join_non_empty(&common, &only_b);

    ratio(&common, &combined_a)
        .max(ratio(&common, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

fn sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

fn join_non_empty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.into(),
        (_, true) => a.into(),
        _ => format!("{a} {b}"),
    }
}

fn char_ratio(a: &[char], b: &[char]) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 100.0;
    }
    (1.0 - levenshtein(a, b) as f64 / max_len as f64) * 100.0
}

/// Minimum number of single character insertions, deletions and substitutions
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}
