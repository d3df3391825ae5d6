//! Normalized edit-distance matching over file names.
//!
//! Scores are `1 - levenshtein(a, b) / max(len(a), len(b))`, computed on
//! lowercased input and counted in chars, so `"Main.swift"` and `"main.swift"`
//! score 1.0.

/// Minimum score (exclusive) a fuzzy candidate needs to be accepted.
pub const FUZZY_THRESHOLD: f64 = 0.7;

/// Levenshtein edit distance between two strings, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single-row DP: prev[j] is the distance between a[..i] and b[..j].
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Case-insensitive normalized similarity in `[0.0, 1.0]`.
///
/// Two empty strings are identical (1.0); an empty string against a
/// non-empty one scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// The best-scoring name for `query`, if any scores above [`FUZZY_THRESHOLD`].
///
/// Ties keep the earliest name, so callers feeding names in sorted order get a
/// deterministic pick.
pub fn best_match<'a, I>(query: &str, names: I) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for name in names {
        let score = similarity(query, name);
        let better = match best {
            Some((_, top)) => score > top,
            None => true,
        };
        if better {
            best = Some((name, score));
        }
    }
    best.filter(|(_, score)| *score > FUZZY_THRESHOLD)
}
