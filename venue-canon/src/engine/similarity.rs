//! Similarity Matcher
//!
//! Scores a normalized name against a candidate pool using the Sørensen-Dice
//! coefficient over character bigrams (whitespace ignored). Purely local and
//! deterministic: the same pool in the same order always yields the same
//! best match.

use std::collections::HashMap;
use venue_common::config::SelfMatchPolicy;
use venue_common::{Error, Result};

/// Similarity rating between two normalized names, in [0, 1]
///
/// Dice coefficient over character bigrams with whitespace removed:
/// `2 * |A ∩ B| / (|A| + |B|)` where `A` and `B` are bigram multisets.
/// Symmetric. Only identical strings rate 1.0; a distinct pair with the same
/// bigrams (e.g. differing only in spacing) rates just below. Strings with
/// fewer than two non-whitespace characters rate 0.0 unless identical.
pub fn rating(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let a_bigrams = bigrams(a);
    let b_bigrams = bigrams(b);
    let total = a_bigrams.len() + b_bigrams.len();
    if a_bigrams.is_empty() || b_bigrams.is_empty() {
        return 0.0;
    }

    let mut counts: HashMap<(char, char), usize> = HashMap::with_capacity(a_bigrams.len());
    for bigram in a_bigrams {
        *counts.entry(bigram).or_insert(0) += 1;
    }

    let mut shared = 0usize;
    for bigram in b_bigrams {
        if let Some(count) = counts.get_mut(&bigram) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    let score = (2 * shared) as f64 / total as f64;
    score.min(BELOW_ONE)
}

/// Largest f64 below 1.0
const BELOW_ONE: f64 = 1.0 - f64::EPSILON / 2.0;

fn bigrams(s: &str) -> Vec<(char, char)> {
    let chars: Vec<char> = s.chars().filter(|c| !c.is_whitespace()).collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Fuzzy acceptance threshold
///
/// The boundary is exclusive: a rating equal to the threshold does not
/// match. Lower values merge distinct venues more often; higher values leave
/// spelling variants unmatched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThreshold(f64);

impl MatchThreshold {
    pub fn new(value: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(Error::InvalidInput(format!(
                "Match threshold must be within [0, 1], got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether `rating` is strictly above the threshold
    pub fn accepts(&self, rating: f64) -> bool {
        rating > self.0
    }
}

/// Highest-rated candidate from a pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestMatch<'a> {
    /// Position of the candidate in the pool
    pub index: usize,
    pub target: &'a str,
    pub rating: f64,
}

/// Find the highest-rated candidate for `input`.
///
/// Ties go to the earliest candidate in iteration order, so callers should
/// pass a sorted pool. With [`SelfMatchPolicy::Exclude`] candidates equal to
/// `input` are skipped (their index still counts). Returns `None` when no
/// candidate remains.
pub fn best_match<'a, I>(input: &str, candidates: I, self_match: SelfMatchPolicy) -> Option<BestMatch<'a>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<BestMatch<'a>> = None;

    for (index, target) in candidates.into_iter().enumerate() {
        if self_match == SelfMatchPolicy::Exclude && target == input {
            continue;
        }

        let score = rating(input, target);
        if best.map_or(true, |b| score > b.rating) {
            best = Some(BestMatch {
                index,
                target,
                rating: score,
            });
        }
    }

    best
}
