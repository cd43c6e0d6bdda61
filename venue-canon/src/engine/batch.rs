//! Batch Canonicalizer
//!
//! Offline cleanup over every provider's distinct venue names:
//!
//! 1. Collect distinct names per provider (first appearance order) and
//!    globally (each unique string considered once)
//! 2. A manual override for the normalized name wins outright
//! 3. Otherwise find the best near-duplicate among all other distinct names
//! 4. Above the threshold, the shorter of the pair becomes the representative
//!    (equal lengths: lexically smaller)
//!
//! The shorter-string rule is a heuristic favouring clean, abbreviated
//! spellings over provider-decorated ones. It is not checked against the
//! canonical registry, so a short typo can win. Use [`RepresentativePolicy`]
//! to change it.
//!
//! Matching is all-pairs, O(n²) in the number of distinct names. That is fine
//! for a few thousand venues; larger corpora need n-gram blocking first.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use venue_common::config::SelfMatchPolicy;

use crate::engine::alias::AliasTable;
use crate::engine::normalizer::normalize;
use crate::engine::similarity::{best_match, MatchThreshold};

/// Venue names reported by one provider, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    pub provider: String,
    pub names: Vec<String>,
}

impl SourceTable {
    pub fn new(provider: impl Into<String>, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            provider: provider.into(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// How the representative of a matched pair is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepresentativePolicy {
    /// Fewer characters wins; ties broken by lexical order
    #[default]
    Shorter,
    /// Leave every name as its own representative
    KeepOriginal,
}

impl RepresentativePolicy {
    fn choose<'a>(&self, name: &'a str, matched: &'a str) -> &'a str {
        match self {
            RepresentativePolicy::KeepOriginal => name,
            RepresentativePolicy::Shorter => {
                let by_len = name.chars().count().cmp(&matched.chars().count());
                match by_len.then_with(|| name.cmp(matched)) {
                    Ordering::Greater => matched,
                    _ => name,
                }
            }
        }
    }
}

/// How a name's representative was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Override,
    Fuzzy,
    Unchanged,
}

/// Representative decided for one distinct raw name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalAssignment {
    pub raw_name: String,
    pub canonical_name: String,
    pub resolution: Resolution,
    /// Best near-duplicate rating (1.0 for overrides)
    pub rating: f64,
}

/// Non-fatal per-row problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BatchWarning {
    /// Cell contained only whitespace
    BlankName { provider: String, row: usize },
    /// Override for this name points at a blank canonical name
    BlankOverride { raw_name: String },
}

impl std::fmt::Display for BatchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchWarning::BlankName { provider, row } => {
                write!(f, "blank venue name in {} row {}", provider, row + 1)
            }
            BatchWarning::BlankOverride { raw_name } => {
                write!(f, "no canonical found for \"{}\" (blank override)", raw_name)
            }
        }
    }
}

/// Result of a batch run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutput {
    /// Column order of both tables
    pub providers: Vec<String>,
    /// Distinct names per provider, padded with "" to equal length
    pub original: Vec<Vec<String>>,
    /// `original` with each name replaced by its representative
    pub standardized: Vec<Vec<String>>,
    /// One entry per globally distinct name, first-appearance order
    pub assignments: Vec<CanonicalAssignment>,
    pub warnings: Vec<BatchWarning>,
}

impl BatchOutput {
    /// `(raw_name, canonical_name)` pairs for the curator override sheet
    pub fn override_rows(&self) -> impl Iterator<Item = (&str, &str)> {
        self.assignments
            .iter()
            .map(|a| (a.raw_name.as_str(), a.canonical_name.as_str()))
    }

    /// Names whose representative differs from themselves
    pub fn changed_count(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.raw_name != a.canonical_name)
            .count()
    }
}

/// Batch Canonicalizer
#[derive(Debug, Clone)]
pub struct BatchCanonicalizer {
    threshold: MatchThreshold,
    overrides: AliasTable<String>,
    policy: RepresentativePolicy,
}

impl BatchCanonicalizer {
    pub fn new(threshold: MatchThreshold) -> Self {
        Self {
            threshold,
            overrides: AliasTable::new(),
            policy: RepresentativePolicy::default(),
        }
    }

    /// Manual overrides keyed by normalized raw name
    pub fn with_overrides(mut self, overrides: AliasTable<String>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_policy(mut self, policy: RepresentativePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn canonicalize(&self, sources: &[SourceTable]) -> BatchOutput {
        let mut warnings = Vec::new();

        // Step 1: distinct names per provider and globally
        let mut per_source: Vec<Vec<String>> = Vec::with_capacity(sources.len());
        let mut all_distinct: Vec<String> = Vec::new();
        let mut seen_global: HashSet<String> = HashSet::new();

        for source in sources {
            let mut seen_local: HashSet<&str> = HashSet::new();
            let mut distinct = Vec::new();

            for (row, name) in source.names.iter().enumerate() {
                if name.is_empty() {
                    continue;
                }
                if name.trim().is_empty() {
                    warn!(provider = %source.provider, row, "Skipping blank venue name");
                    warnings.push(BatchWarning::BlankName {
                        provider: source.provider.clone(),
                        row,
                    });
                    continue;
                }
                if seen_local.insert(name.as_str()) {
                    distinct.push(name.clone());
                }
                if seen_global.insert(name.clone()) {
                    all_distinct.push(name.clone());
                }
            }

            per_source.push(distinct);
        }

        // Sorted pool of (normalized, raw) for deterministic tie-breaking
        let mut pool: Vec<(String, &str)> = all_distinct
            .iter()
            .map(|name| (normalize(name), name.as_str()))
            .collect();
        pool.sort();

        // Steps 2-4
        let mut assignments = Vec::with_capacity(all_distinct.len());
        for name in &all_distinct {
            let assignment = self.assign(name, &pool, &mut warnings);
            debug!(
                raw_name = %assignment.raw_name,
                canonical = %assignment.canonical_name,
                resolution = ?assignment.resolution,
                rating = assignment.rating,
                "Batch assignment"
            );
            assignments.push(assignment);
        }

        // Step 5: original and standardized tables
        let canonical_of: HashMap<&str, &str> = assignments
            .iter()
            .map(|a| (a.raw_name.as_str(), a.canonical_name.as_str()))
            .collect();

        let row_count = per_source.iter().map(Vec::len).max().unwrap_or(0);
        let mut original = Vec::with_capacity(row_count);
        let mut standardized = Vec::with_capacity(row_count);
        for i in 0..row_count {
            let raw_row: Vec<String> = per_source
                .iter()
                .map(|names| names.get(i).cloned().unwrap_or_default())
                .collect();
            let std_row: Vec<String> = raw_row
                .iter()
                .map(|raw| {
                    if raw.is_empty() {
                        String::new()
                    } else {
                        canonical_of
                            .get(raw.as_str())
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| raw.clone())
                    }
                })
                .collect();
            original.push(raw_row);
            standardized.push(std_row);
        }

        let output = BatchOutput {
            providers: sources.iter().map(|s| s.provider.clone()).collect(),
            original,
            standardized,
            assignments,
            warnings,
        };

        info!(
            providers = output.providers.len(),
            distinct_names = output.assignments.len(),
            changed = output.changed_count(),
            warnings = output.warnings.len(),
            "Batch canonicalization complete"
        );

        output
    }

    fn assign(&self, name: &str, pool: &[(String, &str)], warnings: &mut Vec<BatchWarning>) -> CanonicalAssignment {
        let normalized = normalize(name);

        if let Some(entry) = self.overrides.get(&normalized) {
            if entry.target.trim().is_empty() {
                warnings.push(BatchWarning::BlankOverride {
                    raw_name: name.to_string(),
                });
            } else {
                return CanonicalAssignment {
                    raw_name: name.to_string(),
                    canonical_name: entry.target.clone(),
                    resolution: Resolution::Override,
                    rating: 1.0,
                };
            }
        }

        // Skip the name's own pool entry, not other spellings that normalize
        // to the same string
        let others: Vec<usize> = (0..pool.len()).filter(|&i| pool[i].1 != name).collect();
        let best = best_match(
            &normalized,
            others.iter().map(|&i| pool[i].0.as_str()),
            SelfMatchPolicy::Accept,
        );

        match best {
            Some(best) if self.threshold.accepts(best.rating) => {
                let matched = pool[others[best.index]].1;
                let representative = self.policy.choose(name, matched);
                CanonicalAssignment {
                    raw_name: name.to_string(),
                    canonical_name: representative.to_string(),
                    resolution: if representative == name {
                        Resolution::Unchanged
                    } else {
                        Resolution::Fuzzy
                    },
                    rating: best.rating,
                }
            }
            best => CanonicalAssignment {
                raw_name: name.to_string(),
                canonical_name: name.to_string(),
                resolution: Resolution::Unchanged,
                rating: best.map_or(0.0, |b| b.rating),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use venue_common::db::AliasSource;

    fn threshold(value: f64) -> MatchThreshold {
        MatchThreshold::new(value).unwrap()
    }

    #[test]
    fn test_shorter_policy() {
        let policy = RepresentativePolicy::Shorter;
        assert_eq!(policy.choose("Zorlu Performing Arts Center PSM", "Zorlu PSM"), "Zorlu PSM");
        assert_eq!(policy.choose("Zorlu PSM", "Zorlu Performing Arts Center PSM"), "Zorlu PSM");
        // Equal length: lexical order
        assert_eq!(policy.choose("zorlu psm", "Zorlu PSM"), "Zorlu PSM");
        assert_eq!(policy.choose("Zorlu PSM", "zorlu psm"), "Zorlu PSM");
    }

    #[test]
    fn test_shorter_counts_characters_not_bytes() {
        // "Ülker" is 6 bytes but 5 characters
        let policy = RepresentativePolicy::Shorter;
        assert_eq!(policy.choose("Ülker", "Ulkerr"), "Ülker");
    }

    #[test]
    fn test_tie_break_picks_shorter_string() {
        let sources = vec![
            SourceTable::new("biletix_events", ["Zorlu Performing Arts Center PSM"]),
            SourceTable::new("passo_events", ["Zorlu PSM"]),
        ];

        // These two rate 14/34 against each other
        let output = BatchCanonicalizer::new(threshold(0.4)).canonicalize(&sources);

        assert_eq!(output.standardized, vec![vec!["Zorlu PSM".to_string(), "Zorlu PSM".to_string()]]);
        assert_eq!(output.assignments[0].resolution, Resolution::Fuzzy);
        assert_eq!(output.assignments[1].resolution, Resolution::Unchanged);
    }

    #[test]
    fn test_distinct_per_source_first_appearance() {
        let sources = vec![
            SourceTable::new("a", ["Babylon", "JJ Arena", "Babylon", "", "Bostancı"]),
            SourceTable::new("b", ["JJ Arena"]),
        ];

        let output = BatchCanonicalizer::new(threshold(0.99)).canonicalize(&sources);

        assert_eq!(output.providers, vec!["a", "b"]);
        assert_eq!(output.original.len(), 3);
        assert_eq!(output.original[0], vec!["Babylon", "JJ Arena"]);
        assert_eq!(output.original[1], vec!["JJ Arena", ""]);
        assert_eq!(output.original[2], vec!["Bostancı", ""]);

        let raw: Vec<&str> = output.assignments.iter().map(|a| a.raw_name.as_str()).collect();
        assert_eq!(raw, vec!["Babylon", "JJ Arena", "Bostancı"]);
    }

    #[test]
    fn test_override_wins_over_fuzzy() {
        let mut overrides = AliasTable::new();
        overrides.insert(normalize("Istanbul JJ Arena"), "JJ Arena".to_string(), AliasSource::Manual);

        let sources = vec![SourceTable::new("a", ["ISTANBUL JJ ARENA", "Istanbul JJ Arenaa"])];
        let output = BatchCanonicalizer::new(threshold(0.5))
            .with_overrides(overrides)
            .canonicalize(&sources);

        assert_eq!(output.assignments[0].canonical_name, "JJ Arena");
        assert_eq!(output.assignments[0].resolution, Resolution::Override);
    }

    #[test]
    fn test_case_variants_merge() {
        let sources = vec![SourceTable::new("a", ["zorlu psm", "Zorlu PSM"])];
        let output = BatchCanonicalizer::new(threshold(0.8)).canonicalize(&sources);

        assert_eq!(output.standardized[0], vec!["Zorlu PSM"]);
        assert_eq!(output.standardized[1], vec!["Zorlu PSM"]);
    }

    #[test]
    fn test_lone_name_maps_to_itself() {
        let sources = vec![SourceTable::new("a", ["Zzyxx Unknown Hall"])];
        let output = BatchCanonicalizer::new(threshold(0.8)).canonicalize(&sources);

        assert_eq!(output.assignments[0].canonical_name, "Zzyxx Unknown Hall");
        assert_eq!(output.assignments[0].resolution, Resolution::Unchanged);
        assert_eq!(output.assignments[0].rating, 0.0);
    }

    #[test]
    fn test_blank_cells_warn_without_aborting() {
        let sources = vec![SourceTable::new("a", ["   ", "Babylon"])];
        let output = BatchCanonicalizer::new(threshold(0.8)).canonicalize(&sources);

        assert_eq!(
            output.warnings,
            vec![BatchWarning::BlankName {
                provider: "a".to_string(),
                row: 0
            }]
        );
        assert_eq!(output.original, vec![vec!["Babylon".to_string()]]);
    }

    #[test]
    fn test_keep_original_policy() {
        let sources = vec![SourceTable::new("a", ["zorlu psm", "Zorlu PSM"])];
        let output = BatchCanonicalizer::new(threshold(0.8))
            .with_policy(RepresentativePolicy::KeepOriginal)
            .canonicalize(&sources);

        assert_eq!(output.changed_count(), 0);
    }
}
