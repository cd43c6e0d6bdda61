//! Alias Resolver
//!
//! Exact-key lookup from a normalized name to its canonical target. Manual
//! mappings always take precedence over learned ones; the precedence is
//! applied when a mapping is written, so a lookup is a plain key fetch.

use std::collections::HashMap;
use venue_common::db::{AliasSource, AliasWrite, VenueId};
use venue_common::Result;

use crate::engine::registry::VenueStore;

/// Look up the canonical venue for an already-normalized name
pub async fn resolve_alias(normalized_name: &str, store: &dyn VenueStore) -> Result<Option<VenueId>> {
    let mapping = store.alias_mapping(normalized_name).await?;
    Ok(mapping.map(|m| m.canonical_id))
}

/// Alias entry held by an [`AliasTable`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry<T> {
    pub target: T,
    pub source: AliasSource,
}

/// In-memory alias map keyed by normalized name
///
/// Used as the manual-override table during batch canonicalization
/// (`AliasTable<String>`, target is a canonical display name) and by the
/// in-memory store (`AliasTable<VenueId>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable<T> {
    entries: HashMap<String, AliasEntry<T>>,
}

impl<T> Default for AliasTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Clone> AliasTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping for an already-normalized key, honoring precedence
    pub fn insert(&mut self, key: impl Into<String>, target: T, source: AliasSource) -> AliasWrite {
        let key = key.into();
        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(key, AliasEntry { target, source });
                AliasWrite::Inserted
            }
            Some(existing) if source.may_replace(existing.source) => {
                *existing = AliasEntry { target, source };
                AliasWrite::Updated
            }
            Some(_) => AliasWrite::Kept,
        }
    }

    pub fn get(&self, key: &str) -> Option<&AliasEntry<T>> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
