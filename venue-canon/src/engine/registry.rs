//! Canonical Registry
//!
//! [`VenueStore`] is the collaborator contract the engine reads canonical
//! venues and aliases from, and writes decisions and the unmatched queue to.
//! The handle is passed explicitly so tests can substitute
//! [`MemoryVenueStore`](crate::db::MemoryVenueStore) for the SQLite store.
//!
//! [`CanonicalPool`] is the ordered snapshot the Similarity Matcher scores
//! against.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use venue_common::db::{
    AliasMapping, AliasSource, AliasWrite, CanonicalVenue, NewCanonicalVenue, UnmatchedVenue,
    VenueId,
};
use venue_common::Result;

use crate::engine::normalizer::normalize;

/// Registry, alias and queue collaborator
///
/// Implementations must enforce alias-key uniqueness and case-insensitive
/// canonical name uniqueness. Errors are returned as-is; the engine never
/// turns a failed lookup into "no match".
#[async_trait]
pub trait VenueStore: Send + Sync {
    /// Alias mapping for a normalized key
    async fn alias_mapping(&self, key: &str) -> Result<Option<AliasMapping>>;

    /// All canonical venues (any order)
    async fn canonical_venues(&self) -> Result<Vec<CanonicalVenue>>;

    async fn canonical_venue(&self, id: VenueId) -> Result<Option<CanonicalVenue>>;

    /// Insert or update by case-insensitive name; returns the venue id
    async fn upsert_canonical_venue(&self, venue: &NewCanonicalVenue) -> Result<VenueId>;

    /// Write an alias; manual is last-write-wins, learned never replaces
    async fn upsert_alias_mapping(
        &self,
        key: &str,
        canonical_id: VenueId,
        source: AliasSource,
    ) -> Result<AliasWrite>;

    /// Append to the unmatched queue
    async fn enqueue_unmatched(&self, entry: &UnmatchedVenue) -> Result<()>;

    /// Most recently queued entries first
    async fn unmatched_venues(&self, limit: usize) -> Result<Vec<UnmatchedVenue>>;

    /// Record the venue resolved for a provider event
    async fn record_event_venue(
        &self,
        provider: &str,
        event_id: &str,
        canonical_id: VenueId,
        processed_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Canonical venue as seen by the matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub id: VenueId,
    pub normalized_name: String,
    pub display_name: String,
}

/// Canonical venues ordered by normalized name, then id
///
/// The explicit ordering makes "first match wins" reproducible regardless of
/// the order the store returned rows in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalPool {
    entries: Vec<PoolEntry>,
}

impl CanonicalPool {
    pub fn from_venues(venues: impl IntoIterator<Item = CanonicalVenue>) -> Self {
        let mut entries: Vec<PoolEntry> = venues
            .into_iter()
            .map(|v| PoolEntry {
                id: v.id,
                normalized_name: normalize(&v.name),
                display_name: v.name,
            })
            .collect();

        entries.sort_by(|a, b| {
            a.normalized_name
                .cmp(&b.normalized_name)
                .then(a.id.cmp(&b.id))
        });

        Self { entries }
    }

    /// Snapshot the current canonical venues from the store
    pub async fn load(store: &dyn VenueStore) -> Result<Self> {
        Ok(Self::from_venues(store.canonical_venues().await?))
    }

    /// Normalized names in pool order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.normalized_name.as_str())
    }

    pub fn get(&self, index: usize) -> Option<&PoolEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
