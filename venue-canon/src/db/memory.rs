//! In-memory venue store
//!
//! Same contract as the SQLite store. Lookups and queue writes can be made to
//! fail on demand so callers can check that failures surface as errors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use venue_common::db::{
    venue_name_key, AliasMapping, AliasSource, AliasWrite, CanonicalVenue, NewCanonicalVenue,
    UnmatchedVenue, VenueId,
};
use venue_common::{Error, Result};

use crate::engine::alias::AliasTable;
use crate::engine::registry::VenueStore;

#[derive(Default)]
struct Inner {
    venues: Vec<CanonicalVenue>,
    aliases: AliasTable<VenueId>,
    unmatched: Vec<UnmatchedVenue>,
    events: HashMap<(String, String), (VenueId, DateTime<Utc>)>,
}

/// Venue store kept in process memory
#[derive(Default)]
pub struct MemoryVenueStore {
    inner: RwLock<Inner>,
    fail_lookups: AtomicBool,
    fail_queue: AtomicBool,
}

impl MemoryVenueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with canonical venues (ids assigned 1, 2, ...)
    pub async fn with_venues(names: &[&str]) -> Result<Self> {
        let store = Self::new();
        for name in names {
            store.upsert_canonical_venue(&NewCanonicalVenue::named(*name)).await?;
        }
        Ok(store)
    }

    /// Make alias and registry reads fail
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make unmatched-queue writes fail
    pub fn set_fail_queue(&self, fail: bool) {
        self.fail_queue.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the unmatched queue in insertion order
    pub async fn queued(&self) -> Vec<UnmatchedVenue> {
        self.inner.read().await.unmatched.clone()
    }

    /// Venue recorded for a provider event
    pub async fn event_venue(&self, provider: &str, event_id: &str) -> Option<VenueId> {
        self.inner
            .read()
            .await
            .events
            .get(&(provider.to_string(), event_id.to_string()))
            .map(|(id, _)| *id)
    }

    fn check_lookup(&self) -> Result<()> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(Error::Internal("lookup failure injected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl VenueStore for MemoryVenueStore {
    async fn alias_mapping(&self, key: &str) -> Result<Option<AliasMapping>> {
        self.check_lookup()?;
        let inner = self.inner.read().await;
        Ok(inner.aliases.get(key).map(|entry| AliasMapping {
            raw_name: key.to_string(),
            canonical_id: entry.target,
            source: entry.source,
        }))
    }

    async fn canonical_venues(&self) -> Result<Vec<CanonicalVenue>> {
        self.check_lookup()?;
        Ok(self.inner.read().await.venues.clone())
    }

    async fn canonical_venue(&self, id: VenueId) -> Result<Option<CanonicalVenue>> {
        self.check_lookup()?;
        let inner = self.inner.read().await;
        Ok(inner.venues.iter().find(|v| v.id == id).cloned())
    }

    async fn upsert_canonical_venue(&self, venue: &NewCanonicalVenue) -> Result<VenueId> {
        let name = venue.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Canonical venue name is blank".to_string()));
        }

        let key = venue.name_key();
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.venues.iter_mut().find(|v| venue_name_key(&v.name) == key) {
            existing.name = name.to_string();
            existing.city = venue.city.clone();
            existing.capacity = venue.capacity;
            return Ok(existing.id);
        }

        let id = inner.venues.iter().map(|v| v.id).max().unwrap_or(0) + 1;
        inner.venues.push(CanonicalVenue {
            id,
            name: name.to_string(),
            city: venue.city.clone(),
            capacity: venue.capacity,
        });
        Ok(id)
    }

    async fn upsert_alias_mapping(
        &self,
        key: &str,
        canonical_id: VenueId,
        source: AliasSource,
    ) -> Result<AliasWrite> {
        if key.is_empty() {
            return Err(Error::InvalidInput("Alias key is blank".to_string()));
        }

        let mut inner = self.inner.write().await;
        if !inner.venues.iter().any(|v| v.id == canonical_id) {
            return Err(Error::NotFound(format!("canonical venue {}", canonical_id)));
        }
        Ok(inner.aliases.insert(key, canonical_id, source))
    }

    async fn enqueue_unmatched(&self, entry: &UnmatchedVenue) -> Result<()> {
        if self.fail_queue.load(Ordering::SeqCst) {
            return Err(Error::Internal("queue failure injected".to_string()));
        }
        self.inner.write().await.unmatched.push(entry.clone());
        Ok(())
    }

    async fn unmatched_venues(&self, limit: usize) -> Result<Vec<UnmatchedVenue>> {
        self.check_lookup()?;
        let inner = self.inner.read().await;
        Ok(inner.unmatched.iter().rev().take(limit).cloned().collect())
    }

    async fn record_event_venue(
        &self,
        provider: &str,
        event_id: &str,
        canonical_id: VenueId,
        processed_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.events.insert(
            (provider.to_string(), event_id.to_string()),
            (canonical_id, processed_at),
        );
        Ok(())
    }
}
