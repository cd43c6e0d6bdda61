//! SQLite-backed venue store
//!
//! Alias-key and canonical-name uniqueness are enforced by the schema (see
//! `venue_common::db::init`), so two requests discovering the same alias at
//! once cannot both insert it.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;
use venue_common::db::{
    AliasMapping, AliasSource, AliasWrite, CanonicalVenue, NewCanonicalVenue, UnmatchedVenue,
    VenueId,
};
use venue_common::{Error, Result};

use crate::engine::registry::VenueStore;

/// Venue store over the shared SQLite pool
#[derive(Clone)]
pub struct SqliteVenueStore {
    db: SqlitePool,
}

impl SqliteVenueStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

fn venue_from_row(row: &SqliteRow) -> CanonicalVenue {
    CanonicalVenue {
        id: row.get("id"),
        name: row.get("name"),
        city: row.get("city"),
        capacity: row.get("capacity"),
    }
}

fn unmatched_from_row(row: &SqliteRow) -> Result<UnmatchedVenue> {
    let guid_str: String = row.get("guid");
    let queued_str: String = row.get("queued_at");

    let guid = Uuid::parse_str(&guid_str)
        .map_err(|e| Error::Internal(format!("Invalid UUID in unmatched_venues: {}", e)))?;
    let queued_at = DateTime::parse_from_rfc3339(&queued_str)
        .map_err(|e| Error::Internal(format!("Invalid timestamp in unmatched_venues: {}", e)))?
        .with_timezone(&Utc);

    Ok(UnmatchedVenue {
        guid,
        raw_name: row.get("raw_name"),
        provider: row.get("provider"),
        queued_at,
    })
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl VenueStore for SqliteVenueStore {
    async fn alias_mapping(&self, key: &str) -> Result<Option<AliasMapping>> {
        let row: Option<(String, i64, String)> = sqlx::query_as(
            "SELECT raw_name, canonical_id, source FROM venue_aliases WHERE raw_name = ?",
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await?;

        row.map(|(raw_name, canonical_id, source)| {
            Ok(AliasMapping {
                raw_name,
                canonical_id,
                source: source.parse()?,
            })
        })
        .transpose()
    }

    async fn canonical_venues(&self) -> Result<Vec<CanonicalVenue>> {
        let rows = sqlx::query("SELECT id, name, city, capacity FROM canonical_venues ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        Ok(rows.iter().map(venue_from_row).collect())
    }

    async fn canonical_venue(&self, id: VenueId) -> Result<Option<CanonicalVenue>> {
        let row = sqlx::query("SELECT id, name, city, capacity FROM canonical_venues WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.as_ref().map(venue_from_row))
    }

    async fn upsert_canonical_venue(&self, venue: &NewCanonicalVenue) -> Result<VenueId> {
        let name = venue.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Canonical venue name is blank".to_string()));
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO canonical_venues (name, name_key, city, capacity)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name_key) DO UPDATE SET
                name = excluded.name,
                city = excluded.city,
                capacity = excluded.capacity,
                updated_at = CURRENT_TIMESTAMP
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(venue.name_key())
        .bind(&venue.city)
        .bind(venue.capacity)
        .fetch_one(&self.db)
        .await?;

        tracing::debug!(name = %name, id, "Upserted canonical venue");

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

        let mut tx = self.db.begin().await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT source FROM venue_aliases WHERE raw_name = ?")
                .bind(key)
                .fetch_optional(&mut *tx)
                .await?;

        let outcome = match existing {
            None => {
                // DO NOTHING covers a concurrent insert of the same key
                let result = sqlx::query(
                    r#"
                    INSERT INTO venue_aliases (raw_name, canonical_id, source)
                    VALUES (?, ?, ?)
                    ON CONFLICT(raw_name) DO NOTHING
                    "#,
                )
                .bind(key)
                .bind(canonical_id)
                .bind(source.as_str())
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    AliasWrite::Kept
                } else {
                    AliasWrite::Inserted
                }
            }
            Some(existing) => {
                let existing: AliasSource = existing.parse()?;
                if source.may_replace(existing) {
                    sqlx::query(
                        r#"
                        UPDATE venue_aliases
                        SET canonical_id = ?, source = ?, updated_at = CURRENT_TIMESTAMP
                        WHERE raw_name = ?
                        "#,
                    )
                    .bind(canonical_id)
                    .bind(source.as_str())
                    .bind(key)
                    .execute(&mut *tx)
                    .await?;
                    AliasWrite::Updated
                } else {
                    AliasWrite::Kept
                }
            }
        };

        tx.commit().await?;

        tracing::debug!(key = %key, canonical_id, %source, ?outcome, "Upserted alias mapping");

        Ok(outcome)
    }

    async fn enqueue_unmatched(&self, entry: &UnmatchedVenue) -> Result<()> {
        sqlx::query(
            "INSERT INTO unmatched_venues (guid, raw_name, provider, queued_at) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.guid.to_string())
        .bind(&entry.raw_name)
        .bind(&entry.provider)
        .bind(timestamp(&entry.queued_at))
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn unmatched_venues(&self, limit: usize) -> Result<Vec<UnmatchedVenue>> {
        let rows = sqlx::query(
            r#"
            SELECT guid, raw_name, provider, queued_at
            FROM unmatched_venues
            ORDER BY queued_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(unmatched_from_row).collect()
    }

    async fn record_event_venue(
        &self,
        provider: &str,
        event_id: &str,
        canonical_id: VenueId,
        processed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO event_venues (provider, event_id, canonical_venue_id, processed_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(provider, event_id) DO UPDATE SET
                canonical_venue_id = excluded.canonical_venue_id,
                processed_at = excluded.processed_at
            "#,
        )
        .bind(provider)
        .bind(event_id)
        .bind(canonical_id)
        .bind(timestamp(&processed_at))
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
