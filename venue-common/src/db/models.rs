//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Canonical venue identifier (`canonical_venues.id`)
pub type VenueId = i64;

/// The single authoritative record for one physical venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalVenue {
    pub id: VenueId,
    /// Display ("corrected") spelling
    pub name: String,
    pub city: Option<String>,
    pub capacity: Option<i64>,
}

/// Input for a canonical venue upsert
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewCanonicalVenue {
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub capacity: Option<i64>,
}

impl NewCanonicalVenue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Case-insensitive uniqueness key stored in `canonical_venues.name_key`
    pub fn name_key(&self) -> String {
        venue_name_key(&self.name)
    }
}

/// Key under which canonical venue names are unique
pub fn venue_name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Provenance of an alias mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasSource {
    /// Curated by a person; always wins
    Manual,
    /// Recorded from an earlier fuzzy decision
    Learned,
}

impl AliasSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasSource::Manual => "manual",
            AliasSource::Learned => "learned",
        }
    }

    /// Whether a mapping from `self` may replace one from `existing`
    ///
    /// Manual writes are last-write-wins. Learned writes never replace an
    /// existing mapping.
    pub fn may_replace(&self, _existing: AliasSource) -> bool {
        matches!(self, AliasSource::Manual)
    }
}

impl fmt::Display for AliasSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AliasSource {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(AliasSource::Manual),
            "learned" => Ok(AliasSource::Learned),
            other => Err(crate::Error::Internal(format!(
                "Unknown alias source: {}",
                other
            ))),
        }
    }
}

/// Normalized raw name mapped to a canonical venue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasMapping {
    pub raw_name: String,
    pub canonical_id: VenueId,
    pub source: AliasSource,
}

/// Outcome of an alias upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasWrite {
    Inserted,
    Updated,
    /// An existing mapping took precedence and was left untouched
    Kept,
}

/// Queued raw name awaiting manual curation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedVenue {
    pub guid: Uuid,
    pub raw_name: String,
    pub provider: String,
    pub queued_at: DateTime<Utc>,
}

impl UnmatchedVenue {
    pub fn new(raw_name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            guid: Uuid::new_v4(),
            raw_name: raw_name.into(),
            provider: provider.into(),
            queued_at: Utc::now(),
        }
    }
}
