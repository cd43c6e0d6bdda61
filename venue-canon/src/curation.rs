//! Curation import
//!
//! Loads curator-edited sheets into the registry: canonical venues first,
//! then manual alias mappings pointing at them. Bad rows are skipped with a
//! warning; store failures abort the import.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use venue_common::db::{venue_name_key, AliasSource, NewCanonicalVenue, VenueId};
use venue_common::Result;

use crate::engine::alias::AliasTable;
use crate::engine::normalizer::normalize;
use crate::engine::registry::VenueStore;
use crate::sheets::{CanonicalRow, MappingRow};

/// Counts and per-row warnings from an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub canonical_upserted: usize,
    pub canonical_skipped: usize,
    pub aliases_upserted: usize,
    pub aliases_skipped: usize,
    pub warnings: Vec<String>,
}

impl ImportSummary {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Parse the capacity cell; blank is `None`
fn parse_capacity(cell: &str) -> std::result::Result<Option<i64>, String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<i64>()
        .map(Some)
        .map_err(|_| format!("invalid capacity {:?}", cell))
}

/// Upsert canonical venues, then manual aliases
pub async fn import_curation(
    store: &dyn VenueStore,
    canonical_rows: &[CanonicalRow],
    mapping_rows: &[MappingRow],
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    // name_key -> id, limited to venues named in this sheet
    let mut ids: HashMap<String, VenueId> = HashMap::new();

    for (row, r) in canonical_rows.iter().enumerate() {
        let name = r.corrected.trim();
        if name.is_empty() {
            summary.canonical_skipped += 1;
            continue;
        }

        let key = venue_name_key(name);
        if ids.contains_key(&key) {
            info!("Skipping canonical row {}: already have {:?}", row + 1, name);
            summary.canonical_skipped += 1;
            continue;
        }

        let capacity = match parse_capacity(&r.capacity) {
            Ok(capacity) => capacity,
            Err(e) => {
                summary.warn(format!("canonical row {} ({}): {}", row + 1, name, e));
                None
            }
        };
        let city = Some(r.city.trim()).filter(|c| !c.is_empty()).map(str::to_string);

        let id = store
            .upsert_canonical_venue(&NewCanonicalVenue {
                name: name.to_string(),
                city,
                capacity,
            })
            .await?;
        ids.insert(key, id);
        summary.canonical_upserted += 1;
    }

    info!("canonical_venues upsert: {} rows", summary.canonical_upserted);

    let mut seen_raw: HashSet<String> = HashSet::new();
    for (row, r) in mapping_rows.iter().enumerate() {
        let raw = normalize(&r.raw_name);
        let canonical = match r.canonical_name.trim() {
            "" => r.raw_name.trim(),
            name => name,
        };
        if raw.is_empty() || canonical.is_empty() {
            summary.aliases_skipped += 1;
            continue;
        }

        if !seen_raw.insert(raw.clone()) {
            info!("Skipping mapping row {}: duplicate raw_name {:?}", row + 1, raw);
            summary.aliases_skipped += 1;
            continue;
        }

        let Some(&canonical_id) = ids.get(&venue_name_key(canonical)) else {
            summary.warn(format!("no canonical for \"{}\" (mapping row {})", canonical, row + 1));
            summary.aliases_skipped += 1;
            continue;
        };

        store
            .upsert_alias_mapping(&raw, canonical_id, AliasSource::Manual)
            .await?;
        summary.aliases_upserted += 1;
    }

    info!("venue_aliases upsert: {} rows", summary.aliases_upserted);

    Ok(summary)
}

/// Build the batch override table from mapping rows
///
/// Blank canonical names fall back to the raw name and the first row for a
/// raw key wins, as in the import.
pub fn overrides_from_mapping(rows: &[MappingRow]) -> AliasTable<String> {
    let mut table = AliasTable::new();
    for (row, r) in rows.iter().enumerate() {
        let key = normalize(&r.raw_name);
        if key.is_empty() {
            continue;
        }
        if table.get(&key).is_some() {
            info!("Skipping mapping row {}: duplicate raw_name {:?}", row + 1, key);
            continue;
        }
        let canonical = match r.canonical_name.trim() {
            "" => r.raw_name.trim(),
            name => name,
        };
        table.insert(key, canonical.to_string(), AliasSource::Manual);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryVenueStore;

    fn canonical(corrected: &str, city: &str, capacity: &str) -> CanonicalRow {
        CanonicalRow {
            corrected: corrected.to_string(),
            city: city.to_string(),
            capacity: capacity.to_string(),
        }
    }

    fn mapping(raw_name: &str, canonical_name: &str) -> MappingRow {
        MappingRow {
            raw_name: raw_name.to_string(),
            canonical_name: canonical_name.to_string(),
        }
    }

    #[test]
    fn test_parse_capacity() {
        assert_eq!(parse_capacity(""), Ok(None));
        assert_eq!(parse_capacity(" 4500 "), Ok(Some(4500)));
        assert!(parse_capacity("about 4000").is_err());
    }

    #[tokio::test]
    async fn test_import_canonical_and_mapping() {
        let store = MemoryVenueStore::new();
        let summary = import_curation(
            &store,
            &[
                canonical("Volkswagen Arena", "İstanbul", "5000"),
                canonical("JJ Arena", "", ""),
                canonical("jj arena", "", ""),
                canonical("", "", ""),
            ],
            &[
                mapping("Istanbul JJ Arena", "JJ Arena"),
                mapping("VW Arena", "volkswagen arena"),
                mapping("istanbul jj arena", "Volkswagen Arena"),
                mapping("Nowhere Hall", "Nowhere"),
                mapping("JJ Arena", ""),
            ],
        )
        .await
        .unwrap();

        assert_eq!(summary.canonical_upserted, 2);
        assert_eq!(summary.canonical_skipped, 2);
        assert_eq!(summary.aliases_upserted, 3);
        assert_eq!(summary.aliases_skipped, 2);
        assert_eq!(summary.warnings, vec!["no canonical for \"Nowhere\" (mapping row 4)"]);

        let jj = store.alias_mapping("istanbul jj arena").await.unwrap().unwrap();
        let venues = store.canonical_venues().await.unwrap();
        let jj_venue = venues.iter().find(|v| v.id == jj.canonical_id).unwrap();
        assert_eq!(jj_venue.name, "JJ Arena");

        let vw = store.alias_mapping("vw arena").await.unwrap().unwrap();
        let vw_venue = venues.iter().find(|v| v.id == vw.canonical_id).unwrap();
        assert_eq!(vw_venue.capacity, Some(5000));
        assert_eq!(vw_venue.city.as_deref(), Some("İstanbul"));

        // Blank canonical_name falls back to the raw name itself
        assert!(store.alias_mapping("jj arena").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_capacity_warns_and_continues() {
        let store = MemoryVenueStore::new();
        let summary = import_curation(&store, &[canonical("Babylon", "", "lots")], &[])
            .await
            .unwrap();

        assert_eq!(summary.canonical_upserted, 1);
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(store.canonical_venues().await.unwrap()[0].capacity, None);
    }

    #[test]
    fn test_overrides_from_mapping() {
        let table = overrides_from_mapping(&[
            mapping("İstanbul JJ Arena", "JJ Arena"),
            mapping("Babylon ", ""),
            mapping("", "Ghost"),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("istanbul jj arena").unwrap().target, "JJ Arena");
        assert_eq!(table.get("babylon").unwrap().target, "Babylon");
    }

    #[tokio::test]
    async fn test_duplicate_raw_key_first_row_wins_in_both_paths() {
        let rows = [
            mapping("Babylon Bomonti", "Babylon"),
            mapping("babylon bomonti", "Bomonti"),
        ];

        let table = overrides_from_mapping(&rows);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("babylon bomonti").unwrap().target, "Babylon");

        let store = MemoryVenueStore::new();
        import_curation(
            &store,
            &[canonical("Babylon", "", ""), canonical("Bomonti", "", "")],
            &rows,
        )
        .await
        .unwrap();
        let alias = store.alias_mapping("babylon bomonti").await.unwrap().unwrap();
        let venue = store.canonical_venue(alias.canonical_id).await.unwrap().unwrap();
        assert_eq!(venue.name, "Babylon");
    }
}
