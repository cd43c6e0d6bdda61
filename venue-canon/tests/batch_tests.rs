//! Batch export and curation import through CSV files

use std::sync::Arc;

use tempfile::TempDir;
use venue_canon::curation::{import_curation, overrides_from_mapping};
use venue_canon::db::SqliteVenueStore;
use venue_canon::engine::{
    BatchCanonicalizer, MatchStage, MatchThreshold, Resolver, ResolverConfig, VenueStore,
};
use venue_canon::sheets;
use venue_common::db::init_database;

fn read_csv(path: &std::path::Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn test_canonicalize_exports_three_sheets() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("sources.csv");
    std::fs::write(
        &input,
        "biletix_events,passo_events\n\
         Zorlu Performing Arts Center PSM,Zorlu PSM\n\
         Babylon,Zorlu PSM\n\
         ,Zzyxx Unknown Hall\n",
    )
    .unwrap();
    let out_dir = dir.path().join("out");

    let sources = sheets::read_source_tables(&input).unwrap();
    let output = BatchCanonicalizer::new(MatchThreshold::new(0.4).unwrap()).canonicalize(&sources);
    sheets::write_batch_output(&out_dir, &output).unwrap();

    let original = read_csv(&out_dir.join(sheets::ORIGINAL_FILE));
    assert_eq!(
        original,
        vec![
            vec!["biletix_events", "passo_events"],
            vec!["Zorlu Performing Arts Center PSM", "Zorlu PSM"],
            vec!["Babylon", "Zzyxx Unknown Hall"],
        ]
    );

    let standardized = read_csv(&out_dir.join(sheets::STANDARDIZED_FILE));
    assert_eq!(standardized[1], vec!["Zorlu PSM", "Zorlu PSM"]);
    assert_eq!(standardized[2], vec!["Babylon", "Zzyxx Unknown Hall"]);

    let overrides = sheets::read_mapping_sheet(&out_dir.join(sheets::OVERRIDES_FILE)).unwrap();
    assert_eq!(overrides.len(), 4);
    assert_eq!(overrides[0].raw_name, "Zorlu Performing Arts Center PSM");
    assert_eq!(overrides[0].canonical_name, "Zorlu PSM");
}

#[test]
fn test_curated_overrides_feed_next_batch() {
    let dir = TempDir::new().unwrap();
    let mapping = dir.path().join("mapping.csv");
    std::fs::write(
        &mapping,
        "raw_name,canonical_name\nBKM Mutfak,Babylon\nBabylon Bomonti,\n",
    )
    .unwrap();

    let overrides = overrides_from_mapping(&sheets::read_mapping_sheet(&mapping).unwrap());
    let sources = vec![venue_canon::engine::SourceTable::new(
        "bugece_events",
        ["bkm mutfak", "Babylon Bomonti"],
    )];

    let output = BatchCanonicalizer::new(MatchThreshold::new(0.8).unwrap())
        .with_overrides(overrides)
        .canonicalize(&sources);

    assert_eq!(output.standardized[0], vec!["Babylon"]);
    assert_eq!(output.standardized[1], vec!["Babylon Bomonti"]);
}

#[tokio::test]
async fn test_import_then_resolve_from_database_file() {
    let dir = TempDir::new().unwrap();
    let canonical = dir.path().join("canonical.csv");
    let mapping = dir.path().join("mapping.csv");
    std::fs::write(
        &canonical,
        "corrected,city,capacity\n\
         Volkswagen Arena,İstanbul,5000\n\
         Zorlu PSM,İstanbul,not-a-number\n\
         zorlu psm,,\n",
    )
    .unwrap();
    std::fs::write(
        &mapping,
        "raw_name,canonical_name\n\
         Zorlu Performing Arts Center PSM,Zorlu PSM\n\
         VW Arena,Volkswagen Arena\n\
         Ghost Hall,Nowhere\n",
    )
    .unwrap();

    let pool = init_database(&dir.path().join("venues.db")).await.unwrap();
    let store = Arc::new(SqliteVenueStore::new(pool));

    let summary = import_curation(
        store.as_ref(),
        &sheets::read_canonical_sheet(&canonical).unwrap(),
        &sheets::read_mapping_sheet(&mapping).unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(summary.canonical_upserted, 2);
    assert_eq!(summary.canonical_skipped, 1);
    assert_eq!(summary.aliases_upserted, 2);
    assert_eq!(summary.aliases_skipped, 1);
    assert_eq!(summary.warnings.len(), 2);

    let venues = store.canonical_venues().await.unwrap();
    assert_eq!(venues.len(), 2);
    assert_eq!(venues[1].capacity, None);

    let resolver = Resolver::new(
        store.clone(),
        ResolverConfig::new(MatchThreshold::new(0.75).unwrap()),
    );
    let decision = resolver
        .resolve("ZORLU PERFORMING ARTS CENTER PSM", "biletix_events")
        .await
        .unwrap();
    assert_eq!(decision.stage, MatchStage::Alias);
    assert_eq!(decision.canonical_id, Some(venues[1].id));

    // Importing again changes nothing
    let again = import_curation(
        store.as_ref(),
        &sheets::read_canonical_sheet(&canonical).unwrap(),
        &sheets::read_mapping_sheet(&mapping).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(again.canonical_upserted, 2);
    assert_eq!(store.canonical_venues().await.unwrap().len(), 2);
}
