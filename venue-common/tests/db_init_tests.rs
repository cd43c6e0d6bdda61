//! Database initialization tests

use sqlx::Row;
use tempfile::TempDir;
use venue_common::db::{init_database, init_memory_database, SCHEMA_VERSION};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("venues.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("venues.db");

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let pool = init_memory_database().await.unwrap();

    let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
        .fetch_all(&pool)
        .await
        .unwrap();
    let tables: Vec<String> = rows.iter().map(|r| r.get::<String, _>("name")).collect();

    for expected in [
        "schema_version",
        "canonical_venues",
        "venue_aliases",
        "unmatched_venues",
        "event_venues",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_alias_key_uniqueness_enforced() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO canonical_venues (name, name_key) VALUES ('JJ Arena', 'jj arena')")
        .execute(&pool)
        .await
        .unwrap();

    let insert = "INSERT INTO venue_aliases (raw_name, canonical_id, source) VALUES ('jj', 1, 'manual')";
    sqlx::query(insert).execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).execute(&pool).await;

    assert!(duplicate.is_err(), "duplicate alias key must violate the primary key");
}

#[tokio::test]
async fn test_canonical_name_key_uniqueness_enforced() {
    let pool = init_memory_database().await.unwrap();

    sqlx::query("INSERT INTO canonical_venues (name, name_key) VALUES ('Zorlu PSM', 'zorlu psm')")
        .execute(&pool)
        .await
        .unwrap();
    let duplicate =
        sqlx::query("INSERT INTO canonical_venues (name, name_key) VALUES ('ZORLU PSM', 'zorlu psm')")
            .execute(&pool)
            .await;

    assert!(duplicate.is_err());
}
