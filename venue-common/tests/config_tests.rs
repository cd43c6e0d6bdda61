//! Configuration resolution tests
//!
//! Tests that manipulate VENUE_CANON_ROOT / VENUE_CANON_CONFIG are marked
//! with #[serial] so they never run in parallel.

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use venue_common::config::{
    resolve_config_path, resolve_root_folder, SelfMatchPolicy, TomlConfig, CONFIG_PATH_ENV,
    ROOT_FOLDER_ENV,
};

#[test]
#[serial]
fn test_cli_argument_beats_environment() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let root = resolve_root_folder(Some(Path::new("/from/cli")));
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(root, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_environment_beats_default() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let root = resolve_root_folder(None);
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(root, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_default_root_folder_is_non_empty() {
    env::remove_var(ROOT_FOLDER_ENV);
    let root = resolve_root_folder(None);

    assert!(!root.as_os_str().is_empty());
    assert!(root.to_string_lossy().contains("venue"));
}

#[test]
#[serial]
fn test_config_path_defaults_to_root_folder() {
    env::remove_var(CONFIG_PATH_ENV);
    let path = resolve_config_path(None, Path::new("/srv/venues"));

    assert_eq!(path, PathBuf::from("/srv/venues/venue-canon.toml"));
}

#[test]
#[serial]
fn test_config_path_from_environment() {
    env::set_var(CONFIG_PATH_ENV, "/etc/venue-canon.toml");
    let path = resolve_config_path(None, Path::new("/srv/venues"));
    env::remove_var(CONFIG_PATH_ENV);

    assert_eq!(path, PathBuf::from("/etc/venue-canon.toml"));
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = TomlConfig::load(&temp_dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.port, 5790);
    assert_eq!(config.matching.threshold, 0.75);
}

#[test]
fn test_config_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("venue-canon.toml");
    std::fs::write(
        &path,
        r#"
database_path = "custom.db"
port = 7000

[matching]
threshold = 0.8
batch_threshold = 0.85
self_match = "exclude"
learn_fuzzy_aliases = true

[providers]
allowed = ["bugece_events", "passo_events"]

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();

    assert_eq!(config.port, 7000);
    assert_eq!(config.matching.threshold, 0.8);
    assert_eq!(config.matching.batch_threshold, 0.85);
    assert_eq!(config.matching.self_match, SelfMatchPolicy::Exclude);
    assert!(config.matching.learn_fuzzy_aliases);
    assert_eq!(config.providers.allowed.len(), 2);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.database_path(temp_dir.path()),
        temp_dir.path().join("custom.db")
    );
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("venue-canon.toml");
    std::fs::write(&path, "port = \"not a number\"\n").unwrap();

    assert!(TomlConfig::load(&path).is_err());
}

#[test]
fn test_invalid_provider_in_allow_list_is_rejected() {
    let result = TomlConfig::parse("[providers]\nallowed = [\"Bad Name\"]\n");
    assert!(result.is_err());
}
