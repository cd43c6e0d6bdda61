//! Offline venue tools
//!
//! **Usage:**
//! ```bash
//! venue-batch canonicalize --input sources.csv --out-dir out/ [--overrides mapping.csv]
//! venue-batch import --canonical canonical.csv --mapping mapping.csv
//! venue-batch resolve "Volkswagen Arena " --provider bugece_events
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use venue_common::config::{resolve_config_path, resolve_root_folder, TomlConfig};
use venue_common::db::init_database;

use venue_canon::curation::{import_curation, overrides_from_mapping};
use venue_canon::db::SqliteVenueStore;
use venue_canon::engine::{
    AliasTable, BatchCanonicalizer, MatchThreshold, RepresentativePolicy, Resolver,
    ResolverConfig,
};
use venue_canon::logging::init_tracing;
use venue_canon::sheets;

/// Batch canonicalization and curation import
#[derive(Parser, Debug)]
#[command(name = "venue-batch")]
#[command(about = "Offline venue canonicalization and curation tools")]
#[command(version)]
struct Args {
    /// Root folder holding the database and config file
    #[arg(short, long, env = "VENUE_CANON_ROOT", global = true)]
    root_folder: Option<PathBuf>,

    /// Config file (default: <root>/venue-canon.toml)
    #[arg(short, long, env = "VENUE_CANON_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cluster near-duplicate names across providers and export CSV tables
    Canonicalize {
        /// CSV with one column per provider
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Directory for the exported CSV files
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,

        /// Mapping CSV (`raw_name, canonical_name`) of manual overrides
        #[arg(long, value_name = "FILE")]
        overrides: Option<PathBuf>,

        /// Similarity threshold (default: matching.batch_threshold)
        #[arg(long)]
        threshold: Option<f64>,

        /// Leave every name as its own representative
        #[arg(long)]
        keep_original: bool,
    },

    /// Load curated canonical venues and manual aliases into the database
    Import {
        /// Canonical sheet CSV (`corrected, city, capacity`)
        #[arg(long, value_name = "FILE")]
        canonical: PathBuf,

        /// Mapping CSV (`raw_name, canonical_name`)
        #[arg(long, value_name = "FILE")]
        mapping: PathBuf,
    },

    /// Resolve one raw name against the database and print the decision
    Resolve {
        raw_name: String,

        #[arg(long, default_value = "cli")]
        provider: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref());
    let config_path = resolve_config_path(args.config.as_deref(), &root_folder);
    let config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    init_tracing(&config.logging.level);

    match args.command {
        Command::Canonicalize {
            input,
            out_dir,
            overrides,
            threshold,
            keep_original,
        } => {
            let threshold = MatchThreshold::new(threshold.unwrap_or(config.matching.batch_threshold))
                .context("Invalid threshold")?;

            let sources = sheets::read_source_tables(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let overrides = match overrides {
                Some(path) => {
                    let rows = sheets::read_mapping_sheet(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    overrides_from_mapping(&rows)
                }
                None => AliasTable::new(),
            };

            let policy = if keep_original {
                RepresentativePolicy::KeepOriginal
            } else {
                RepresentativePolicy::Shorter
            };

            let output = BatchCanonicalizer::new(threshold)
                .with_overrides(overrides)
                .with_policy(policy)
                .canonicalize(&sources);

            for warning in &output.warnings {
                warn!("{}", warning);
            }

            sheets::write_batch_output(&out_dir, &output)
                .with_context(|| format!("Failed to write exports to {}", out_dir.display()))?;

            info!(
                "Wrote {}, {} and {} to {} ({} of {} names changed)",
                sheets::ORIGINAL_FILE,
                sheets::STANDARDIZED_FILE,
                sheets::OVERRIDES_FILE,
                out_dir.display(),
                output.changed_count(),
                output.assignments.len()
            );
        }

        Command::Import { canonical, mapping } => {
            let canonical_rows = sheets::read_canonical_sheet(&canonical)
                .with_context(|| format!("Failed to read {}", canonical.display()))?;
            let mapping_rows = sheets::read_mapping_sheet(&mapping)
                .with_context(|| format!("Failed to read {}", mapping.display()))?;

            let store = open_store(&config, &root_folder).await?;
            let summary = import_curation(&store, &canonical_rows, &mapping_rows)
                .await
                .context("Import failed")?;

            info!(
                canonical_upserted = summary.canonical_upserted,
                canonical_skipped = summary.canonical_skipped,
                aliases_upserted = summary.aliases_upserted,
                aliases_skipped = summary.aliases_skipped,
                warnings = summary.warnings.len(),
                "Import complete"
            );
        }

        Command::Resolve { raw_name, provider } => {
            let store = Arc::new(open_store(&config, &root_folder).await?);
            let resolver_config = ResolverConfig::from_matching(&config.matching)
                .context("Invalid matching configuration")?;
            let resolver = Resolver::new(store, resolver_config);

            let decision = resolver.resolve(&raw_name, &provider).await?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
    }

    Ok(())
}

async fn open_store(config: &TomlConfig, root_folder: &std::path::Path) -> Result<SqliteVenueStore> {
    let db_path = config.database_path(root_folder);
    info!("Database: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    Ok(SqliteVenueStore::new(pool))
}
