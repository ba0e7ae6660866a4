//! Ingest command implementation
//!
//! Loads a JSON array of records and writes one row per record. Rows are
//! inserted one at a time as each record is normalized; the first bad record
//! stops the run and everything inserted before it stays.

use crate::config::Config;
use crate::error::Result;
use crate::ingest::{normalize_record, read_records, DateField};
use crate::progress::record_progress;
use crate::store::InsightStore;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{error, info, warn};

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub file: String,
    pub records_read: usize,
    pub rows_inserted: usize,
    /// `published` values present but not parseable, stored as null
    pub published_unparsed: usize,
    /// `added` values present but not parseable
    pub added_unparsed: usize,
}

/// Load the records in `path` into the store
pub async fn cmd_ingest(config: &Config, store: &InsightStore, path: &Path) -> Result<IngestStats> {
    info!("Ingesting insights from {}", path.display());

    let records = read_records(path)?;
    let pb = record_progress(records.len(), config.ingest.show_progress, "Ingesting records");

    let result = ingest_records(store, &records, pb.as_ref()).await;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let mut stats = result?;
    stats.file = path.display().to_string();
    info!(
        rows = stats.rows_inserted,
        published_unparsed = stats.published_unparsed,
        "Ingestion complete"
    );
    Ok(stats)
}

/// Normalize and insert records in order, stopping at the first failure
pub async fn ingest_records(
    store: &InsightStore,
    records: &[Value],
    pb: Option<&ProgressBar>,
) -> Result<IngestStats> {
    let mut stats = IngestStats {
        records_read: records.len(),
        ..IngestStats::default()
    };

    for (index, value) in records.iter().enumerate() {
        let normalized = match normalize_record(index, value) {
            Ok(normalized) => normalized,
            Err(e) => {
                error!(
                    record = index,
                    committed = stats.rows_inserted,
                    "Ingestion aborted: {}",
                    e
                );
                return Err(e);
            }
        };

        if normalized.published == DateField::Unparsable {
            stats.published_unparsed += 1;
        }
        if normalized.added == DateField::Unparsable {
            stats.added_unparsed += 1;
        }

        if let Err(e) = store.insert_insight(&normalized.insight).await {
            error!(
                record = index,
                committed = stats.rows_inserted,
                "Insert failed: {}",
                e
            );
            return Err(e);
        }
        stats.rows_inserted += 1;

        if let Some(pb) = pb {
            pb.inc(1);
        }
    }

    if stats.published_unparsed > 0 {
        warn!(
            count = stats.published_unparsed,
            "Some published dates could not be parsed and were stored as null"
        );
    }

    Ok(stats)
}

/// Print ingestion stats to console
pub fn print_ingest_stats(stats: &IngestStats) {
    println!("\n✓ Ingestion complete");
    println!("  File: {}", stats.file);
    println!("  Records read: {}", stats.records_read);
    println!("  Rows inserted: {}", stats.rows_inserted);
    if stats.published_unparsed > 0 {
        println!(
            "  Unparsable 'published' dates (stored as null): {}",
            stats.published_unparsed
        );
    }
    if stats.added_unparsed > 0 {
        println!("  Unparsable 'added' dates: {}", stats.added_unparsed);
    }
}
