//! CSV loaders for the files written by `storage`.
//!
//! Columns are read by position, so any header labels work.

use crate::models::{CleanRecord, Record};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info, warn};

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))
}

fn text(record: &csv::StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or_default().to_string()
}

/// Empty CSV field → no value.
fn optional_text(record: &csv::StringRecord, idx: usize) -> Option<String> {
    record.get(idx).filter(|s| !s.is_empty()).map(str::to_string)
}

fn optional_number(record: &csv::StringRecord, idx: usize) -> Option<f64> {
    record.get(idx).and_then(|s| s.trim().parse().ok())
}

/// Parse a raw scrape file: country, category, item, value, range.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    debug!("Loading raw rows from {:?}", path);
    let mut reader = reader(path)?;
    let mut records = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {} in {:?}: {}", i + 1, path, e);
                continue;
            }
        };

        records.push(Record {
            country: text(&row, 0),
            category: optional_text(&row, 1),
            item: text(&row, 2),
            value: text(&row, 3),
            range: text(&row, 4),
        });
    }

    info!("{} raw rows loaded from {:?}", records.len(), path);
    Ok(records)
}

/// Parse a cleaned file; rows whose numeric value does not parse are skipped.
pub fn load_clean_records(path: &Path) -> Result<Vec<CleanRecord>> {
    debug!("Loading cleaned rows from {:?}", path);
    let mut reader = reader(path)?;
    let mut rows = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Row {} in {:?}: {}", i + 1, path, e);
                continue;
            }
        };

        let Some(value_clean) = optional_number(&row, 5) else {
            warn!("Row {} in {:?}: no numeric value", i + 1, path);
            continue;
        };

        rows.push(CleanRecord {
            country: text(&row, 0),
            category: optional_text(&row, 1),
            item: text(&row, 2),
            value: text(&row, 3),
            range: text(&row, 4),
            value_clean,
            range_min: optional_number(&row, 6),
            range_max: optional_number(&row, 7),
        });
    }

    info!("{} cleaned rows loaded from {:?}", rows.len(), path);
    Ok(rows)
}
