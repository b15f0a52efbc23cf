use crate::config::ColumnLabels;
use crate::models::{CleanRecord, Record};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Extra columns appended after the five raw columns in the cleaned file.
const CLEAN_COLUMNS: [&str; 3] = ["value_clean", "range_min", "range_max"];

// ── Sink ──────────────────────────────────────────────────────────────────────

/// Destination of a finished scrape.
pub trait RecordSink {
    /// Persist every record, returning how many were written.
    fn persist(&mut self, records: &[Record]) -> Result<usize>;
}

/// Writes records as CSV: one header row with the configured labels, then
/// country, category, item, value, range. A missing category is an empty field.
pub struct CsvSink {
    path: PathBuf,
    labels: ColumnLabels,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, labels: ColumnLabels) -> Self {
        Self { path: path.into(), labels }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn persist(&mut self, records: &[Record]) -> Result<usize> {
        let n = write_csv(&self.path, &self.labels.as_row(), records)?;
        info!("{} rows written to {:?}", n, self.path);
        Ok(n)
    }
}

/// Cleaned rows: the raw columns followed by the numeric ones.
pub fn write_clean_csv(path: &Path, labels: &ColumnLabels, rows: &[CleanRecord]) -> Result<usize> {
    let header: Vec<&str> = labels.as_row().into_iter().chain(CLEAN_COLUMNS).collect();
    let n = write_csv(path, &header, rows)?;
    info!("{} cleaned rows written to {:?}", n, path);
    Ok(n)
}

fn write_csv<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row).with_context(|| format!("write row to {:?}", path))?;
    }
    writer.flush()?;

    Ok(rows.len())
}
