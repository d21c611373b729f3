// Typed CSV tables
// Every table is read whole and written whole; rows are validated against
// their record type here so the rest of the crate never sees raw columns.

use std::fs;
use std::path::Path;

use radar_types::ArtistKeyed;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CollectError, CollectResult};
use crate::merge::dedup_last_write_wins;

/// Read every valid row of `path`. Rows that don't fit `T` are logged and
/// dropped.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> CollectResult<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (line, record) in rdr.deserialize::<T>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => warn!(
                "⚠️  Skipping malformed row {} in {}: {}",
                line + 2,
                path.display(),
                e
            ),
        }
    }

    debug!("📥 Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Like [`read_table`] but a missing file is `None` rather than an error.
pub fn read_optional_table<T: DeserializeOwned>(path: &Path) -> CollectResult<Option<Vec<T>>> {
    if !path.exists() {
        return Ok(None);
    }
    read_table(path).map(Some)
}

/// Replace `path` with `rows`. Writes to a sibling temp file first so a
/// crash never leaves a half-written table.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> CollectResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("csv.tmp");
    {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
    }
    fs::rename(&tmp, path)?;
    debug!("💾 Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertSummary {
    pub existing: usize,
    pub added: usize,
    pub total: usize,
}

/// Append `rows` to the table at `path`, keeping only the most recently
/// written row per artist.
pub fn upsert_table<T>(path: &Path, rows: Vec<T>) -> CollectResult<UpsertSummary>
where
    T: Serialize + DeserializeOwned + ArtistKeyed,
{
    let existing: Vec<T> = read_optional_table(path)?.unwrap_or_default();
    let existing_len = existing.len();
    let added = rows.len();

    let mut combined = existing;
    combined.extend(rows);
    let combined = dedup_last_write_wins(combined);

    write_table(path, &combined)?;

    Ok(UpsertSummary {
        existing: existing_len,
        added,
        total: combined.len(),
    })
}

/// Row count of a table, zero when it doesn't exist or can't be read.
pub fn count_rows(path: &Path) -> usize {
    let Ok(mut rdr) = csv::Reader::from_path(path) else {
        return 0;
    };
    rdr.records().filter(|r| r.is_ok()).count()
}

pub fn remove_table(path: &Path) -> CollectResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CollectError::Io(e)),
    }
}
