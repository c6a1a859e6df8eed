use crate::error::SnapshotError;
use crate::models::SnapshotTable;
use chrono::NaiveDateTime;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Second precision; sorts the same lexically and chronologically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub fn snapshot_file_name(prefix: &str, timestamp: NaiveDateTime) -> String {
    format!("{}_{}.csv", prefix, timestamp.format(TIMESTAMP_FORMAT))
}

/// Replace every `prefix*` file in `output_dir` with one new CSV.
///
/// Old artifacts are removed before the new file exists, so a failure in
/// between leaves no local artifact for this prefix.
pub fn write_snapshot(
    output_dir: &Path,
    prefix: &str,
    table: &SnapshotTable,
    timestamp: NaiveDateTime,
) -> Result<PathBuf, SnapshotError> {
    let removed = remove_previous(output_dir, prefix)?;
    if removed > 0 {
        info!(removed, dir = %output_dir.display(), "Removed previous snapshot files");
    }

    let path = output_dir.join(snapshot_file_name(prefix, timestamp));
    write_csv(&path, table)?;

    info!(path = %path.display(), rows = table.len(), "Saved snapshot table");
    Ok(path)
}

fn remove_previous(output_dir: &Path, prefix: &str) -> Result<usize, SnapshotError> {
    let entries = fs::read_dir(output_dir).map_err(|e| SnapshotError::local_write(output_dir, e))?;

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| SnapshotError::local_write(output_dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(prefix) {
            continue;
        }

        let path = entry.path();
        if path.is_dir() {
            warn!(path = %path.display(), "Directory matches snapshot prefix, leaving it");
            continue;
        }
        fs::remove_file(&path).map_err(|e| SnapshotError::local_write(&path, e))?;
        removed += 1;
    }

    Ok(removed)
}

fn write_csv(path: &Path, table: &SnapshotTable) -> Result<(), SnapshotError> {
    let columns = table.columns();

    let mut wtr = csv::Writer::from_path(path).map_err(|e| SnapshotError::local_write(path, e))?;

    if !columns.is_empty() {
        wtr.write_record(&columns)
            .map_err(|e| SnapshotError::local_write(path, e))?;
    }

    for record in &table.records {
        let row = columns
            .iter()
            .map(|col| record.get(col).map(cell_text).unwrap_or_default());
        wtr.write_record(row)
            .map_err(|e| SnapshotError::local_write(path, e))?;
    }

    wtr.flush().map_err(|e| SnapshotError::local_write(path, e))?;
    Ok(())
}

/// Text for one CSV cell. Strings go out raw, null is empty.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
