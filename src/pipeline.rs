use crate::alpaca_client::SnapshotSource;
use crate::archive::{archive_snapshot, ArchiveReport, RemoteStorage};
use crate::config::RunConfig;
use crate::error::SnapshotError;
use crate::models::RejectedEntry;
use crate::processor::build_table;
use crate::timing::Timer;
use crate::writer::write_snapshot;
use chrono::NaiveDateTime;
use std::path::PathBuf;
use tracing::{info, warn};

/// Result of one successful run. Archive problems live in `archive`, they
/// never turn the run into an error.
#[derive(Debug)]
pub struct RunSummary {
    pub csv_path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub rejected: Vec<RejectedEntry>,
    pub archive: Option<ArchiveReport>,
}

/// fetch -> build table -> write local -> archive remote.
///
/// Everything up to the local write is fail-fast. `storage` is optional and
/// only used when `config.drive_folder_id` is set.
pub async fn run(
    config: &RunConfig,
    source: &dyn SnapshotSource,
    storage: Option<&dyn RemoteStorage>,
    now: NaiveDateTime,
) -> Result<RunSummary, SnapshotError> {
    // Step 1: fetch
    let timer = Timer::start("fetch");
    let response = source.fetch_snapshots(&config.underlying).await?;
    timer.stop();

    // Step 2: flatten
    let table = Timer::measure("build_table", || {
        build_table(&response, config.underlying.len(), config.row_policy)
    })?;
    info!(
        underlying = %config.underlying,
        rows = table.len(),
        rejected = table.rejected.len(),
        "Built snapshot table"
    );

    // Step 3: local write
    let timer = Timer::start("write_local");
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| SnapshotError::local_write(&config.output_dir, e))?;
    let prefix = config.snapshot_prefix();
    let csv_path = write_snapshot(&config.output_dir, &prefix, &table, now)?;
    timer.stop();

    // Step 4: remote archive (best effort)
    let archive = match (storage, config.drive_folder_id.as_deref()) {
        (Some(storage), Some(folder_id)) => {
            let timer = Timer::start("archive_remote");
            let report = archive_snapshot(storage, &csv_path, folder_id, &prefix, config.keep_last).await;
            timer.stop();
            Some(report)
        }
        (None, Some(_)) => {
            warn!("Remote storage not configured, skipping archive");
            None
        }
        (_, None) => {
            warn!("No remote folder configured, skipping archive");
            None
        }
    };

    Ok(RunSummary {
        csv_path,
        rows: table.len(),
        columns: table.columns().len(),
        rejected: table.rejected,
        archive,
    })
}
