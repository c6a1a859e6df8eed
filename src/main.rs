use chrono::Local;
use colored::Colorize;
use options_snapshot::credentials::{default_providers, resolve_credentials};
use options_snapshot::{
    logging, pipeline, AlpacaClient, DriveCredentials, GoogleDriveStorage, RemoteStorage,
    RunConfig, RunSummary, SnapshotError,
};
use std::process::ExitCode;
use tracing::{error, warn};

/// Optional Drive client; any problem here only disables archiving.
fn build_storage(config: &RunConfig) -> Option<GoogleDriveStorage> {
    config.drive_folder_id.as_ref()?;

    match DriveCredentials::from_env().and_then(|c| c.map(GoogleDriveStorage::new).transpose()) {
        Ok(Some(storage)) => Some(storage),
        Ok(None) => {
            println!("{} GOOGLE_DRIVE_CREDENTIALS not found, skipping upload", "⚠".yellow());
            None
        }
        Err(e) => {
            warn!(error = %e, "Drive storage unavailable");
            println!("{} {}", "⚠".yellow(), e);
            None
        }
    }
}

async fn run_snapshot(config: &RunConfig) -> Result<RunSummary, SnapshotError> {
    let credentials = resolve_credentials(&default_providers(&config.credentials_file))?;
    let client = AlpacaClient::new(&credentials, &config.feed, config.limit, config.retry.clone())?;
    let storage = build_storage(config);

    pipeline::run(
        config,
        &client,
        storage.as_ref().map(|s| s as &dyn RemoteStorage),
        Local::now().naive_local(),
    )
    .await
}

fn print_summary(summary: &RunSummary) {
    println!("{} Saved snapshots to: {}", "✓".green(), summary.csv_path.display());
    println!("{} Total options captured: {}", "✓".green(), summary.rows);
    println!("{} Columns: {}", "ℹ".blue(), summary.columns);

    if !summary.rejected.is_empty() {
        println!("{} Skipped entries: {}", "⚠".yellow(), summary.rejected.len());
        for rejected in summary.rejected.iter().take(10) {
            println!("  {} {} → {}", "✗".red(), rejected.symbol.yellow(), rejected.reason);
        }
        if summary.rejected.len() > 10 {
            println!("  ... and {} more", summary.rejected.len() - 10);
        }
    }

    if let Some(report) = &summary.archive {
        for file in &report.deleted {
            println!("{} Deleted old file: {}", "✓".green(), file.name);
        }
        for (file, reason) in &report.delete_failures {
            println!("{} Could not delete {}: {}", "⚠".yellow(), file.name, reason);
        }
        match (&report.uploaded, &report.error) {
            (Some(uploaded), _) => {
                println!("{} File uploaded to Google Drive: {}", "✓".green(), uploaded.name);
                if let Some(link) = &uploaded.view_link {
                    println!("{} View link: {}", "✓".green(), link);
                }
            }
            (None, Some(e)) => println!("{} Error uploading to Google Drive: {}", "✗".red(), e),
            (None, None) => {}
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = RunConfig::from_env();

    if let Err(e) = logging::init_logging(&config.log_dir) {
        eprintln!("Failed to set up file logging in {}: {}", config.log_dir.display(), e);
    }

    println!("{}", "=".repeat(60).blue());
    println!("{}", format!("{} Options Snapshot", config.underlying).green().bold());
    println!("{}", "=".repeat(60).blue());

    match run_snapshot(&config).await {
        Ok(summary) => {
            print_summary(&summary);
            println!("{}", "Done!".green().bold());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, fatal = e.is_fatal(), "Snapshot run failed");
            eprintln!("{} Error {} has occurred.", "✗".red(), e);
            ExitCode::FAILURE
        }
    }
}
