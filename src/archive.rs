use crate::error::SnapshotError;
use crate::models::{ArchiveFile, UploadedArchive};
use async_trait::async_trait;
use std::path::Path;
use tracing::{error, info, warn};

/// Remote folder holding past snapshot files.
///
/// Implementations own authentication. `list` should return newest first,
/// but callers sort again by `created_time`.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    async fn list(&self, folder_id: &str, name_prefix: &str) -> Result<Vec<ArchiveFile>, SnapshotError>;

    async fn delete(&self, file_id: &str) -> Result<(), SnapshotError>;

    async fn upload(&self, local_path: &Path, folder_id: &str) -> Result<UploadedArchive, SnapshotError>;
}

/// What one archive pass did. Never an error: the local file is already safe.
#[derive(Debug, Default)]
pub struct ArchiveReport {
    pub deleted: Vec<ArchiveFile>,
    pub delete_failures: Vec<(ArchiveFile, String)>,
    pub uploaded: Option<UploadedArchive>,
    pub error: Option<String>,
}

impl ArchiveReport {
    pub fn uploaded_id(&self) -> Option<&str> {
        self.uploaded.as_ref().map(|u| u.id.as_str())
    }
}

/// Files to delete so that, after one more upload, at most `keep_last` remain.
///
/// `existing` must be newest first. The newest `keep_last - 1` are kept.
pub fn select_for_deletion(existing: &[ArchiveFile], keep_last: usize) -> &[ArchiveFile] {
    let keep_last = keep_last.max(1);
    if existing.len() >= keep_last {
        &existing[keep_last - 1..]
    } else {
        &[]
    }
}

/// Prune old archives then upload `local_path` into `folder_id`.
pub async fn archive_snapshot<S>(
    storage: &S,
    local_path: &Path,
    folder_id: &str,
    name_prefix: &str,
    keep_last: usize,
) -> ArchiveReport
where
    S: RemoteStorage + ?Sized,
{
    let mut report = ArchiveReport::default();

    let mut existing = match storage.list(folder_id, name_prefix).await {
        Ok(files) => files,
        Err(e) => {
            error!(error = %e, "Failed to list remote archives");
            report.error = Some(e.to_string());
            return report;
        }
    };
    existing.sort_by(|a, b| b.created_time.cmp(&a.created_time));

    for file in select_for_deletion(&existing, keep_last) {
        match storage.delete(&file.id).await {
            Ok(()) => {
                info!(name = %file.name, "Deleted old archive");
                report.deleted.push(file.clone());
            }
            Err(e) => {
                warn!(name = %file.name, error = %e, "Failed to delete old archive");
                report.delete_failures.push((file.clone(), e.to_string()));
            }
        }
    }

    match storage.upload(local_path, folder_id).await {
        Ok(uploaded) => {
            info!(
                name = %uploaded.name,
                link = uploaded.view_link.as_deref().unwrap_or("-"),
                "Uploaded snapshot archive"
            );
            report.uploaded = Some(uploaded);
        }
        Err(e) => {
            error!(error = %e, path = %local_path.display(), "Failed to upload snapshot archive");
            report.error = Some(e.to_string());
        }
    }

    report
}
