use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum SnapshotError {
    /// Network or HTTP failure after the retry budget is spent.
    Transport(String),
    CredentialsMissing(String),
    /// The response carried no `snapshots` collection at all.
    EmptyResponse(String),
    MalformedSymbol { symbol: String, reason: String },
    LocalWrite { path: PathBuf, reason: String },
    RemoteArchive(String),
}

impl SnapshotError {
    pub fn malformed(symbol: &str, reason: impl Into<String>) -> Self {
        SnapshotError::MalformedSymbol {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }

    pub fn local_write(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        SnapshotError::LocalWrite {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Remote archive failures never fail the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SnapshotError::RemoteArchive(_))
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SnapshotError::Transport(msg) => write!(f, "Transport error: {}", msg),
            SnapshotError::CredentialsMissing(msg) => write!(f, "Credentials missing: {}", msg),
            SnapshotError::EmptyResponse(preview) => {
                write!(f, "No snapshots returned: {}", preview)
            }
            SnapshotError::MalformedSymbol { symbol, reason } => {
                write!(f, "Malformed symbol '{}': {}", symbol, reason)
            }
            SnapshotError::LocalWrite { path, reason } => {
                write!(f, "Failed to write {}: {}", path.display(), reason)
            }
            SnapshotError::RemoteArchive(msg) => write!(f, "Remote archive error: {}", msg),
        }
    }
}

impl std::error::Error for SnapshotError {}

impl From<reqwest::Error> for SnapshotError {
    fn from(err: reqwest::Error) -> Self {
        SnapshotError::Transport(err.to_string())
    }
}
