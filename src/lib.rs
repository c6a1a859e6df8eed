pub mod alpaca_client;
pub mod archive;
pub mod config;
pub mod credentials;
pub mod drive;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod symbol;
pub mod timing;
pub mod writer;

#[cfg(test)]
mod stub_server;

// Re-exports for convenience
pub use alpaca_client::{AlpacaClient, SnapshotSource};
pub use archive::{archive_snapshot, select_for_deletion, ArchiveReport, RemoteStorage};
pub use config::{RetryPolicy, RowPolicy, RunConfig};
pub use credentials::{resolve_credentials, CredentialProvider, Credentials};
pub use drive::{DriveCredentials, GoogleDriveStorage};
pub use error::SnapshotError;
pub use models::{ArchiveFile, FlatRecord, RejectedEntry, SnapshotTable, UploadedArchive};
pub use pipeline::{run, RunSummary};
pub use processor::{build_table, flatten_entry};
pub use symbol::{decode_symbol, encode_symbol, DecodedSymbol, OptionType};
pub use writer::{snapshot_file_name, write_snapshot};
