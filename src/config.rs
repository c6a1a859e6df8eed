use std::path::PathBuf;
use std::time::Duration;

// -----------------------------------------------
// ALPACA API ENDPOINTS
// -----------------------------------------------
pub const ALPACA_DATA_URL: &str = "https://data.alpaca.markets";

pub fn alpaca_snapshots_url(underlying: &str, feed: &str, limit: u32) -> String {
    format!(
        "{}/v1beta1/options/snapshots/{}?feed={}&limit={}",
        ALPACA_DATA_URL,
        urlencoding::encode(underlying),
        urlencoding::encode(feed),
        limit
    )
}

pub const HEADER_API_KEY: &str = "apca-api-key-id";
pub const HEADER_API_SECRET: &str = "apca-api-secret-key";

// -----------------------------------------------
// SNAPSHOT DEFAULTS
// -----------------------------------------------
pub const DEFAULT_UNDERLYING: &str = "BTC";
pub const DEFAULT_FEED: &str = "indicative";
pub const DEFAULT_LIMIT: u32 = 1000;
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_CREDENTIALS_FILE: &str = "Alpaca.cfg";

// -----------------------------------------------
// RETRY CONFIG (fixed interval, not exponential)
// -----------------------------------------------
pub const RETRY_MAX_ATTEMPTS: usize = 5;
pub const RETRY_BACKOFF_SECS: u64 = 5;
pub const HTTP_TIMEOUT_SECS: u64 = 10;

// -----------------------------------------------
// RETENTION
// -----------------------------------------------
pub const DEFAULT_KEEP_LAST: usize = 7;

// -----------------------------------------------
// GOOGLE DRIVE
// -----------------------------------------------
pub const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
pub const DRIVE_DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DRIVE_HTTP_TIMEOUT_SECS: u64 = 60;

// -----------------------------------------------
// ENVIRONMENT VARIABLES
// -----------------------------------------------
pub const ENV_API_KEY: &str = "ALPACA_API_KEY";
pub const ENV_API_SECRET: &str = "ALPACA_API_SECRET";
pub const ENV_UNDERLYING: &str = "SNAPSHOT_UNDERLYING";
pub const ENV_FEED: &str = "SNAPSHOT_FEED";
pub const ENV_LIMIT: &str = "SNAPSHOT_LIMIT";
pub const ENV_OUTPUT_DIR: &str = "SNAPSHOT_OUTPUT_DIR";
pub const ENV_LOG_DIR: &str = "SNAPSHOT_LOG_DIR";
pub const ENV_KEEP_LAST: &str = "SNAPSHOT_KEEP_LAST";
pub const ENV_ROW_POLICY: &str = "SNAPSHOT_ROW_POLICY";
pub const ENV_CREDENTIALS_FILE: &str = "SNAPSHOT_CREDENTIALS_FILE";
pub const ENV_DRIVE_FOLDER_ID: &str = "GOOGLE_DRIVE_FOLDER_ID";
pub const ENV_DRIVE_CREDENTIALS: &str = "GOOGLE_DRIVE_CREDENTIALS";

/// How the table builder treats an entry whose symbol cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowPolicy {
    /// First bad entry aborts the whole table.
    #[default]
    Strict,
    /// Bad entries are dropped and reported alongside the table.
    Lenient,
}

impl RowPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(RowPolicy::Strict),
            "lenient" => Some(RowPolicy::Lenient),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: RETRY_MAX_ATTEMPTS,
            backoff: Duration::from_secs(RETRY_BACKOFF_SECS),
            timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
        }
    }
}

/// Everything one run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub underlying: String,
    pub feed: String,
    pub limit: u32,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub credentials_file: PathBuf,
    pub keep_last: usize,
    pub row_policy: RowPolicy,
    pub drive_folder_id: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            underlying: DEFAULT_UNDERLYING.to_string(),
            feed: DEFAULT_FEED.to_string(),
            limit: DEFAULT_LIMIT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            keep_last: DEFAULT_KEEP_LAST,
            row_policy: RowPolicy::Strict,
            drive_folder_id: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl RunConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            underlying: get(ENV_UNDERLYING)
                .map(|v| v.to_ascii_uppercase())
                .unwrap_or(defaults.underlying),
            feed: get(ENV_FEED).unwrap_or(defaults.feed),
            limit: get(ENV_LIMIT)
                .and_then(|v| v.parse::<u32>().ok())
                .map(|n| n.max(1))
                .unwrap_or(defaults.limit),
            output_dir: get(ENV_OUTPUT_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            log_dir: get(ENV_LOG_DIR).map(PathBuf::from).unwrap_or(defaults.log_dir),
            credentials_file: get(ENV_CREDENTIALS_FILE)
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_file),
            keep_last: get(ENV_KEEP_LAST)
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.keep_last),
            row_policy: get(ENV_ROW_POLICY)
                .and_then(|v| RowPolicy::parse(&v))
                .unwrap_or(defaults.row_policy),
            drive_folder_id: get(ENV_DRIVE_FOLDER_ID),
            retry: defaults.retry,
        }
    }

    /// File-name prefix shared by local and remote artifacts.
    pub fn snapshot_prefix(&self) -> String {
        snapshot_prefix(&self.underlying)
    }
}

pub fn snapshot_prefix(underlying: &str) -> String {
    format!("{}_snapshots", underlying)
}
