use crate::config;
use crate::error::SnapshotError;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl Credentials {
    /// Both values trimmed; `None` if either ends up blank.
    pub fn new(api_key: &str, api_secret: &str) -> Option<Self> {
        let api_key = api_key.trim();
        let api_secret = api_secret.trim();
        if api_key.is_empty() || api_secret.is_empty() {
            return None;
        }
        Some(Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

/// One source of API credentials in the fallback chain.
pub trait CredentialProvider {
    fn name(&self) -> &str;

    /// `Ok(None)` means "not configured here, try the next one".
    fn fetch(&self) -> Result<Option<Credentials>, SnapshotError>;
}

// -----------------------------------------------
// ENVIRONMENT
// -----------------------------------------------
pub struct EnvCredentials {
    key_var: String,
    secret_var: String,
}

impl EnvCredentials {
    pub fn new(key_var: &str, secret_var: &str) -> Self {
        Self {
            key_var: key_var.to_string(),
            secret_var: secret_var.to_string(),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(config::ENV_API_KEY, config::ENV_API_SECRET)
    }
}

impl CredentialProvider for EnvCredentials {
    fn name(&self) -> &str {
        "environment"
    }

    fn fetch(&self) -> Result<Option<Credentials>, SnapshotError> {
        let key = std::env::var(&self.key_var).unwrap_or_default();
        let secret = std::env::var(&self.secret_var).unwrap_or_default();
        Ok(Credentials::new(&key, &secret))
    }
}

// -----------------------------------------------
// CONFIG FILE
// -----------------------------------------------

/// INI-style file with an `[alpaca]` section:
///
/// ```text
/// [alpaca]
/// APCA_API_KEY_ID = ...
/// APCA_API_SECRET_KEY = ...
/// ```
pub struct ConfigFileCredentials {
    path: PathBuf,
}

pub const CONFIG_SECTION: &str = "alpaca";
pub const CONFIG_KEY_ID: &str = "APCA_API_KEY_ID";
pub const CONFIG_SECRET_KEY: &str = "APCA_API_SECRET_KEY";

impl ConfigFileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialProvider for ConfigFileCredentials {
    fn name(&self) -> &str {
        "config file"
    }

    fn fetch(&self) -> Result<Option<Credentials>, SnapshotError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path).map_err(|e| {
            SnapshotError::CredentialsMissing(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        let key = ini_value(&text, CONFIG_SECTION, CONFIG_KEY_ID).unwrap_or_default();
        let secret = ini_value(&text, CONFIG_SECTION, CONFIG_SECRET_KEY).unwrap_or_default();
        Ok(Credentials::new(&key, &secret))
    }
}

/// Look up `key` inside `[section]`. Section names match case-insensitively,
/// keys too; `;` and `#` start comment lines.
fn ini_value(text: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim().eq_ignore_ascii_case(section);
            continue;
        }
        if !in_section {
            continue;
        }
        let Some((k, v)) = line.split_once('=').or_else(|| line.split_once(':')) else {
            continue;
        };
        if k.trim().eq_ignore_ascii_case(key) {
            return Some(v.trim().to_string());
        }
    }

    None
}

/// The environment first, then the config file.
pub fn default_providers(config_file: impl Into<PathBuf>) -> Vec<Box<dyn CredentialProvider>> {
    vec![
        Box::new(EnvCredentials::default()),
        Box::new(ConfigFileCredentials::new(config_file)),
    ]
}

/// First provider that yields credentials wins.
pub fn resolve_credentials(providers: &[Box<dyn CredentialProvider>]) -> Result<Credentials, SnapshotError> {
    for provider in providers {
        if let Some(creds) = provider.fetch()? {
            info!(source = provider.name(), "Loaded API credentials");
            return Ok(creds);
        }
    }

    let tried: Vec<&str> = providers.iter().map(|p| p.name()).collect();
    Err(SnapshotError::CredentialsMissing(format!(
        "no API key/secret found (tried: {}). Set {} and {}, or create a config file with an [{}] section",
        tried.join(", "),
        config::ENV_API_KEY,
        config::ENV_API_SECRET,
        CONFIG_SECTION
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct Fixed(Option<Credentials>, &'static str);

    impl CredentialProvider for Fixed {
        fn name(&self) -> &str {
            self.1
        }

        fn fetch(&self) -> Result<Option<Credentials>, SnapshotError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_blank_values_are_not_credentials() {
        assert!(Credentials::new("  ", "secret").is_none());
        assert!(Credentials::new("key", "").is_none());
        let creds = Credentials::new(" key ", "secret\n").unwrap();
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.api_secret, "secret");
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = Credentials::new("key", "hunter2").unwrap();
        let text = format!("{:?}", creds);
        assert!(!text.contains("hunter2"));
        assert!(text.contains("key"));
    }

    #[test]
    fn test_first_non_empty_provider_wins() {
        let providers: Vec<Box<dyn CredentialProvider>> = vec![
            Box::new(Fixed(None, "first")),
            Box::new(Fixed(Credentials::new("k2", "s2"), "second")),
            Box::new(Fixed(Credentials::new("k3", "s3"), "third")),
        ];
        let creds = resolve_credentials(&providers).unwrap();
        assert_eq!(creds.api_key, "k2");
    }

    #[test]
    fn test_no_provider_yields_missing_error() {
        let providers: Vec<Box<dyn CredentialProvider>> =
            vec![Box::new(Fixed(None, "a")), Box::new(Fixed(None, "b"))];
        match resolve_credentials(&providers) {
            Err(SnapshotError::CredentialsMissing(msg)) => assert!(msg.contains("a, b")),
            other => panic!("expected CredentialsMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_config_file_provider_reads_alpaca_section() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[other]\nAPCA_API_KEY_ID = wrong\n\n[alpaca]\n; comment\nAPCA_API_KEY_ID = abc \nAPCA_API_SECRET_KEY=xyz"
        )
        .unwrap();

        let creds = ConfigFileCredentials::new(file.path()).fetch().unwrap().unwrap();
        assert_eq!(creds.api_key, "abc");
        assert_eq!(creds.api_secret, "xyz");
    }

    #[test]
    fn test_config_file_provider_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ConfigFileCredentials::new(dir.path().join("Alpaca.cfg"));
        assert!(provider.fetch().unwrap().is_none());
    }

    #[test]
    fn test_config_file_without_secret_is_none() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[alpaca]\nAPCA_API_KEY_ID = abc").unwrap();
        assert!(ConfigFileCredentials::new(file.path()).fetch().unwrap().is_none());
    }
}
