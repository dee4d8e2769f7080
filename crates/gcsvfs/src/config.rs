//! Configuration module
//!
//! Read options and credentials are resolved per open through a
//! [`FileOpener`], the host's settings lookup. A TOML [`Config`] file is one
//! such opener.

use crate::{Result, VfsError};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default read buffer size (1 MiB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
/// Default number of transfers the backend client may run for one request
pub const DEFAULT_TRANSFER_CONCURRENCY: usize = 5;
/// Default size of a single backend transfer (1 MiB)
pub const DEFAULT_TRANSFER_CHUNK_SIZE: usize = 1024 * 1024;

/// Setting names understood by [`ReadOptions::from_opener`] and
/// [`Authentication::from_opener`]
pub mod settings {
    pub const READ_BUFFER_SIZE: &str = "gcs_read_buffer_size";
    pub const READ_TRANSFER_CONCURRENCY: &str = "gcs_read_transfer_concurrency";
    pub const READ_TRANSFER_CHUNK_SIZE: &str = "gcs_read_transfer_chunk_size";
    pub const SERVICE_ACCOUNT_PATH: &str = "gcs_service_account_path";
    pub const SERVICE_ACCOUNT_KEY: &str = "gcs_service_account_key";
    pub const APPLICATION_CREDENTIALS: &str = "gcs_application_credentials";
}

/// Host-side settings lookup consulted when a file is opened
pub trait FileOpener {
    /// Current value of the named setting, if set.
    fn setting(&self, name: &str) -> Option<String>;
}

impl FileOpener for HashMap<String, String> {
    fn setting(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Read tuning fixed for the lifetime of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Size of the per-handle read buffer in bytes
    #[serde(deserialize_with = "deserialize_size")]
    pub buffer_size: usize,
    /// Transfers the backend client may use for one request
    pub transfer_concurrency: usize,
    /// Largest single transfer issued by the backend client
    #[serde(deserialize_with = "deserialize_size")]
    pub transfer_chunk_size: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            transfer_concurrency: DEFAULT_TRANSFER_CONCURRENCY,
            transfer_chunk_size: DEFAULT_TRANSFER_CHUNK_SIZE,
        }
    }
}

impl ReadOptions {
    /// Resolve read options from the opener, falling back to defaults.
    pub fn from_opener(opener: Option<&dyn FileOpener>) -> Result<Self> {
        let mut options = Self::default();
        let Some(opener) = opener else {
            return Ok(options);
        };

        if let Some(value) = opener.setting(settings::READ_BUFFER_SIZE) {
            options.buffer_size = parse_size(&value)? as usize;
        }
        if let Some(value) = opener.setting(settings::READ_TRANSFER_CONCURRENCY) {
            options.transfer_concurrency = value.trim().parse().map_err(|_| {
                VfsError::Config(format!(
                    "Invalid value for {}: {}",
                    settings::READ_TRANSFER_CONCURRENCY,
                    value
                ))
            })?;
        }
        if let Some(value) = opener.setting(settings::READ_TRANSFER_CHUNK_SIZE) {
            options.transfer_chunk_size = parse_size(&value)? as usize;
        }

        options.validate()?;
        Ok(options)
    }

    /// Reject option combinations the reader cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(VfsError::Config("buffer_size must be greater than zero".to_string()));
        }
        if self.transfer_chunk_size == 0 {
            return Err(VfsError::Config(
                "transfer_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.transfer_concurrency == 0 {
            return Err(VfsError::Config(
                "transfer_concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Credentials handed to the [`crate::CredentialProvider`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Authentication {
    /// Path to a service account JSON file
    pub service_account_path: Option<String>,
    /// Inline service account JSON
    pub service_account_key: Option<String>,
    /// Path to application default credentials
    pub application_credentials: Option<String>,
}

impl Authentication {
    /// Resolve credentials from the opener; unset settings stay `None`.
    pub fn from_opener(opener: Option<&dyn FileOpener>) -> Self {
        match opener {
            Some(opener) => Self {
                service_account_path: opener.setting(settings::SERVICE_ACCOUNT_PATH),
                service_account_key: opener.setting(settings::SERVICE_ACCOUNT_KEY),
                application_credentials: opener.setting(settings::APPLICATION_CREDENTIALS),
            },
            None => Self::default(),
        }
    }
}

/// Configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Read tuning
    #[serde(default)]
    pub read: ReadOptions,
    /// Credentials
    #[serde(default)]
    pub auth: Authentication,
}

impl FileOpener for Config {
    fn setting(&self, name: &str) -> Option<String> {
        match name {
            settings::READ_BUFFER_SIZE => Some(self.read.buffer_size.to_string()),
            settings::READ_TRANSFER_CONCURRENCY => Some(self.read.transfer_concurrency.to_string()),
            settings::READ_TRANSFER_CHUNK_SIZE => Some(self.read.transfer_chunk_size.to_string()),
            settings::SERVICE_ACCOUNT_PATH => self.auth.service_account_path.clone(),
            settings::SERVICE_ACCOUNT_KEY => self.auth.service_account_key.clone(),
            settings::APPLICATION_CREDENTIALS => self.auth.application_credentials.clone(),
            _ => None,
        }
    }
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir().ok_or_else(|| {
            VfsError::Config("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join("gcsvfs").join("config.toml"))
    }

    /// Get default configuration content with examples
    pub fn default_config_content() -> String {
        r#"# gcsvfs configuration file

[read]
# Size of the per-file read buffer. Reads larger than this bypass the buffer.
buffer_size = "1MiB"
# Number of transfers the storage client may use for one request
transfer_concurrency = 5
# Largest single transfer issued by the storage client
transfer_chunk_size = "1MiB"

[auth]
# Leave unset to use the environment (GOOGLE_SERVICE_ACCOUNT, ...)
# service_account_path = "/path/to/service-account.json"
# application_credentials = "/path/to/application_default_credentials.json"
"#
        .to_string()
    }

    /// Load configuration from the default location, writing the example
    /// file first if none exists
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, Self::default_config_content())?;
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| VfsError::Config(format!("Failed to parse config: {}", e)))?;
        config.read.validate()?;
        Ok(config)
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| VfsError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents)?;
        Ok(())
    }
}

/// Sizes may be written as plain numbers or as strings with a unit.
fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SizeValue {
        Numeric(u64),
        String(String),
    }

    match SizeValue::deserialize(deserializer)? {
        SizeValue::Numeric(n) => Ok(n as usize),
        SizeValue::String(s) => parse_size(&s)
            .map(|n| n as usize)
            .map_err(|e| D::Error::custom(format!("Failed to parse size: {}", e))),
    }
}

/// Parse a byte size such as `"4096"`, `"512KB"` or `"1.5MiB"`.
///
/// Decimal fractions are accepted only when they come out to a whole number
/// of bytes.
pub fn parse_size(size_str: &str) -> Result<u64> {
    let trimmed = size_str.trim();
    let unit_pos = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(unit_pos);

    let invalid = || VfsError::Config(format!("Invalid size format: {}", size_str));
    let overflow = || VfsError::Config(format!("Size too large: {}", size_str));

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }

    let multiplier = unit_multiplier(unit.trim())
        .ok_or_else(|| VfsError::Config(format!("Unknown size unit: {}", unit.trim())))?;

    let whole: u64 = match whole {
        "" => 0,
        digits => digits.parse().map_err(|_| invalid())?,
    };
    let mut bytes = whole.checked_mul(multiplier).ok_or_else(overflow)?;

    if !fraction.is_empty() {
        let numerator: u64 = fraction.parse().map_err(|_| invalid())?;
        let denominator = u32::try_from(fraction.len())
            .ok()
            .and_then(|digits| 10u64.checked_pow(digits))
            .ok_or_else(invalid)?;
        let scaled = numerator.checked_mul(multiplier).ok_or_else(overflow)?;
        if scaled % denominator != 0 {
            return Err(VfsError::Config(format!(
                "Size is not a whole number of bytes: {}",
                size_str
            )));
        }
        bytes = bytes
            .checked_add(scaled / denominator)
            .ok_or_else(overflow)?;
    }

    Ok(bytes)
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "ki" | "kib" => 1 << 10,
        "mi" | "mib" => 1 << 20,
        "gi" | "gib" => 1 << 30,
        _ => return None,
    };
    Some(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_read_options() {
        let options = ReadOptions::default();
        assert_eq!(options.buffer_size, 1024 * 1024);
        assert_eq!(options.transfer_concurrency, 5);
        assert_eq!(options.transfer_chunk_size, 1024 * 1024);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("100").unwrap(), 100);
        assert_eq!(parse_size("100B").unwrap(), 100);
        assert_eq!(parse_size("1KB").unwrap(), 1_000);
        assert_eq!(parse_size("1KiB").unwrap(), 1_024);
        assert_eq!(parse_size("4MiB").unwrap(), 4 * 1_048_576);
        assert_eq!(parse_size("1.5GB").unwrap(), 1_500_000_000);
        assert_eq!(parse_size("1.5KiB").unwrap(), 1_536);
        assert_eq!(parse_size(" 2 MB ").unwrap(), 2_000_000);
        assert!(parse_size("invalid").is_err());
        assert!(parse_size("12 parsecs").is_err());
        assert!(parse_size(".").is_err());
        assert!(parse_size("1.2.3MB").is_err());
    }

    #[test]
    fn test_parse_size_rejects_partial_bytes_and_overflow() {
        assert!(parse_size("0.5").is_err());
        assert!(parse_size("1.0001KiB").is_err());
        assert!(parse_size("20000000000GiB").is_err());
        assert!(parse_size("99999999999999999999").is_err());
    }

    #[test]
    fn test_options_from_opener() {
        let mut values = HashMap::new();
        values.insert(settings::READ_BUFFER_SIZE.to_string(), "256KiB".to_string());
        values.insert(settings::READ_TRANSFER_CONCURRENCY.to_string(), "2".to_string());

        let options = ReadOptions::from_opener(Some(&values)).unwrap();
        assert_eq!(options.buffer_size, 256 * 1024);
        assert_eq!(options.transfer_concurrency, 2);
        assert_eq!(options.transfer_chunk_size, DEFAULT_TRANSFER_CHUNK_SIZE);

        assert_eq!(ReadOptions::from_opener(None).unwrap(), ReadOptions::default());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let mut values = HashMap::new();
        values.insert(settings::READ_BUFFER_SIZE.to_string(), "0".to_string());
        let err = ReadOptions::from_opener(Some(&values)).unwrap_err();
        assert!(matches!(err, VfsError::Config(_)));
    }

    #[test]
    fn test_bad_concurrency_rejected() {
        let mut values = HashMap::new();
        values.insert(settings::READ_TRANSFER_CONCURRENCY.to_string(), "many".to_string());
        assert!(ReadOptions::from_opener(Some(&values)).is_err());
    }

    #[test]
    fn test_authentication_from_opener() {
        let mut values = HashMap::new();
        values.insert(settings::SERVICE_ACCOUNT_PATH.to_string(), "/tmp/sa.json".to_string());
        let auth = Authentication::from_opener(Some(&values));
        assert_eq!(auth.service_account_path.as_deref(), Some("/tmp/sa.json"));
        assert!(auth.service_account_key.is_none());
        assert_eq!(Authentication::from_opener(None), Authentication::default());
    }

    #[test]
    fn test_default_config_content_parses() {
        let config: Config = toml::from_str(&Config::default_config_content()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.read.buffer_size = 64 * 1024;
        config.auth.service_account_path = Some("/etc/sa.json".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.setting(settings::READ_BUFFER_SIZE).as_deref(),
            Some("65536")
        );
        assert_eq!(loaded.setting("unknown_setting"), None);
    }
}
