//! Runtime settings for TicketMaker.
//!
//! Settings are read from environment variables (a `.env` file is loaded by
//! the binary first). Command line flags override these values.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::TicketError;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default timeout for retrieving the description from its source, in seconds.
pub const DEFAULT_CONTENT_TIMEOUT_SECS: u64 = 10;

/// Environment variable naming an optional log file.
pub const LOG_FILE_ENV: &str = "TICKETMAKER_LOG_FILE";

/// File name of the JSON credential store inside the config directory.
const CONFIG_FILE_NAME: &str = "config.json";

/// Which secret store backend the credential resolver reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// `TICKETMAKER_URL` / `TICKETMAKER_API_KEY` environment variables.
    #[default]
    Env,
    /// JSON file with `url` and `api_key` fields.
    File,
}

impl FromStr for StoreKind {
    type Err = TicketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" | "environment" => Ok(StoreKind::Env),
            "file" | "json" => Ok(StoreKind::File),
            other => Err(TicketError::invalid_config(format!(
                "unknown credential store {:?} (expected \"env\" or \"file\")",
                other
            ))),
        }
    }
}

/// Settings shared by every submission in a process.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Backend the credential resolver reads from.
    pub store: StoreKind,

    /// Location of the JSON credential store.
    pub config_path: PathBuf,

    /// Timeout applied to the HTTP request.
    pub request_timeout: Duration,

    /// Timeout applied to retrieving the description HTML.
    pub content_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            config_path: default_config_path(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            content_timeout: Duration::from_secs(DEFAULT_CONTENT_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    /// Loads settings from environment variables.
    ///
    /// # Optional Environment Variables
    ///
    /// - `TICKETMAKER_CREDENTIAL_STORE`: `env` (default) or `file`
    /// - `TICKETMAKER_CONFIG`: path of the JSON credential store
    /// - `TICKETMAKER_TIMEOUT_SECS`: HTTP request timeout
    /// - `TICKETMAKER_CONTENT_TIMEOUT_SECS`: description retrieval timeout
    ///
    /// # Errors
    ///
    /// Returns `TicketError::Config` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, TicketError> {
        let mut settings = Settings::default();

        if let Some(store) = Self::get_optional_env("TICKETMAKER_CREDENTIAL_STORE") {
            settings.store = store.parse()?;
        }
        if let Some(path) = Self::get_optional_env("TICKETMAKER_CONFIG") {
            settings.config_path = PathBuf::from(path);
        }
        if let Some(secs) = Self::get_optional_env("TICKETMAKER_TIMEOUT_SECS") {
            settings.request_timeout = Self::parse_timeout("TICKETMAKER_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = Self::get_optional_env("TICKETMAKER_CONTENT_TIMEOUT_SECS") {
            settings.content_timeout =
                Self::parse_timeout("TICKETMAKER_CONTENT_TIMEOUT_SECS", &secs)?;
        }

        Ok(settings)
    }

    /// Gets an environment variable, treating blank values as unset.
    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Parses a positive number of seconds.
    fn parse_timeout(name: &str, value: &str) -> Result<Duration, TicketError> {
        match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(TicketError::invalid_config(format!(
                "{} must be a positive number of seconds, got {:?}",
                name, value
            ))),
        }
    }
}

/// Returns the log file path from `TICKETMAKER_LOG_FILE`, if set.
pub fn log_file_from_env() -> Option<PathBuf> {
    Settings::get_optional_env(LOG_FILE_ENV).map(PathBuf::from)
}

/// Returns `<platform config dir>/ticketmaker/config.json`.
///
/// Falls back to the working directory when the platform has no config dir.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("ticketmaker"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_parse() {
        assert_eq!("env".parse::<StoreKind>().unwrap(), StoreKind::Env);
        assert_eq!(" FILE ".parse::<StoreKind>().unwrap(), StoreKind::File);
        assert_eq!("json".parse::<StoreKind>().unwrap(), StoreKind::File);
    }

    #[test]
    fn test_store_kind_rejects_unknown() {
        let err = "registry".parse::<StoreKind>().unwrap_err();
        assert!(err.to_string().contains("registry"));
    }

    #[test]
    fn test_parse_timeout_accepts_positive() {
        let timeout = Settings::parse_timeout("X", "45").unwrap();
        assert_eq!(timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_parse_timeout_rejects_zero_and_garbage() {
        assert!(Settings::parse_timeout("X", "0").is_err());
        assert!(Settings::parse_timeout("X", "soon").is_err());
    }

    #[test]
    fn test_default_config_path_file_name() {
        let path = default_config_path();
        assert!(path.ends_with("ticketmaker/config.json"));
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.store, StoreKind::Env);
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.content_timeout, Duration::from_secs(10));
    }
}
