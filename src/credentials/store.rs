//! Secret store backends.
//!
//! Every backend exposes the same two operations, `get` and `set`, keyed by
//! [`SecretKey`]. Each backend decides how a key is named in its own medium.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TicketError;

/// The two values a store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKey {
    /// Ticketing API base address (e.g. `example.freshdesk.com`).
    BaseUrl,
    /// Ticketing API key.
    ApiKey,
}

impl SecretKey {
    /// Environment variable name for this key.
    pub fn env_var(self) -> &'static str {
        match self {
            SecretKey::BaseUrl => "TICKETMAKER_URL",
            SecretKey::ApiKey => "TICKETMAKER_API_KEY",
        }
    }

    /// Field name for this key in the JSON store.
    pub fn json_field(self) -> &'static str {
        match self {
            SecretKey::BaseUrl => "url",
            SecretKey::ApiKey => "api_key",
        }
    }
}

/// A configured source of credentials.
pub trait SecretStore: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Reads a value. `Ok(None)` means the key is not configured.
    fn get(&self, key: SecretKey) -> Result<Option<String>, TicketError>;

    /// Writes a value. Read-only stores return `TicketError::Config`.
    fn set(&mut self, key: SecretKey, value: &str) -> Result<(), TicketError>;
}

/// Reads credentials from `TICKETMAKER_URL` and `TICKETMAKER_API_KEY`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvStore;

impl SecretStore for EnvStore {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: SecretKey) -> Result<Option<String>, TicketError> {
        Ok(env::var(key.env_var()).ok())
    }

    fn set(&mut self, key: SecretKey, _value: &str) -> Result<(), TicketError> {
        Err(TicketError::invalid_config(format!(
            "the environment store is read-only; export {} instead",
            key.env_var()
        )))
    }
}

/// On-disk layout of the JSON store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

impl StoredCredentials {
    fn field(&self, key: SecretKey) -> Option<&String> {
        match key {
            SecretKey::BaseUrl => self.url.as_ref(),
            SecretKey::ApiKey => self.api_key.as_ref(),
        }
    }

    fn field_mut(&mut self, key: SecretKey) -> &mut Option<String> {
        match key {
            SecretKey::BaseUrl => &mut self.url,
            SecretKey::ApiKey => &mut self.api_key,
        }
    }
}

/// A local JSON file holding `url` and `api_key`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<StoredCredentials, TicketError> {
        if !self.path.exists() {
            return Ok(StoredCredentials::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|e| {
            TicketError::invalid_config(format!(
                "credential file {} is not valid JSON: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, stored: &StoredCredentials) -> Result<(), TicketError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(stored)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SecretStore for JsonFileStore {
    fn name(&self) -> &str {
        "json file"
    }

    fn get(&self, key: SecretKey) -> Result<Option<String>, TicketError> {
        Ok(self.load()?.field(key).cloned())
    }

    fn set(&mut self, key: SecretKey, value: &str) -> Result<(), TicketError> {
        let mut stored = self.load()?;
        *stored.field_mut(key) = Some(value.to_string());
        self.save(&stored)?;
        tracing::debug!(path = %self.path.display(), field = key.json_field(), "Credential stored");
        Ok(())
    }
}

/// In-process store, for callers that already hold credentials.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<SecretKey, String>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with both values.
    pub fn with_credentials(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut values = HashMap::new();
        values.insert(SecretKey::BaseUrl, base_url.into());
        values.insert(SecretKey::ApiKey, api_key.into());
        Self { values }
    }
}

impl SecretStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: SecretKey) -> Result<Option<String>, TicketError> {
        Ok(self.values.get(&key).cloned())
    }

    fn set(&mut self, key: SecretKey, value: &str) -> Result<(), TicketError> {
        self.values.insert(key, value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_store_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.get(SecretKey::BaseUrl).unwrap(), None);
        assert_eq!(store.get(SecretKey::ApiKey).unwrap(), None);
    }

    #[test]
    fn test_json_store_set_preserves_other_field() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested/config.json"));

        store.set(SecretKey::BaseUrl, "example.freshdesk.com").unwrap();
        store.set(SecretKey::ApiKey, "abc123").unwrap();

        assert_eq!(
            store.get(SecretKey::BaseUrl).unwrap().as_deref(),
            Some("example.freshdesk.com")
        );
        assert_eq!(store.get(SecretKey::ApiKey).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_json_store_reads_existing_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"url": "acme.freshdesk.com", "api_key": "k1"}"#).unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(
            store.get(SecretKey::BaseUrl).unwrap().as_deref(),
            Some("acme.freshdesk.com")
        );
        assert_eq!(store.get(SecretKey::ApiKey).unwrap().as_deref(), Some("k1"));
    }

    #[test]
    fn test_json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        let err = JsonFileStore::new(&path).get(SecretKey::ApiKey).unwrap_err();
        assert!(matches!(err, TicketError::Config(_)));
    }

    #[test]
    fn test_env_store_is_read_only() {
        let mut store = EnvStore;
        let err = store.set(SecretKey::ApiKey, "x").unwrap_err();
        assert!(err.to_string().contains("TICKETMAKER_API_KEY"));
    }

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(SecretKey::ApiKey).unwrap(), None);
        store.set(SecretKey::ApiKey, "k").unwrap();
        assert_eq!(store.get(SecretKey::ApiKey).unwrap().as_deref(), Some("k"));
    }
}
