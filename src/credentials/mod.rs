//! Credential resolution.
//!
//! The resolver reads the API base address and key from exactly one
//! [`SecretStore`] and sanitizes them. A submission never proceeds without
//! resolved credentials.

mod store;

pub use store::*;

use std::fmt;

use zeroize::Zeroize;

use crate::config::{Settings, StoreKind};
use crate::error::TicketError;

/// An API key that never exposes its value in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    inner: String,
}

impl ApiKey {
    /// Wraps a key value.
    pub fn new(key: impl Into<String>) -> Self {
        Self { inner: key.into() }
    }

    /// Returns the key for transmission or sanitization. Never log this.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for ApiKey {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

/// Resolved credentials for one submission. Immutable once built.
#[derive(Debug, Clone)]
pub struct Credentials {
    base_url: String,
    api_key: ApiKey,
}

impl Credentials {
    /// Builds credentials from raw values, applying the same sanitization as
    /// the resolver.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, TicketError> {
        let base_url = sanitize_credential(base_url);
        let api_key = sanitize_credential(api_key);
        if base_url.is_empty() {
            return Err(TicketError::missing_credential("base URL"));
        }
        if api_key.is_empty() {
            return Err(TicketError::missing_credential("API key"));
        }
        Ok(Self {
            base_url,
            api_key: ApiKey::new(api_key),
        })
    }

    /// API base address as configured (host, optionally with scheme).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API key.
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }
}

/// Removes surrounding whitespace and NUL padding left by secret stores.
pub fn sanitize_credential(raw: &str) -> String {
    raw.replace('\0', "").trim().to_string()
}

/// Resolves credentials from a configured store.
pub struct CredentialResolver {
    store: Box<dyn SecretStore>,
}

impl CredentialResolver {
    /// Creates a resolver over `store`.
    pub fn new(store: Box<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Creates a resolver over the store selected in `settings`.
    pub fn from_settings(settings: &Settings) -> Self {
        let store: Box<dyn SecretStore> = match settings.store {
            StoreKind::Env => Box::new(EnvStore),
            StoreKind::File => Box::new(JsonFileStore::new(&settings.config_path)),
        };
        Self::new(store)
    }

    /// Reads and sanitizes both credentials.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::MissingCredentials` if either value is absent,
    /// blank after sanitization, or the store cannot be read.
    pub fn resolve(&self) -> Result<Credentials, TicketError> {
        let base_url = self.read(SecretKey::BaseUrl)?;
        let api_key = self.read(SecretKey::ApiKey)?;

        tracing::debug!(store = self.store.name(), base_url = %base_url, "Credentials resolved");

        Ok(Credentials {
            base_url,
            api_key: ApiKey::new(api_key),
        })
    }

    fn read(&self, key: SecretKey) -> Result<String, TicketError> {
        let value = self.store.get(key).map_err(|e| {
            TicketError::MissingCredentials(format!(
                "could not read {:?} from {} store: {}",
                key,
                self.store.name(),
                e
            ))
        })?;

        let value = value.map(|v| sanitize_credential(&v)).unwrap_or_default();
        if value.is_empty() {
            tracing::warn!(store = self.store.name(), key = ?key, "Credential not configured");
            return Err(TicketError::MissingCredentials(format!(
                "{:?} is not configured in the {} store",
                key,
                self.store.name()
            )));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_whitespace_and_nul() {
        assert_eq!(sanitize_credential("  abc\0\0\n"), "abc");
        assert_eq!(sanitize_credential("\0ex\0ample.com "), "example.com");
    }

    #[test]
    fn test_resolve_from_memory_store() {
        let store = MemoryStore::with_credentials(" example.freshdesk.com\0", "abc123\n");
        let creds = CredentialResolver::new(Box::new(store)).resolve().unwrap();
        assert_eq!(creds.base_url(), "example.freshdesk.com");
        assert_eq!(creds.api_key().expose(), "abc123");
    }

    #[test]
    fn test_resolve_missing_key_fails() {
        let mut store = MemoryStore::new();
        store.set(SecretKey::BaseUrl, "example.freshdesk.com").unwrap();
        let err = CredentialResolver::new(Box::new(store)).resolve().unwrap_err();
        assert!(matches!(err, TicketError::MissingCredentials(_)));
        assert!(err.to_string().contains("ApiKey"));
    }

    #[test]
    fn test_resolve_blank_after_sanitize_fails() {
        let store = MemoryStore::with_credentials("example.freshdesk.com", " \0 ");
        let err = CredentialResolver::new(Box::new(store)).resolve().unwrap_err();
        assert!(matches!(err, TicketError::MissingCredentials(_)));
    }

    #[test]
    fn test_resolve_store_failure_is_missing_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{broken").unwrap();

        let err = CredentialResolver::new(Box::new(JsonFileStore::new(&path)))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, TicketError::MissingCredentials(_)));
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let creds = Credentials::new("example.freshdesk.com", "abc123").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("abc123"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(creds.api_key().to_string(), "[REDACTED]");
    }

    #[test]
    fn test_from_settings_uses_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"url": "acme.freshdesk.com", "api_key": "k1"}"#).unwrap();

        let settings = Settings {
            store: StoreKind::File,
            config_path: path,
            ..Settings::default()
        };
        let creds = CredentialResolver::from_settings(&settings).resolve().unwrap();
        assert_eq!(creds.base_url(), "acme.freshdesk.com");
    }

    #[test]
    fn test_credentials_new_rejects_empty() {
        assert!(Credentials::new("", "k").is_err());
        assert!(Credentials::new("host", "  ").is_err());
    }
}
