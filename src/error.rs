//! Error types for TicketMaker.
//!
//! This module defines `TicketError`, the unified error type used across the
//! submission pipeline, from credential resolution through dispatch.
//!
//! # Security
//!
//! Error messages built from external sources (response bodies, transport
//! errors) must be passed through `sanitize_message()` so the API key never
//! reaches logs or the terminal.

use thiserror::Error;

/// Process exit codes reported by the CLI.
pub mod exit_codes {
    /// Submission succeeded.
    pub const SUCCESS: i32 = 0;
    /// Any failure not covered by a more specific code.
    pub const GENERAL: i32 = 1;
    /// The draft was rejected locally (validation or malformed embedded image).
    pub const INVALID_INPUT: i32 = 2;
    /// Credentials or configuration could not be loaded.
    pub const CONFIGURATION: i32 = 3;
    /// The ticketing API rejected the request.
    pub const API: i32 = 4;
    /// The ticketing API could not be reached.
    pub const TRANSPORT: i32 = 5;
}

/// Unified error type for all TicketMaker operations.
#[derive(Error, Debug)]
pub enum TicketError {
    /// A required draft field is missing or invalid. Never sent to the network.
    #[error("validation error: {0}")]
    Validation(String),

    /// An inline image in the description could not be decoded.
    #[error("embedded image {index} is malformed: {reason}")]
    MalformedEmbeddedImage {
        /// 1-based position of the image in the description.
        index: usize,
        /// Why decoding failed.
        reason: String,
    },

    /// The configured secret store did not yield a usable URL or API key.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Configuration error - invalid settings or a read-only store.
    #[error("configuration error: {0}")]
    Config(String),

    /// The ticketing API answered with something other than 201 Created.
    #[error("API error {code}: {message}")]
    Api {
        /// HTTP status code returned by the API.
        code: u16,
        /// Provider message, or the raw response body.
        message: String,
    },

    /// The request never produced an HTTP response (DNS, TLS, timeout, reset).
    #[error("transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// The submission was abandoned before dispatch.
    #[error("submission cancelled before dispatch")]
    Cancelled,

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while reading attachments or writing scratch files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TicketError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        TicketError::Validation(message.into())
    }

    /// Creates a missing-credentials error for a store key.
    pub fn missing_credential(key: &str) -> Self {
        TicketError::MissingCredentials(format!("no value configured for {}", key))
    }

    /// Creates a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        TicketError::Config(message.into())
    }

    /// Creates a malformed embedded image error.
    pub fn malformed_image(index: usize, reason: impl Into<String>) -> Self {
        TicketError::MalformedEmbeddedImage {
            index,
            reason: reason.into(),
        }
    }

    /// Creates an API error.
    pub fn api(code: u16, message: impl Into<String>) -> Self {
        TicketError::Api {
            code,
            message: message.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        TicketError::Transport {
            message: message.into(),
        }
    }

    /// Returns true if the user can fix the problem by resubmitting.
    ///
    /// API rejections are fixed by editing the draft, transport failures by
    /// trying again. Nothing here retries automatically.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TicketError::Api { .. } | TicketError::Transport { .. })
    }

    /// Returns the CLI exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            TicketError::Validation(_) | TicketError::MalformedEmbeddedImage { .. } => {
                exit_codes::INVALID_INPUT
            }
            TicketError::MissingCredentials(_) | TicketError::Config(_) => {
                exit_codes::CONFIGURATION
            }
            TicketError::Api { .. } => exit_codes::API,
            TicketError::Transport { .. } => exit_codes::TRANSPORT,
            _ => exit_codes::GENERAL,
        }
    }

    /// Sanitizes an error message to remove any occurrence of the API key.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to sanitize
    /// * `api_key` - The API key to strip from the message
    ///
    /// # Returns
    ///
    /// The message with any occurrence of the API key replaced with `[REDACTED]`
    #[must_use]
    pub fn sanitize_message(message: &str, api_key: &str) -> String {
        if api_key.is_empty() {
            return message.to_string();
        }
        message.replace(api_key, "[REDACTED]")
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, api_key: &str) -> String {
        Self::sanitize_message(&self.to_string(), api_key)
    }
}
