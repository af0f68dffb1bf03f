//! Error response bodies returned by the ticketing API.
//!
//! Freshdesk reports failures either as a flat `{"message": ...}` object or
//! as a validation envelope with a `description` and per-field `errors`.

use serde::Deserialize;

use crate::error::TicketError;

/// Maximum length for raw error bodies carried into error messages.
pub const MAX_ERROR_BODY_LEN: usize = 500;

/// A single per-field error in a validation response.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldError {
    /// Name of the offending field.
    #[serde(default)]
    pub field: Option<String>,

    /// Human-readable explanation.
    #[serde(default)]
    pub message: Option<String>,

    /// Machine-readable code (e.g. `invalid_value`).
    #[serde(default)]
    pub code: Option<String>,
}

/// Body of a non-201 response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    /// Top-level message.
    #[serde(default)]
    pub message: Option<String>,

    /// Summary accompanying `errors` (e.g. "Validation failed").
    #[serde(default)]
    pub description: Option<String>,

    /// Per-field errors.
    #[serde(default)]
    pub errors: Vec<FieldError>,
}

impl ApiErrorBody {
    /// Picks the most specific message the body offers.
    ///
    /// Preference: `message`, then the first field error as
    /// `"<field>: <message> (<code>)"`, then `description`.
    pub fn best_message(&self) -> Option<String> {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return Some(message.to_string());
        }

        let first = self.errors.iter().find_map(|e| {
            let message = e.message.as_deref()?;
            let message = match e.code.as_deref().filter(|c| !c.is_empty()) {
                Some(code) => format!("{} ({})", message, code),
                None => message.to_string(),
            };
            Some(match e.field.as_deref() {
                Some(field) => format!("{}: {}", field, message),
                None => message,
            })
        });
        if first.is_some() {
            return first;
        }

        self.description.clone().filter(|d| !d.is_empty())
    }

    /// Builds the API error for a response with `status` and raw `body`.
    ///
    /// Falls back to the raw body (truncated) when it is not a recognized
    /// JSON error envelope.
    pub fn into_error(status: u16, body: &str) -> TicketError {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.best_message())
            .unwrap_or_else(|| truncate_body(body));
        TicketError::api(status, message)
    }
}

/// Truncates a body to `MAX_ERROR_BODY_LEN` bytes on a char boundary.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LEN {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}
