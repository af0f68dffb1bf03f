//! HTTP client for the Freshdesk ticket API.
//!
//! This module provides `FreshdeskClient`, which sends one assembled
//! [`SubmissionRequest`] to `POST /api/v2/tickets` and classifies the outcome.
//!
//! # No Retry
//!
//! Exactly one attempt is made per call. A failed submission is retried only
//! when the user submits again.
//!
//! # Security
//!
//! The API key is never logged. Transport messages and response bodies are
//! sanitized before they are placed in an error.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::credentials::Credentials;
use crate::error::TicketError;
use crate::models::{ApiErrorBody, CreatedTicket, TicketResponse};
use crate::payload::{Encoding, SubmissionRequest, ATTACHMENT_FIELD};

/// Path of the ticket creation endpoint.
const TICKETS_PATH: &str = "/api/v2/tickets";

/// Password sent with the API key. The API ignores it but requires one.
const BASIC_AUTH_PASSWORD: &str = "X";

/// Outcome of one submission.
pub type SubmissionResult = Result<CreatedTicket, TicketError>;

/// HTTP client for the Freshdesk ticket API.
///
/// # Example
///
/// ```ignore
/// let client = FreshdeskClient::new(Duration::from_secs(30))?;
/// let ticket = client.dispatch(&credentials, &request).await?;
/// ```
#[derive(Clone)]
pub struct FreshdeskClient {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Request timeout, kept for error messages.
    timeout: Duration,
}

impl FreshdeskClient {
    /// Creates a client with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(timeout: Duration) -> Result<Self, TicketError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TicketError::HttpClient)?;

        Ok(Self { http, timeout })
    }

    /// Creates a client with the default 30 second timeout.
    pub fn with_default_timeout() -> Result<Self, TicketError> {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Builds the ticket endpoint from a configured base address.
    ///
    /// A bare host gets `https://`; an explicit scheme is kept. Trailing
    /// slashes are dropped and an existing `/api/v2` suffix is not repeated.
    ///
    /// # Errors
    ///
    /// Returns `TicketError::Config` if the result is not a valid URL.
    pub fn tickets_endpoint(base_url: &str) -> Result<String, TicketError> {
        let base = base_url.trim().trim_end_matches('/');
        let base = if base.starts_with("https://") || base.starts_with("http://") {
            base.to_string()
        } else {
            format!("https://{}", base)
        };

        let endpoint = if base.ends_with(TICKETS_PATH) {
            base
        } else if base.ends_with("/api/v2") {
            format!("{}/tickets", base)
        } else {
            format!("{}{}", base, TICKETS_PATH)
        };

        let parsed = Url::parse(&endpoint)
            .map_err(|e| TicketError::invalid_config(format!("invalid API base URL: {}", e)))?;
        if parsed.host_str().is_none() {
            return Err(TicketError::invalid_config("API base URL has no host"));
        }

        Ok(endpoint)
    }

    /// Returns the agent-portal link for a ticket.
    pub fn ticket_web_url(base_url: &str, ticket_id: u64) -> Option<String> {
        let endpoint = Self::tickets_endpoint(base_url).ok()?;
        let mut url = Url::parse(&endpoint).ok()?;
        url.set_path(&format!("/a/tickets/{}", ticket_id));
        Some(url.to_string())
    }

    /// Sends the request and classifies the response.
    ///
    /// - 201 Created: success, with the ticket id when the body carries one
    /// - any other status: `TicketError::Api` with the provider message
    /// - no response at all: `TicketError::Transport`
    ///
    /// Attachment files are read while the request is built; no file handle
    /// outlives this call.
    pub async fn dispatch(
        &self,
        credentials: &Credentials,
        request: &SubmissionRequest,
    ) -> SubmissionResult {
        let endpoint = Self::tickets_endpoint(credentials.base_url())?;
        let api_key = credentials.api_key().expose();
        let encoding = request.encoding();

        tracing::debug!(
            endpoint = %endpoint,
            encoding = ?encoding,
            attachments = request.attachments.len(),
            "Dispatching ticket"
        );

        let req = self
            .http
            .post(&endpoint)
            .basic_auth(api_key, Some(BASIC_AUTH_PASSWORD));

        let req = match encoding {
            Encoding::Json => req
                .header(CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(&request.json_body())?),
            Encoding::Multipart => req.multipart(Self::build_form(request).await?),
        };

        let response = req.send().await.map_err(|e| self.transport_error(e, api_key))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, api_key))?;

        if status == StatusCode::CREATED {
            let id = match serde_json::from_str::<TicketResponse>(&body) {
                Ok(parsed) => parsed.id,
                Err(e) => {
                    tracing::warn!(error = %e, "Ticket created but response body was not understood");
                    None
                }
            };
            let web_url = id.and_then(|id| Self::ticket_web_url(credentials.base_url(), id));
            tracing::info!(ticket_id = ?id, "Ticket created");
            return Ok(CreatedTicket { id, web_url });
        }

        let body = TicketError::sanitize_message(&body, api_key);
        let err = ApiErrorBody::into_error(status.as_u16(), &body);
        tracing::warn!(status = %status, error = %err, "Ticket API rejected the request");
        Err(err)
    }

    /// Builds the multipart form: stringified fields, then one file part per
    /// attachment, all under the shared attachment key.
    async fn build_form(request: &SubmissionRequest) -> Result<Form, TicketError> {
        let mut form = Form::new();
        for (key, value) in request.form_fields() {
            form = form.text(key, value);
        }

        for attachment in &request.attachments {
            let bytes = tokio::fs::read(&attachment.source_path).await.map_err(|e| {
                tracing::error!(
                    path = %attachment.source_path.display(),
                    error = %e,
                    "Could not read attachment"
                );
                e
            })?;
            let part = Part::bytes(bytes).file_name(attachment.display_name.clone());
            form = form.part(ATTACHMENT_FIELD, part);
        }

        Ok(form)
    }

    /// Converts a reqwest error into a sanitized transport error.
    fn transport_error(&self, e: reqwest::Error, api_key: &str) -> TicketError {
        let message = if e.is_timeout() {
            format!("request timed out after {:?}", self.timeout)
        } else if e.is_connect() {
            format!("could not connect: {}", e)
        } else {
            e.to_string()
        };
        let message = TicketError::sanitize_message(&message, api_key);
        tracing::error!(error = %message, "Ticket API unreachable");
        TicketError::transport(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attachment, TicketDraft};
    use crate::payload::assemble;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// "abc123:X" in base64.
    const EXPECTED_AUTH: &str = "Basic YWJjMTIzOlg=";

    fn client() -> FreshdeskClient {
        FreshdeskClient::new(Duration::from_secs(5)).unwrap()
    }

    fn draft() -> TicketDraft {
        TicketDraft::new("Printer down", "a@b.com")
    }

    #[test]
    fn test_tickets_endpoint_bare_host() {
        assert_eq!(
            FreshdeskClient::tickets_endpoint("example.freshdesk.com").unwrap(),
            "https://example.freshdesk.com/api/v2/tickets"
        );
        assert_eq!(
            FreshdeskClient::tickets_endpoint("example.freshdesk.com/").unwrap(),
            "https://example.freshdesk.com/api/v2/tickets"
        );
    }

    #[test]
    fn test_tickets_endpoint_keeps_scheme_and_suffix() {
        assert_eq!(
            FreshdeskClient::tickets_endpoint("http://127.0.0.1:8080").unwrap(),
            "http://127.0.0.1:8080/api/v2/tickets"
        );
        assert_eq!(
            FreshdeskClient::tickets_endpoint("https://acme.freshdesk.com/api/v2/").unwrap(),
            "https://acme.freshdesk.com/api/v2/tickets"
        );
        assert_eq!(
            FreshdeskClient::tickets_endpoint("https://acme.freshdesk.com/api/v2/tickets").unwrap(),
            "https://acme.freshdesk.com/api/v2/tickets"
        );
    }

    #[test]
    fn test_tickets_endpoint_rejects_garbage() {
        assert!(FreshdeskClient::tickets_endpoint("not a host").is_err());
    }

    #[test]
    fn test_ticket_web_url() {
        assert_eq!(
            FreshdeskClient::ticket_web_url("example.freshdesk.com", 42).as_deref(),
            Some("https://example.freshdesk.com/a/tickets/42")
        );
    }

    #[tokio::test]
    async fn test_json_dispatch_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/tickets"))
            .and(header("authorization", EXPECTED_AUTH))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "email": "a@b.com",
                "subject": "Printer down",
                "description": "",
                "priority": 1,
                "status": 2
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 77})))
            .expect(1)
            .mount(&server)
            .await;

        let creds = Credentials::new(&server.uri(), "abc123").unwrap();
        let request = assemble(&draft(), &[], &[]).unwrap();

        let ticket = client().dispatch(&creds, &request).await.unwrap();
        assert_eq!(ticket.id, Some(77));
        assert!(ticket.web_url.unwrap().ends_with("/a/tickets/77"));
    }

    #[tokio::test]
    async fn test_created_without_body_is_still_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let creds = Credentials::new(&server.uri(), "abc123").unwrap();
        let request = assemble(&draft(), &[], &[]).unwrap();

        let ticket = client().dispatch(&creds, &request).await.unwrap();
        assert_eq!(ticket, CreatedTicket { id: None, web_url: None });
    }

    #[tokio::test]
    async fn test_non_201_is_api_error_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "Invalid field"})),
            )
            .mount(&server)
            .await;

        let creds = Credentials::new(&server.uri(), "abc123").unwrap();
        let request = assemble(&draft(), &[], &[]).unwrap();

        let err = client().dispatch(&creds, &request).await.unwrap_err();
        match err {
            TicketError::Api { code, message } => {
                assert_eq!(code, 404);
                assert_eq!(message, "Invalid field");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_200_is_not_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let creds = Credentials::new(&server.uri(), "abc123").unwrap();
        let request = assemble(&draft(), &[], &[]).unwrap();

        let err = client().dispatch(&creds, &request).await.unwrap_err();
        assert!(matches!(err, TicketError::Api { code: 200, .. }));
    }

    #[tokio::test]
    async fn test_error_body_is_sanitized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key abc123"))
            .mount(&server)
            .await;

        let creds = Credentials::new(&server.uri(), "abc123").unwrap();
        let request = assemble(&draft(), &[], &[]).unwrap();

        let err = client().dispatch(&creds, &request).await.unwrap_err();
        assert!(!err.to_string().contains("abc123"));
    }

    #[tokio::test]
    async fn test_multipart_dispatch_sends_repeated_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/tickets"))
            .and(header("authorization", EXPECTED_AUTH))
            .and(header_regex("content-type", "^multipart/form-data; boundary="))
            .and(body_string_contains(r#"name="priority""#))
            .and(body_string_contains(r#"filename="one.txt""#))
            .and(body_string_contains(r#"filename="two.txt""#))
            .and(body_string_contains("first file"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one.txt");
        let two = dir.path().join("two.txt");
        std::fs::write(&one, "first file").unwrap();
        std::fs::write(&two, "second file").unwrap();

        let creds = Credentials::new(&server.uri(), "abc123").unwrap();
        let user = vec![Attachment::user_file(&one), Attachment::user_file(&two)];
        let request = assemble(&draft(), &user, &[]).unwrap();

        let ticket = client().dispatch(&creds, &request).await.unwrap();
        assert_eq!(ticket.id, Some(5));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Nothing listens on port 1.
        let creds = Credentials::new("http://127.0.0.1:1", "abc123").unwrap();
        let request = assemble(&draft(), &[], &[]).unwrap();

        let err = client().dispatch(&creds, &request).await.unwrap_err();
        assert!(matches!(err, TicketError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let creds = Credentials::new(&server.uri(), "abc123").unwrap();
        let request = assemble(&draft(), &[], &[]).unwrap();
        let client = FreshdeskClient::new(Duration::from_millis(200)).unwrap();

        let err = client.dispatch(&creds, &request).await.unwrap_err();
        match err {
            TicketError::Transport { message } => assert!(message.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
