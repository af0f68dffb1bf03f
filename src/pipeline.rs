//! The ticket submission pipeline.
//!
//! One call to [`TicketPipeline::submit`] runs, in order: credential
//! resolution, description retrieval, image extraction, payload assembly,
//! dispatch, and cleanup. Cleanup runs on every path once extraction has
//! started.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::cleanup::{cleanup, ScratchSpace};
use crate::config::{Settings, DEFAULT_CONTENT_TIMEOUT_SECS};
use crate::credentials::CredentialResolver;
use crate::error::TicketError;
use crate::freshdesk_client::{FreshdeskClient, SubmissionResult};
use crate::models::{Attachment, TicketDraft};
use crate::normalizer::normalize;
use crate::payload::{assemble, SubmissionRequest};

/// Where the rich-text description comes from.
///
/// Called once per submission attempt.
#[async_trait]
pub trait DescriptionSource: Send + Sync {
    /// Fetches the current content as an HTML string.
    async fn fetch_html(&self) -> Result<String, TicketError>;
}

/// A description already held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticDescription(pub String);

#[async_trait]
impl DescriptionSource for StaticDescription {
    async fn fetch_html(&self) -> Result<String, TicketError> {
        Ok(self.0.clone())
    }
}

/// A description read from an HTML file when the submission starts.
#[derive(Debug, Clone)]
pub struct FileDescription(pub PathBuf);

#[async_trait]
impl DescriptionSource for FileDescription {
    async fn fetch_html(&self) -> Result<String, TicketError> {
        Ok(tokio::fs::read_to_string(&self.0).await?)
    }
}

/// Runs submissions against one credential source and HTTP client.
pub struct TicketPipeline {
    resolver: CredentialResolver,
    client: FreshdeskClient,
    content_timeout: Duration,
    scratch_parent: Option<PathBuf>,
}

impl TicketPipeline {
    /// Creates a pipeline with the default description timeout.
    pub fn new(resolver: CredentialResolver, client: FreshdeskClient) -> Self {
        Self {
            resolver,
            client,
            content_timeout: Duration::from_secs(DEFAULT_CONTENT_TIMEOUT_SECS),
            scratch_parent: None,
        }
    }

    /// Creates a pipeline using the timeouts from `settings`.
    pub fn from_settings(
        resolver: CredentialResolver,
        settings: &Settings,
    ) -> Result<Self, TicketError> {
        let client = FreshdeskClient::new(settings.request_timeout)?;
        Ok(Self::new(resolver, client).with_content_timeout(settings.content_timeout))
    }

    /// Sets how long to wait for the description source.
    pub fn with_content_timeout(mut self, timeout: Duration) -> Self {
        self.content_timeout = timeout;
        self
    }

    /// Creates scratch directories under `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(dir.into());
        self
    }

    /// Submits a ticket. See [`TicketPipeline::submit_until`].
    pub async fn submit(
        &self,
        draft: TicketDraft,
        user_attachments: &[Attachment],
        source: &dyn DescriptionSource,
    ) -> SubmissionResult {
        self.submit_until(draft, user_attachments, source, std::future::pending())
            .await
    }

    /// Submits a ticket unless `cancel` completes before dispatch starts.
    ///
    /// The draft's description is replaced by whatever `source` returns.
    /// Once the HTTP request is issued, `cancel` is no longer observed.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` before anything else happens
    /// - `Transport` if the description source times out
    /// - `MalformedEmbeddedImage` or `Validation` before dispatch
    /// - `Cancelled` if `cancel` fired first
    /// - `Api` or `Transport` from dispatch
    pub async fn submit_until<C>(
        &self,
        draft: TicketDraft,
        user_attachments: &[Attachment],
        source: &dyn DescriptionSource,
        cancel: C,
    ) -> SubmissionResult
    where
        C: Future<Output = ()>,
    {
        let credentials = self.resolver.resolve()?;
        let mut scratch = self.scratch()?;

        tokio::pin!(cancel);
        let prepared = tokio::select! {
            biased;
            _ = &mut cancel => {
                tracing::info!("Submission cancelled before dispatch");
                Err(TicketError::Cancelled)
            }
            prepared = self.prepare(draft, user_attachments, source, &mut scratch) => prepared,
        };

        let request = match prepared {
            Ok(request) => request,
            Err(e) => {
                scratch.purge();
                return Err(e);
            }
        };

        let result = self.client.dispatch(&credentials, &request).await;
        cleanup(&request.attachments);
        drop(scratch);

        match &result {
            Ok(ticket) => tracing::info!(ticket_id = ?ticket.id, "Submission succeeded"),
            Err(e) => tracing::warn!(
                error = %e.sanitized_display(credentials.api_key().expose()),
                "Submission failed"
            ),
        }
        result
    }

    async fn prepare(
        &self,
        mut draft: TicketDraft,
        user_attachments: &[Attachment],
        source: &dyn DescriptionSource,
        scratch: &mut ScratchSpace,
    ) -> Result<SubmissionRequest, TicketError> {
        let html = tokio::time::timeout(self.content_timeout, source.fetch_html())
            .await
            .map_err(|_| {
                TicketError::transport(format!(
                    "timed out after {:?} waiting for the description content",
                    self.content_timeout
                ))
            })??;

        let normalized = normalize(&html, scratch)?;
        draft.description_html = normalized.text;
        assemble(&draft, user_attachments, &normalized.extracted)
    }

    fn scratch(&self) -> Result<ScratchSpace, TicketError> {
        let scratch = match &self.scratch_parent {
            Some(parent) => ScratchSpace::new_in(parent)?,
            None => ScratchSpace::new()?,
        };
        Ok(scratch)
    }
}
