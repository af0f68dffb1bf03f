//! # TicketMaker
//!
//! TicketMaker submits support tickets to Freshdesk. A ticket is composed of
//! a subject, requester email, rich-text description, priority and status,
//! optional type and classification, and file attachments.
//!
//! ## Features
//!
//! - **Inline images**: base64 images pasted into the description are
//!   extracted to temporary files and uploaded as attachments
//! - **Encoding**: JSON body without attachments, multipart form with them
//! - **Cleanup**: temporary files are deleted on every exit path
//! - **Credentials**: environment, JSON file, or in-memory secret stores
//! - **Security**: API keys are never logged or exposed in error messages
//!
//! ## Architecture
//!
//! - [`config`] - Runtime settings from environment variables
//! - [`credentials`] - Secret stores and the credential resolver
//! - [`error`] - Error type with API key sanitization
//! - [`models`] - Ticket draft, attachments, API response bodies
//! - [`normalizer`] - Inline image extraction
//! - [`payload`] - Validation and request assembly
//! - [`freshdesk_client`] - HTTP dispatch and response classification
//! - [`cleanup`] - Temporary file cleanup
//! - [`pipeline`] - The end-to-end submission flow
//!
//! ## Usage
//!
//! ```bash
//! export TICKETMAKER_URL=example.freshdesk.com
//! export TICKETMAKER_API_KEY=your-api-key
//!
//! ticketmaker submit --subject "Printer down" --email a@b.com \
//!     --description "<p>Paper jam</p>" --priority high --attachment photo.jpg
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use ticketmaker::credentials::{CredentialResolver, EnvStore};
//! use ticketmaker::freshdesk_client::FreshdeskClient;
//! use ticketmaker::models::{Priority, TicketDraft};
//! use ticketmaker::pipeline::{StaticDescription, TicketPipeline};
//!
//! async fn example() -> Result<(), ticketmaker::error::TicketError> {
//!     let resolver = CredentialResolver::new(Box::new(EnvStore));
//!     let pipeline = TicketPipeline::new(resolver, FreshdeskClient::with_default_timeout()?);
//!
//!     let draft = TicketDraft::new("Printer down", "a@b.com").with_priority(Priority::High);
//!     let description = StaticDescription("<p>Paper jam on floor 2</p>".to_string());
//!
//!     let ticket = pipeline.submit(draft, &[], &description).await?;
//!     println!("created ticket {:?}", ticket.id);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cleanup;
pub mod config;
pub mod credentials;
pub mod error;
pub mod freshdesk_client;
pub mod models;
pub mod normalizer;
pub mod payload;
pub mod pipeline;
