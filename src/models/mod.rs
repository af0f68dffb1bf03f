//! Data models for the ticketing API.
//!
//! This module contains the ticket draft, priority and status codes,
//! attachments, and the API's success and error response bodies.

mod attachment;
mod common;
mod ticket;

pub use attachment::*;
pub use common::*;
pub use ticket::*;
