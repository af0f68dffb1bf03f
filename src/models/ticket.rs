//! Ticket models.
//!
//! This module defines the draft a user composes, the priority and status
//! enumerations with their wire codes, and the ticket returned on creation.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::TicketError;

/// Ticket types the helpdesk accepts.
pub const TICKET_TYPES: &[&str] = &["Alert", "EDR", "Problem", "Task", "Sage", "Other"];

/// Ticket types that require a classification.
pub const CLASSIFIED_TYPES: &[&str] = &["Sage"];

/// Values of the classification custom field.
pub const CLASSIFICATIONS: &[&str] = &[
    "Intacct - Support Request",
    "Intacct - Report Issue",
    "Intacct - Enhancement Request",
    "SCM - Support Request",
    "SCM - Report Issue",
    "SCM - Enhancement Request",
    "Sage - Access Request",
    "Sage - System Down",
    "Sage - General Inquiry",
    "Password Reset",
];

/// Finds `value` in `choices`, ignoring case and surrounding whitespace.
///
/// Returns the canonical spelling.
pub fn canonical_choice(choices: &[&'static str], value: &str) -> Option<&'static str> {
    let value = value.trim();
    choices
        .iter()
        .copied()
        .find(|choice| choice.eq_ignore_ascii_case(value))
}

/// Ticket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Code 1.
    #[default]
    Low,
    /// Code 2.
    Medium,
    /// Code 3.
    High,
    /// Code 4.
    Urgent,
}

impl Priority {
    /// All priorities in code order.
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    /// Integer code sent to the API.
    pub fn code(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Urgent => "Urgent",
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = TicketError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Priority::ALL
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or_else(|| TicketError::validation(format!("priority must be 1-4, got {}", code)))
    }
}

impl FromStr for Priority {
    type Err = TicketError;

    /// Accepts a display name (any case) or an integer code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Priority::try_from(code);
        }
        Priority::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TicketError::validation(format!("unknown priority {:?}", s)))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ticket status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Code 2.
    #[default]
    Open,
    /// Code 3.
    Pending,
    /// Code 4.
    Resolved,
    /// Code 5.
    Closed,
}

impl Status {
    /// All statuses in code order.
    pub const ALL: [Status; 4] = [
        Status::Open,
        Status::Pending,
        Status::Resolved,
        Status::Closed,
    ];

    /// Integer code sent to the API.
    pub fn code(self) -> u8 {
        match self {
            Status::Open => 2,
            Status::Pending => 3,
            Status::Resolved => 4,
            Status::Closed => 5,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::Pending => "Pending",
            Status::Resolved => "Resolved",
            Status::Closed => "Closed",
        }
    }
}

impl TryFrom<u8> for Status {
    type Error = TicketError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Status::ALL
            .into_iter()
            .find(|s| s.code() == code)
            .ok_or_else(|| TicketError::validation(format!("status must be 2-5, got {}", code)))
    }
}

impl FromStr for Status {
    type Err = TicketError;

    /// Accepts a display name (any case) or an integer code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u8>() {
            return Status::try_from(code);
        }
        Status::ALL
            .into_iter()
            .find(|st| st.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TicketError::validation(format!("unknown status {:?}", s)))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A support request as composed by the user.
///
/// A fresh draft is built for every submission attempt.
#[derive(Debug, Clone, Default)]
pub struct TicketDraft {
    /// Ticket subject.
    pub subject: String,

    /// Email address of the requester.
    pub requester_email: String,

    /// Rich-text description (HTML, may contain inline base64 images).
    pub description_html: String,

    /// Ticket priority.
    pub priority: Priority,

    /// Ticket status.
    pub status: Status,

    /// Ticket type (e.g. "Sage").
    pub ticket_type: Option<String>,

    /// Classification, required for some ticket types.
    pub classification: Option<String>,
}

impl TicketDraft {
    /// Creates a draft with default priority and status.
    pub fn new(subject: impl Into<String>, requester_email: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            requester_email: requester_email.into(),
            ..Self::default()
        }
    }

    /// Sets the description HTML.
    pub fn with_description(mut self, html: impl Into<String>) -> Self {
        self.description_html = html.into();
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Sets the ticket type.
    pub fn with_type(mut self, ticket_type: impl Into<String>) -> Self {
        self.ticket_type = Some(ticket_type.into());
        self
    }

    /// Sets the classification.
    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    /// Returns the ticket type if it is set and not blank.
    pub fn ticket_type(&self) -> Option<&str> {
        non_blank(self.ticket_type.as_deref())
    }

    /// Returns the classification if it is set and not blank.
    pub fn classification(&self) -> Option<&str> {
        non_blank(self.classification.as_deref())
    }

    /// Returns true if the ticket type requires a classification.
    pub fn requires_classification(&self) -> bool {
        self.ticket_type()
            .and_then(|t| canonical_choice(CLASSIFIED_TYPES, t))
            .is_some()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Body of a 201 Created response.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketResponse {
    /// Ticket identifier assigned by the API.
    #[serde(default)]
    pub id: Option<u64>,
}

/// A ticket the API accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTicket {
    /// Ticket identifier, when the API returned one.
    pub id: Option<u64>,

    /// Agent-portal link to the ticket, when the id is known.
    pub web_url: Option<String>,
}
