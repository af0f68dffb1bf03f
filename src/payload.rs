//! Request payload assembly.
//!
//! Turns a validated [`TicketDraft`] plus attachments into a
//! [`SubmissionRequest`]. The encoding follows from the attachments: a JSON
//! body when there are none, a multipart form when there is at least one.

use serde_json::{Map, Value};

use crate::error::TicketError;
use crate::models::{canonical_choice, Attachment, TicketDraft, CLASSIFICATIONS, TICKET_TYPES};

/// Multipart field key shared by every attachment part.
pub const ATTACHMENT_FIELD: &str = "attachments[]";

/// Custom field carrying the classification.
pub const CLASSIFICATION_FIELD: &str = "cf_classification";

/// How the request body is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `application/json`, native value types.
    Json,
    /// `multipart/form-data`, every field stringified.
    Multipart,
}

/// A ready-to-dispatch ticket request. Lives for one dispatch.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    /// Ticket fields with native JSON types.
    pub fields: Map<String, Value>,

    /// User files first, then extracted images.
    pub attachments: Vec<Attachment>,
}

impl SubmissionRequest {
    /// Encoding implied by the attachments.
    pub fn encoding(&self) -> Encoding {
        if self.attachments.is_empty() {
            Encoding::Json
        } else {
            Encoding::Multipart
        }
    }

    /// Body for the JSON encoding.
    pub fn json_body(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Text parts for the multipart encoding.
    ///
    /// Scalars are stringified and nested objects are flattened into
    /// `parent[child]` keys, e.g. `custom_fields[cf_classification]`.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (key, value) in &self.fields {
            flatten_field(key, value, &mut out);
        }
        out
    }
}

fn flatten_field(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (child, nested) in map {
                flatten_field(&format!("{}[{}]", key, child), nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_field(&format!("{}[]", key), item, out);
            }
        }
        Value::String(s) => out.push((key.to_string(), s.clone())),
        Value::Null => {}
        other => out.push((key.to_string(), other.to_string())),
    }
}

/// Validates the draft and builds the request.
///
/// # Errors
///
/// Returns `TicketError::Validation` if the subject or email is blank, the
/// email is not an address, the type or classification is not a known
/// value, a classified ticket type has no classification, or a user
/// attachment is not a readable regular file.
pub fn assemble(
    draft: &TicketDraft,
    user_attachments: &[Attachment],
    extracted: &[Attachment],
) -> Result<SubmissionRequest, TicketError> {
    validate_draft(draft)?;
    validate_user_attachments(user_attachments)?;

    let mut fields = Map::new();
    fields.insert("email".into(), Value::from(draft.requester_email.trim()));
    fields.insert("subject".into(), Value::from(draft.subject.trim()));
    fields.insert("description".into(), Value::from(draft.description_html.as_str()));
    fields.insert("priority".into(), Value::from(draft.priority.code()));
    fields.insert("status".into(), Value::from(draft.status.code()));

    if let Some(ticket_type) = draft
        .ticket_type()
        .and_then(|t| canonical_choice(TICKET_TYPES, t))
    {
        fields.insert("type".into(), Value::from(ticket_type));
    }
    if let Some(classification) = draft
        .classification()
        .and_then(|c| canonical_choice(CLASSIFICATIONS, c))
    {
        let mut custom = Map::new();
        custom.insert(CLASSIFICATION_FIELD.into(), Value::from(classification));
        fields.insert("custom_fields".into(), Value::Object(custom));
    }

    let attachments: Vec<Attachment> = user_attachments
        .iter()
        .chain(extracted.iter())
        .cloned()
        .collect();

    let request = SubmissionRequest {
        fields,
        attachments,
    };

    tracing::debug!(
        subject = %draft.subject.trim(),
        priority = draft.priority.code(),
        status = draft.status.code(),
        attachments = request.attachments.len(),
        encoding = ?request.encoding(),
        "Ticket payload assembled"
    );

    Ok(request)
}

fn validate_draft(draft: &TicketDraft) -> Result<(), TicketError> {
    let mut missing = Vec::new();
    if draft.subject.trim().is_empty() {
        missing.push("subject");
    }
    if draft.requester_email.trim().is_empty() {
        missing.push("email");
    }
    if !missing.is_empty() {
        return Err(TicketError::validation(format!(
            "required fields are missing: {}",
            missing.join(", ")
        )));
    }

    if !looks_like_email(draft.requester_email.trim()) {
        return Err(TicketError::validation(format!(
            "{:?} is not a valid email address",
            draft.requester_email.trim()
        )));
    }

    if let Some(ticket_type) = draft.ticket_type() {
        if canonical_choice(TICKET_TYPES, ticket_type).is_none() {
            return Err(TicketError::validation(format!(
                "unknown ticket type {:?}; expected one of: {}",
                ticket_type,
                TICKET_TYPES.join(", ")
            )));
        }
    }

    if let Some(classification) = draft.classification() {
        if canonical_choice(CLASSIFICATIONS, classification).is_none() {
            return Err(TicketError::validation(format!(
                "unknown classification {:?}; expected one of: {}",
                classification,
                CLASSIFICATIONS.join(", ")
            )));
        }
    }

    if draft.requires_classification() && draft.classification().is_none() {
        return Err(TicketError::validation(format!(
            "classification is required for {} tickets",
            draft.ticket_type().unwrap_or_default()
        )));
    }

    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        _ => false,
    }
}

fn validate_user_attachments(attachments: &[Attachment]) -> Result<(), TicketError> {
    for attachment in attachments {
        if !attachment.source_path.is_file() {
            return Err(TicketError::validation(format!(
                "attachment {} does not exist or is not a file",
                attachment.source_path.display()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Status};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn draft() -> TicketDraft {
        TicketDraft::new("Printer down", "a@b.com")
    }

    #[test]
    fn test_json_when_no_attachments() {
        let request = assemble(&draft(), &[], &[]).unwrap();
        assert_eq!(request.encoding(), Encoding::Json);
        assert_eq!(
            request.json_body(),
            json!({
                "email": "a@b.com",
                "subject": "Printer down",
                "description": "",
                "priority": 1,
                "status": 2
            })
        );
    }

    #[test]
    fn test_codes_are_integers() {
        let d = draft()
            .with_priority(Priority::Urgent)
            .with_status(Status::Closed);
        let request = assemble(&d, &[], &[]).unwrap();
        assert_eq!(request.fields["priority"], json!(4));
        assert_eq!(request.fields["status"], json!(5));
    }

    #[test]
    fn test_multipart_when_attachments_present() {
        let dir = tempfile::tempdir().unwrap();
        let user_path = dir.path().join("log.txt");
        std::fs::write(&user_path, "log").unwrap();

        let user = vec![Attachment::user_file(&user_path)];
        let extracted = vec![Attachment::owned(
            "embedded_image_1.png",
            dir.path().join("embedded_image_1.png"),
        )];

        let request = assemble(&draft(), &user, &extracted).unwrap();

        assert_eq!(request.encoding(), Encoding::Multipart);
        let names: Vec<&str> = request
            .attachments
            .iter()
            .map(|a| a.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["log.txt", "embedded_image_1.png"]);
    }

    #[test]
    fn test_form_fields_are_stringified_and_flattened() {
        let d = draft()
            .with_type("sage")
            .with_classification("sage - access request");
        let request = assemble(&d, &[], &[]).unwrap();
        let mut form = request.form_fields();
        form.sort();
        assert_eq!(
            form,
            vec![
                (
                    "custom_fields[cf_classification]".to_string(),
                    "Sage - Access Request".to_string()
                ),
                ("description".to_string(), "".to_string()),
                ("email".to_string(), "a@b.com".to_string()),
                ("priority".to_string(), "1".to_string()),
                ("status".to_string(), "2".to_string()),
                ("subject".to_string(), "Printer down".to_string()),
                ("type".to_string(), "Sage".to_string()),
            ]
        );
    }

    #[test]
    fn test_optional_fields_omitted_when_absent() {
        let d = draft().with_type(" ").with_classification("");
        let request = assemble(&d, &[], &[]).unwrap();
        assert!(!request.fields.contains_key("type"));
        assert!(!request.fields.contains_key("custom_fields"));
    }

    #[test]
    fn test_blank_subject_and_email_rejected() {
        let d = TicketDraft::new("  ", "");
        let err = assemble(&d, &[], &[]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("subject"));
        assert!(msg.contains("email"));
    }

    #[test]
    fn test_invalid_email_rejected() {
        for email in ["no-at-sign", "a@", "@b.com", "a@b@c", "a b@c.com"] {
            let d = TicketDraft::new("s", email);
            assert!(
                matches!(assemble(&d, &[], &[]), Err(TicketError::Validation(_))),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn test_sage_requires_classification() {
        let d = draft().with_type("Sage");
        let err = assemble(&d, &[], &[]).unwrap_err();
        assert!(matches!(err, TicketError::Validation(_)));
        assert!(err.to_string().contains("Sage"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let d = draft().with_type("Hardware");
        let err = assemble(&d, &[], &[]).unwrap_err();
        assert!(matches!(err, TicketError::Validation(_)));
        assert!(err.to_string().contains("Hardware"));
    }

    #[test]
    fn test_unknown_classification_rejected() {
        let d = draft().with_type("Sage").with_classification("Payroll");
        let err = assemble(&d, &[], &[]).unwrap_err();
        assert!(matches!(err, TicketError::Validation(_)));
        assert!(err.to_string().contains("Payroll"));
    }

    #[test]
    fn test_missing_user_attachment_rejected() {
        let user = vec![Attachment::user_file("/definitely/not/here.txt")];
        let err = assemble(&draft(), &user, &[]).unwrap_err();
        assert!(err.to_string().contains("not/here.txt"));
    }
}
