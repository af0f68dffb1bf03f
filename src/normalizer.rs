//! Extraction of inline images from rich-text descriptions.
//!
//! Editors embed pasted images as `data:` URIs. The ticketing API does not
//! render those, so each one is written to a scratch file and uploaded as an
//! attachment. The description text itself is left unchanged.

use std::fs;
use std::sync::OnceLock;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use regex::Regex;

use crate::cleanup::{cleanup, ScratchSpace};
use crate::error::TicketError;
use crate::models::Attachment;

/// Matches `<img ... src="data:image/<type>;base64,<data>"`, one per tag.
const EMBEDDED_IMAGE_PATTERN: &str =
    r#"(?i)<img\b[^>]*?\bsrc\s*=\s*"data:image/([^;"]*?);base64,([^"]*?)""#;

static EMBEDDED_IMAGE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Standard alphabet, lenient about the bits left over in a truncated final
/// symbol and about padding.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

fn embedded_image_regex() -> &'static Regex {
    EMBEDDED_IMAGE_REGEX
        .get_or_init(|| Regex::new(EMBEDDED_IMAGE_PATTERN).expect("valid regex pattern"))
}

/// Result of normalizing a description.
#[derive(Debug, Clone)]
pub struct NormalizedDescription {
    /// The description content, unmodified.
    pub text: String,

    /// One owned attachment per inline image, in document order.
    pub extracted: Vec<Attachment>,
}

/// Writes every inline image in `description_html` into `scratch`.
///
/// Files are named `embedded_image_<i>.<ext>` with `i` starting at 1.
///
/// # Errors
///
/// Returns `TicketError::MalformedEmbeddedImage` if an image cannot be
/// decoded, and `TicketError::Io` if a file cannot be written. Images
/// written before the failure are deleted before returning.
pub fn normalize(
    description_html: &str,
    scratch: &mut ScratchSpace,
) -> Result<NormalizedDescription, TicketError> {
    let mut extracted = Vec::new();

    for (offset, captures) in embedded_image_regex()
        .captures_iter(description_html)
        .enumerate()
    {
        let index = offset + 1;
        let image_type = captures.get(1).map_or("", |m| m.as_str());
        let data = captures.get(2).map_or("", |m| m.as_str());

        match write_image(index, image_type, data, scratch) {
            Ok(attachment) => extracted.push(attachment),
            Err(e) => {
                tracing::warn!(index, error = %e, "Failed to extract embedded image");
                cleanup(&extracted);
                return Err(e);
            }
        }
    }

    if !extracted.is_empty() {
        tracing::debug!(count = extracted.len(), "Extracted embedded images");
    }

    for attachment in &extracted {
        scratch.track(attachment.clone());
    }

    Ok(NormalizedDescription {
        text: description_html.to_string(),
        extracted,
    })
}

fn write_image(
    index: usize,
    image_type: &str,
    data: &str,
    scratch: &ScratchSpace,
) -> Result<Attachment, TicketError> {
    let bytes =
        decode_image_data(data).map_err(|reason| TicketError::malformed_image(index, reason))?;

    let file_name = format!("embedded_image_{}.{}", index, extension_for(image_type));
    let path = scratch.path().join(&file_name);
    fs::write(&path, &bytes)?;

    tracing::trace!(index, bytes = bytes.len(), path = %path.display(), "Embedded image written");

    Ok(Attachment::owned(file_name, path))
}

/// Decodes standard base64, padding truncated input with `=` first.
///
/// Bits left over in the last symbol are dropped. A final group holding a
/// single symbol carries no whole byte and is rejected.
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, String> {
    let mut cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if cleaned.is_empty() {
        return Err("image data is empty".to_string());
    }

    let remainder = cleaned.len() % 4;
    if remainder != 0 {
        cleaned.extend(std::iter::repeat('=').take(4 - remainder));
    }

    LENIENT_STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| e.to_string())
}

/// Maps a MIME subtype to a file extension.
pub fn extension_for(image_type: &str) -> String {
    let image_type = image_type.trim().to_ascii_lowercase();
    match image_type.as_str() {
        "jpeg" | "pjpeg" => "jpg".to_string(),
        "svg+xml" => "svg".to_string(),
        "x-icon" | "vnd.microsoft.icon" => "ico".to_string(),
        other => {
            let ext: String = other.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
            if ext.is_empty() {
                "bin".to_string()
            } else {
                ext
            }
        }
    }
}
