//! # flightscan-html: HTML Email Normalizer
//!
//! Turns Gmail-shaped [`MessageRecord`]s into the plain text and PDF attachments
//! the extraction core works on. Implements [`ContentNormalizer`] from `flightscan`.

use flightscan::{
    payload::PDF_MEDIA_TYPE,
    source::{MessagePart, MessageRecord},
    Attachment, ContentNormalizer, ExtractError,
};
use scraper::{Html, Node};
use thiserror::Error;
use tracing::{debug, instrument, warn};

// --- Error Definitions ---

#[derive(Error, Debug)]
pub enum HtmlNormalizeError {
    #[error("Message content could not be decoded: {0}")]
    Decode(#[from] ExtractError),
    #[error("Part '{mime_type}' is not valid UTF-8: {source}")]
    Utf8 {
        mime_type: String,
        source: std::string::FromUtf8Error,
    },
}

impl From<HtmlNormalizeError> for ExtractError {
    fn from(err: HtmlNormalizeError) -> Self {
        match err {
            HtmlNormalizeError::Decode(e) => e,
            other => ExtractError::Normalization(other.to_string()),
        }
    }
}

// --- HTML Cleaning ---

/// Elements whose text is never part of the readable message.
const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Extracts the readable text of an HTML document.
///
/// Content of `head`, `script` and `style` elements is dropped and all runs of
/// whitespace collapse to a single space.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut words: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        if let Node::Text(text) = node.value() {
            let skipped = node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(element) => SKIPPED_ELEMENTS.contains(&element.name()),
                _ => false,
            });
            if !skipped {
                words.extend(text.split_whitespace());
            }
        }
    }
    words.join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// --- Normalizer ---

/// A [`ContentNormalizer`] for HTML booking emails.
///
/// Text comes from the top-level body if it carries data, otherwise from the
/// `text/html` parts (falling back to `text/plain`). Only PDF attachments are
/// kept, since those are what the model accepts as documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlNormalizer;

impl HtmlNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn decode_text(part: &MessagePart) -> Result<Option<String>, HtmlNormalizeError> {
        let Some(bytes) = part.decoded_data()? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes).map_err(|source| HtmlNormalizeError::Utf8 {
            mime_type: part.mime_type.clone(),
            source,
        })?;
        Ok(Some(text))
    }

    fn body_parts<'a>(record: &'a MessageRecord, mime_type: &str) -> Vec<&'a MessagePart> {
        record
            .payload
            .walk()
            .into_iter()
            .filter(|part| part.filename.is_empty() && part.mime_type.eq_ignore_ascii_case(mime_type))
            .collect()
    }

    fn text(&self, record: &MessageRecord) -> Result<String, HtmlNormalizeError> {
        if record.payload.parts.is_empty() {
            let body = Self::decode_text(&record.payload)?.unwrap_or_default();
            return Ok(if record.payload.mime_type.eq_ignore_ascii_case("text/plain") {
                collapse_whitespace(&body)
            } else {
                html_to_text(&body)
            });
        }

        let mut sections = Vec::new();
        for part in Self::body_parts(record, "text/html") {
            if let Some(html) = Self::decode_text(part)? {
                sections.push(html_to_text(&html));
            }
        }
        if sections.is_empty() {
            for part in Self::body_parts(record, "text/plain") {
                if let Some(text) = Self::decode_text(part)? {
                    sections.push(collapse_whitespace(&text));
                }
            }
        }
        sections.retain(|s| !s.is_empty());
        Ok(sections.join("\n"))
    }

    fn attachments(&self, record: &MessageRecord) -> Result<Vec<Attachment>, HtmlNormalizeError> {
        let mut attachments = Vec::new();
        for part in record.payload.walk() {
            if part.filename.is_empty() {
                continue;
            }
            let is_pdf = part.mime_type.eq_ignore_ascii_case(PDF_MEDIA_TYPE)
                || part.filename.to_ascii_lowercase().ends_with(".pdf");
            if !is_pdf {
                debug!(message_id = %record.id, filename = %part.filename, "Skipping non-PDF attachment.");
                continue;
            }
            match part.body.data.as_deref() {
                Some(data) => attachments.push(Attachment::from_urlsafe_base64(PDF_MEDIA_TYPE, data)?),
                None => warn!(
                    message_id = %record.id,
                    filename = %part.filename,
                    attachment_id = ?part.body.attachment_id,
                    "Attachment content is not inline; it must be fetched by the mailbox client."
                ),
            }
        }
        Ok(attachments)
    }
}

impl ContentNormalizer for HtmlNormalizer {
    #[instrument(skip_all, fields(message_id = %record.id))]
    fn extract_text(&self, record: &MessageRecord) -> Result<String, ExtractError> {
        Ok(self.text(record)?)
    }

    #[instrument(skip_all, fields(message_id = %record.id))]
    fn extract_attachments(&self, record: &MessageRecord) -> Result<Vec<Attachment>, ExtractError> {
        Ok(self.attachments(record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_script_style_and_head() {
        let html = r#"<html><head><title>Receipt</title><style>p { color: red; }</style></head>
            <body><script>var x = 1;</script><p>Flight   UA1234</p>
            <p>SFO&nbsp;to <b>JFK</b></p></body></html>"#;
        assert_eq!(html_to_text(html), "Flight UA1234 SFO to JFK");
    }

    #[test]
    fn test_empty_document_has_no_text() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("<html><body>  \n </body></html>"), "");
    }
}
