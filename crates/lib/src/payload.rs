//! # Payload Assembly
//!
//! Turns caller inputs (identifier, text context, optional attachments) into
//! [`ExtractionRequest`]s whose message body is ready for the inference provider:
//! one document block per attachment, in order, followed by exactly one text block.

use crate::errors::ExtractError;
use crate::schema::{ExtractionSchema, TextContext};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// The media type of PDF attachments, the only kind the mailbox scan forwards.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Binary attachment content held as standard (padded) base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    media_type: String,
    data: String,
}

impl Attachment {
    /// Encodes raw bytes.
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            data: general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Wraps a standard base64 string after checking that it decodes.
    pub fn from_base64(
        media_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Result<Self, ExtractError> {
        let data = data.into();
        general_purpose::STANDARD.decode(&data)?;
        Ok(Self {
            media_type: media_type.into(),
            data,
        })
    }

    /// Converts URL-safe base64 (as returned by the Gmail API) to standard base64.
    pub fn from_urlsafe_base64(
        media_type: impl Into<String>,
        data: &str,
    ) -> Result<Self, ExtractError> {
        let bytes = decode_urlsafe(data)?;
        Ok(Self::from_bytes(media_type, &bytes))
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn to_base64(&self) -> &str {
        &self.data
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ExtractError> {
        Ok(general_purpose::STANDARD.decode(&self.data)?)
    }
}

/// Decodes URL-safe base64 with or without padding.
pub fn decode_urlsafe(data: &str) -> Result<Vec<u8>, ExtractError> {
    let trimmed = data.trim_end_matches('=');
    Ok(general_purpose::URL_SAFE_NO_PAD.decode(trimmed)?)
}

/// Source of a document content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

/// One block of a user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Document { source: DocumentSource },
    Text { text: String },
}

impl From<&Attachment> for ContentBlock {
    fn from(attachment: &Attachment) -> Self {
        ContentBlock::Document {
            source: DocumentSource {
                kind: "base64".to_string(),
                media_type: attachment.media_type().to_string(),
                data: attachment.to_base64().to_string(),
            },
        }
    }
}

/// One caller input: an identifier, its text context and optional attachments.
#[derive(Debug, Clone, Default)]
pub struct ExtractionInput {
    pub identifier: String,
    pub text_context: TextContext,
    pub attachments: Option<Vec<Attachment>>,
}

impl ExtractionInput {
    pub fn new(identifier: impl Into<String>, text_context: TextContext) -> Self {
        Self {
            identifier: identifier.into(),
            text_context,
            attachments: None,
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }
}

/// An assembled, immutable request for one input document.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    correlation_id: String,
    identifier: String,
    text_context: TextContext,
    attachments: Option<Vec<Attachment>>,
    content: Vec<ContentBlock>,
}

impl ExtractionRequest {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn text_context(&self) -> &TextContext {
        &self.text_context
    }

    pub fn attachments(&self) -> Option<&[Attachment]> {
        self.attachments.as_deref()
    }

    /// The user-turn content blocks: documents first, then the prompt text.
    pub fn content(&self) -> &[ContentBlock] {
        &self.content
    }
}

/// Derives the stable correlation id for an identifier.
///
/// The lowercase hex MD5 digest is 32 characters of `[0-9a-f]`, which fits the
/// provider's custom id rules regardless of what the identifier contains.
pub fn correlation_id_for(identifier: &str) -> String {
    format!("{:x}", md5::compute(identifier.as_bytes()))
}

/// Rejects identifiers that cannot name an artifact file on their own.
pub fn validate_identifier(identifier: &str) -> Result<(), ExtractError> {
    let invalid = identifier.is_empty()
        || identifier == "."
        || identifier == ".."
        || identifier.contains(['/', '\\', '\0']);
    if invalid {
        return Err(ExtractError::InvalidIdentifier(identifier.to_string()));
    }
    Ok(())
}

/// Builds one request per input, preserving order.
pub fn assemble_request<S: ExtractionSchema>(
    input: ExtractionInput,
) -> Result<ExtractionRequest, ExtractError> {
    validate_identifier(&input.identifier)?;
    let mut content: Vec<ContentBlock> = input
        .attachments
        .iter()
        .flatten()
        .map(ContentBlock::from)
        .collect();
    content.push(ContentBlock::Text {
        text: S::user_prompt(&input.text_context)?,
    });

    Ok(ExtractionRequest {
        correlation_id: correlation_id_for(&input.identifier),
        identifier: input.identifier,
        text_context: input.text_context,
        attachments: input.attachments,
        content,
    })
}

/// Assembles a whole batch, failing before any network call on the first bad input.
pub fn assemble_requests<S: ExtractionSchema>(
    inputs: Vec<ExtractionInput>,
) -> Result<Vec<ExtractionRequest>, ExtractError> {
    let mut seen = HashSet::with_capacity(inputs.len());
    let mut requests = Vec::with_capacity(inputs.len());

    for input in inputs {
        let request = assemble_request::<S>(input)?;
        if !seen.insert(request.correlation_id.clone()) {
            return Err(ExtractError::DuplicateCorrelationId(
                request.identifier.clone(),
            ));
        }
        debug!(
            identifier = %request.identifier,
            correlation_id = %request.correlation_id,
            blocks = request.content.len(),
            "Assembled extraction request"
        );
        requests.push(request);
    }

    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SanityCheck;

    fn sanity_context(word: &str, text: &str) -> TextContext {
        TextContext::from([
            ("word".to_string(), word.to_string()),
            ("text".to_string(), text.to_string()),
        ])
    }

    #[test]
    fn test_attachment_base64_round_trip() {
        let encoded = general_purpose::STANDARD.encode(b"%PDF-1.4 boarding pass");
        let attachment = Attachment::from_base64(PDF_MEDIA_TYPE, encoded.clone()).unwrap();
        assert_eq!(attachment.to_base64(), encoded);
        assert_eq!(attachment.to_bytes().unwrap(), b"%PDF-1.4 boarding pass");
    }

    #[test]
    fn test_attachment_rejects_invalid_base64() {
        let err = Attachment::from_base64(PDF_MEDIA_TYPE, "not*base64!").unwrap_err();
        assert!(matches!(err, ExtractError::AttachmentEncoding(_)));
    }

    #[test]
    fn test_attachment_from_urlsafe() {
        let urlsafe = general_purpose::URL_SAFE_NO_PAD.encode([0xfb, 0xff, 0xfe]);
        let attachment = Attachment::from_urlsafe_base64(PDF_MEDIA_TYPE, &urlsafe).unwrap();
        assert_eq!(attachment.to_base64(), "+//+");
    }

    #[test]
    fn test_assembles_documents_before_text() {
        let first = Attachment::from_bytes(PDF_MEDIA_TYPE, b"one");
        let second = Attachment::from_bytes(PDF_MEDIA_TYPE, b"two");
        let input = ExtractionInput::new("mail-1", sanity_context("solo", "solo bolo"))
            .with_attachments(vec![first.clone(), second.clone()]);

        let request = assemble_request::<SanityCheck>(input).unwrap();
        let content = request.content();
        assert_eq!(content.len(), 3);
        assert_eq!(content[0], ContentBlock::from(&first));
        assert_eq!(content[1], ContentBlock::from(&second));
        assert!(matches!(&content[2], ContentBlock::Text { text } if text.contains("solo bolo")));
        assert_eq!(request.correlation_id(), correlation_id_for("mail-1"));
    }

    #[test]
    fn test_assembly_keeps_empty_text_inputs() {
        let inputs = vec![
            ExtractionInput::new("a", sanity_context("x", "")),
            ExtractionInput::new("b", sanity_context("x", "y")),
        ];
        let requests = assemble_requests::<SanityCheck>(inputs).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].identifier(), "a");
        assert_eq!(requests[1].identifier(), "b");
    }

    #[test]
    fn test_assembly_fails_on_missing_context_field() {
        let mut ctx = sanity_context("x", "y");
        ctx.remove("text");
        let err = assemble_requests::<SanityCheck>(vec![ExtractionInput::new("a", ctx)])
            .unwrap_err();
        assert!(matches!(err, ExtractError::MissingContextField(key) if key == "text"));
    }

    #[test]
    fn test_assembly_rejects_path_like_identifiers() {
        let inputs = vec![
            ExtractionInput::new("a", sanity_context("solo", "solo")),
            ExtractionInput::new("trips/b", sanity_context("solo", "solo")),
        ];
        let err = assemble_requests::<SanityCheck>(inputs).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidIdentifier(id) if id == "trips/b"));
    }

    #[test]
    fn test_assembly_rejects_duplicate_identifiers() {
        let inputs = vec![
            ExtractionInput::new("same", sanity_context("x", "1")),
            ExtractionInput::new("same", sanity_context("x", "2")),
        ];
        let err = assemble_requests::<SanityCheck>(inputs).unwrap_err();
        assert!(matches!(err, ExtractError::DuplicateCorrelationId(id) if id == "same"));
    }

    #[test]
    fn test_content_block_wire_shape() {
        let block = ContentBlock::from(&Attachment::from_bytes(PDF_MEDIA_TYPE, b"hi"));
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "document",
                "source": { "type": "base64", "media_type": "application/pdf", "data": "aGk=" }
            })
        );
    }
}
