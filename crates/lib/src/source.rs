//! # Message Source Contract
//!
//! The mailbox client is an external collaborator. It yields [`MessageRecord`]s
//! shaped like the Gmail `users.messages.get` payload, and a [`ContentNormalizer`]
//! turns each record into the plain text and attachments the extraction core needs.

use crate::errors::ExtractError;
use crate::payload::{decode_urlsafe, Attachment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    /// URL-safe base64 content, present for inline bodies and small attachments.
    #[serde(default)]
    pub data: Option<String>,
    /// Reference to separately fetched attachment content.
    #[serde(default)]
    pub attachment_id: Option<String>,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// This part followed by all nested parts, depth first.
    pub fn walk(&self) -> Vec<&MessagePart> {
        let mut out = vec![self];
        for part in &self.parts {
            out.extend(part.walk());
        }
        out
    }

    /// Decodes the inline body data, if any.
    pub fn decoded_data(&self) -> Result<Option<Vec<u8>>, ExtractError> {
        self.body.data.as_deref().map(decode_urlsafe).transpose()
    }
}

/// One raw message as returned by the mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    /// Milliseconds since the Unix epoch, as a decimal string.
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: MessagePart,
}

impl MessageRecord {
    /// The first top-level header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    pub fn message_id(&self) -> Option<&str> {
        self.header("Message-ID")
    }

    /// The time the mailbox received the message.
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.internal_date.as_deref()?.parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

/// Turns a raw message into extraction inputs.
pub trait ContentNormalizer: Send + Sync {
    /// The message's readable text (HTML bodies cleaned to text).
    fn extract_text(&self, record: &MessageRecord) -> Result<String, ExtractError>;

    /// The message's forwardable attachments, in message order.
    fn extract_attachments(&self, record: &MessageRecord) -> Result<Vec<Attachment>, ExtractError>;
}
