use std::time::Duration;
use thiserror::Error;

/// Custom error types for the extraction library.
///
/// Assembly-time variants (`MissingContextField`, `AttachmentEncoding`,
/// `DuplicateCorrelationId`) are raised before any network call. Per-item
/// failures inside a finished batch are never errors; they are reported as
/// [`crate::ExtractionResult`] variants instead.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("API key is missing")]
    MissingApiKey,
    #[error("Prompt template references '{0}', which is missing from the text context")]
    MissingContextField(String),
    #[error("Attachment is not valid base64: {0}")]
    AttachmentEncoding(#[from] base64::DecodeError),
    #[error("Duplicate correlation id in batch: {0}")]
    DuplicateCorrelationId(String),
    #[error("Schema cannot be used for extraction: {0}")]
    InvalidSchema(String),
    #[error("Batch submission was rejected: {0}")]
    Submission(String),
    #[error("Batch {job_id} did not end within {waited:?}")]
    BatchTimeout { job_id: String, waited: Duration },
    #[error("Batch extraction was cancelled")]
    Cancelled,
    #[error("Identifier cannot be used as an artifact name: {0}")]
    InvalidIdentifier(String),
    #[error("Failed to normalize message content: {0}")]
    Normalization(String),
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}
