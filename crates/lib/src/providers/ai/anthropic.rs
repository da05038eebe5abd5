use crate::{
    errors::ExtractError,
    providers::ai::{BatchProvider, BatchStatus, CallSpec, ResultEnvelope},
};
use async_trait::async_trait;
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";

// --- Anthropic-specific request and response structures ---

#[derive(Serialize)]
struct CreateBatchRequest<'a> {
    requests: &'a [CallSpec],
}

#[derive(Deserialize, Debug)]
struct MessageBatch {
    id: String,
    processing_status: String,
}

#[derive(Deserialize, Debug)]
struct BatchResultLine {
    custom_id: String,
    result: BatchResult,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BatchResult {
    Succeeded { message: ResultMessage },
    Errored { error: Value },
    Canceled,
    Expired,
}

#[derive(Deserialize, Debug)]
struct ResultMessage {
    content: Vec<ResultContent>,
}

#[derive(Deserialize, Debug)]
struct ResultContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

// --- Anthropic Provider implementation ---

/// A provider for the Anthropic Message Batches API.
#[derive(Clone)]
pub struct AnthropicBatchProvider {
    client: ReqwestClient,
    api_url: String,
    api_key: String,
    api_version: String,
}

impl fmt::Debug for AnthropicBatchProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnthropicBatchProvider")
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl AnthropicBatchProvider {
    /// Creates a new `AnthropicBatchProvider`.
    ///
    /// `api_url` is the service root (e.g. `https://api.anthropic.com`), without
    /// the `/v1/...` path.
    pub fn new(api_url: String, api_key: String) -> Result<Self, ExtractError> {
        if api_key.trim().is_empty() {
            return Err(ExtractError::MissingApiKey);
        }
        let client = ReqwestClient::builder()
            .build()
            .map_err(ExtractError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Overrides the `anthropic-version` header.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    fn batches_url(&self) -> String {
        format!("{}/v1/messages/batches", self.api_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ExtractError> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(ExtractError::AiRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractError::AiApi(error_text));
        }
        Ok(response)
    }
}

fn map_processing_status(status: &str) -> BatchStatus {
    match status {
        "ended" => BatchStatus::Ended,
        "in_progress" | "canceling" => BatchStatus::Processing,
        other => {
            debug!("Unrecognized batch processing status '{other}', treating as pending.");
            BatchStatus::Pending
        }
    }
}

/// Splits a chunked body into trimmed lines. A trailing line without a newline
/// is emitted at the end of the body; a partial line is dropped if the body fails.
fn split_lines<S, B, E>(chunks: S) -> impl Stream<Item = String>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    stream::unfold(
        (chunks, Vec::new(), false),
        |(mut chunks, mut buffer, finished)| async move {
            if finished {
                return None;
            }
            match chunks.next().await {
                Some(Ok(chunk)) => {
                    buffer.extend_from_slice(chunk.as_ref());
                    let lines = drain_complete_lines(&mut buffer);
                    Some((lines, (chunks, buffer, false)))
                }
                Some(Err(e)) => {
                    warn!("Batch results body failed mid-stream: {e}");
                    None
                }
                None => {
                    let rest = String::from_utf8_lossy(&buffer).trim().to_string();
                    buffer.clear();
                    Some((vec![rest], (chunks, buffer, true)))
                }
            }
        },
    )
    .flat_map(stream::iter)
}

fn drain_complete_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(end) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=end).collect();
        lines.push(String::from_utf8_lossy(&line).trim().to_string());
    }
    lines
}

fn parse_result_line(line: &str) -> Option<ResultEnvelope> {
    let parsed: BatchResultLine = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Skipping unparseable batch result line: {e}");
            return None;
        }
    };

    let envelope = match parsed.result {
        BatchResult::Succeeded { message } => {
            let text: String = message
                .content
                .into_iter()
                .filter(|c| c.kind == "text")
                .filter_map(|c| c.text)
                .collect();
            ResultEnvelope::output(parsed.custom_id, text)
        }
        BatchResult::Errored { error } => {
            ResultEnvelope::failed(parsed.custom_id, format!("errored: {error}"))
        }
        BatchResult::Canceled => ResultEnvelope::failed(parsed.custom_id, "canceled"),
        BatchResult::Expired => ResultEnvelope::failed(parsed.custom_id, "expired"),
    };
    Some(envelope)
}

#[async_trait]
impl BatchProvider for AnthropicBatchProvider {
    #[instrument(skip(self, requests), fields(count = requests.len()))]
    async fn submit_batch(&self, requests: &[CallSpec]) -> Result<String, ExtractError> {
        let response = self
            .authorized(self.client.post(self.batches_url()))
            .json(&CreateBatchRequest { requests })
            .send()
            .await
            .map_err(|e| ExtractError::Submission(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractError::Submission(format!("{status}: {error_text}")));
        }

        let batch: MessageBatch = response
            .json()
            .await
            .map_err(ExtractError::AiDeserialization)?;

        info!(
            "Created message batch {} (status: {}).",
            batch.id, batch.processing_status
        );
        Ok(batch.id)
    }

    #[instrument(skip(self))]
    async fn get_status(&self, job_id: &str) -> Result<BatchStatus, ExtractError> {
        let url = format!("{}/{job_id}", self.batches_url());
        let batch: MessageBatch = self
            .send(self.client.get(url))
            .await?
            .json()
            .await
            .map_err(ExtractError::AiDeserialization)?;
        Ok(map_processing_status(&batch.processing_status))
    }

    #[instrument(skip(self))]
    async fn stream_results(
        &self,
        job_id: &str,
    ) -> Result<BoxStream<'static, ResultEnvelope>, ExtractError> {
        let url = format!("{}/{job_id}/results", self.batches_url());
        let chunks = self.send(self.client.get(url)).await?.bytes_stream().boxed();
        debug!("Streaming results for batch {job_id}.");

        Ok(split_lines(chunks)
            .filter(|line| future::ready(!line.is_empty()))
            .filter_map(|line| future::ready(parse_result_line(&line)))
            .boxed())
    }

    #[instrument(skip(self))]
    async fn cancel_batch(&self, job_id: &str) -> Result<(), ExtractError> {
        let url = format!("{}/{job_id}/cancel", self.batches_url());
        self.send(self.client.post(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ai::ResultOutcome;

    #[test]
    fn test_maps_processing_status() {
        assert_eq!(map_processing_status("in_progress"), BatchStatus::Processing);
        assert_eq!(map_processing_status("canceling"), BatchStatus::Processing);
        assert_eq!(map_processing_status("ended"), BatchStatus::Ended);
        assert_eq!(map_processing_status("queued"), BatchStatus::Pending);
    }

    #[test]
    fn test_parses_succeeded_line() {
        let line = r#"{"custom_id":"abc","result":{"type":"succeeded","message":{"id":"msg_1","content":[{"type":"text","text":"\"a\": 1}"}]}}}"#;
        let envelope = parse_result_line(line).unwrap();
        assert_eq!(envelope.correlation_id, "abc");
        assert_eq!(envelope.outcome, ResultOutcome::Output("\"a\": 1}".to_string()));
    }

    #[test]
    fn test_parses_errored_and_expired_lines() {
        let errored = r#"{"custom_id":"e","result":{"type":"errored","error":{"type":"error","error":{"type":"overloaded_error","message":"busy"}}}}"#;
        let expired = r#"{"custom_id":"x","result":{"type":"expired"}}"#;
        assert!(matches!(
            parse_result_line(errored).unwrap().outcome,
            ResultOutcome::Failed(reason) if reason.contains("overloaded_error")
        ));
        assert_eq!(
            parse_result_line(expired).unwrap().outcome,
            ResultOutcome::Failed("expired".to_string())
        );
    }

    #[tokio::test]
    async fn test_split_lines_joins_lines_across_chunks() {
        let chunks = stream::iter(vec![
            Ok::<_, std::convert::Infallible>("{\"a\":".as_bytes().to_vec()),
            Ok("1}\r\n\n{\"b\"".as_bytes().to_vec()),
            Ok(":2}\n{\"c\":3}".as_bytes().to_vec()),
        ]);
        let lines: Vec<String> = split_lines(chunks).collect().await;
        assert_eq!(lines, vec!["{\"a\":1}", "", "{\"b\":2}", "{\"c\":3}"]);
    }

    #[tokio::test]
    async fn test_split_lines_keeps_multibyte_chars_split_across_chunks() {
        let arrow = "SFO → JFK\n".as_bytes();
        let (head, tail) = arrow.split_at(5);
        let chunks = stream::iter(vec![
            Ok::<_, std::convert::Infallible>(head.to_vec()),
            Ok(tail.to_vec()),
        ]);
        let lines: Vec<String> = split_lines(chunks).collect().await;
        assert_eq!(lines, vec!["SFO → JFK", ""]);
    }

    #[tokio::test]
    async fn test_split_lines_drops_partial_line_on_body_error() {
        let chunks = stream::iter(vec![
            Ok("{\"a\":1}\n{\"b\"".as_bytes().to_vec()),
            Err("connection reset"),
        ]);
        let lines: Vec<String> = split_lines(chunks).collect().await;
        assert_eq!(lines, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_skips_garbage_line() {
        assert!(parse_result_line("not json").is_none());
    }

    #[test]
    fn test_rejects_empty_api_key() {
        let err = AnthropicBatchProvider::new(DEFAULT_API_URL.to_string(), " ".to_string())
            .unwrap_err();
        assert!(matches!(err, ExtractError::MissingApiKey));
    }
}
