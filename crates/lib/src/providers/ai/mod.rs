pub mod anthropic;

use crate::errors::ExtractError;
use crate::payload::ContentBlock;
use async_trait::async_trait;
use dyn_clone::DynClone;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// --- Batch call specification (wire shape of one batched request) ---

/// Sampling and routing parameters shared by every call in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub system: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A turn's content: either plain text or an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// One request inside a batch, correlated to its result by `custom_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSpec {
    pub custom_id: String,
    pub params: CallParams,
}

impl CallSpec {
    /// The text of the final block of the first user turn, i.e. the rendered user prompt.
    pub fn user_prompt(&self) -> Option<&str> {
        self.params
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .and_then(|m| match &m.content {
                MessageContent::Text(text) => Some(text.as_str()),
                MessageContent::Blocks(blocks) => blocks.iter().rev().find_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::Document { .. } => None,
                }),
            })
    }

    /// The priming text of a trailing assistant turn, if any.
    pub fn assistant_prefill(&self) -> Option<&str> {
        match self.params.messages.last() {
            Some(Message {
                role: Role::Assistant,
                content: MessageContent::Text(text),
            }) => Some(text.as_str()),
            _ => None,
        }
    }
}

// --- Batch status and results ---

/// Processing state of a remote batch. Ordered so that `max` never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BatchStatus {
    Pending,
    Processing,
    Ended,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        self == BatchStatus::Ended
    }
}

/// What the service produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultOutcome {
    /// The model's raw text output (without any priming prefix).
    Output(String),
    /// The request errored, was cancelled or expired on the service side.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEnvelope {
    pub correlation_id: String,
    pub outcome: ResultOutcome,
}

impl ResultEnvelope {
    pub fn output(correlation_id: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            outcome: ResultOutcome::Output(raw_output.into()),
        }
    }

    pub fn failed(correlation_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            outcome: ResultOutcome::Failed(reason.into()),
        }
    }
}

/// A trait for interacting with a batch inference service.
///
/// The engine owns a job from submission through drain; implementations only
/// translate these four calls to the service's protocol.
#[async_trait]
pub trait BatchProvider: Send + Sync + Debug + DynClone {
    /// Submits all call specifications as one batch and returns the job id.
    async fn submit_batch(&self, requests: &[CallSpec]) -> Result<String, ExtractError>;

    /// Queries the processing status of a job.
    async fn get_status(&self, job_id: &str) -> Result<BatchStatus, ExtractError>;

    /// Retrieves the per-request results of an ended job, in no particular order.
    async fn stream_results(
        &self,
        job_id: &str,
    ) -> Result<BoxStream<'static, ResultEnvelope>, ExtractError>;

    /// Asks the service to stop processing a job. Best effort.
    async fn cancel_batch(&self, job_id: &str) -> Result<(), ExtractError>;
}

dyn_clone::clone_trait_object!(BatchProvider);
