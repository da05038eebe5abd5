//! # Batch Extraction Engine
//!
//! Drives one remote batch job per call to [`BatchExtractor::extract`]:
//!
//! ```text
//! Building -> Submitted -> Polling -> Drained
//! ```
//!
//! Submission failures abort the whole batch. Once the job has ended, every
//! result is decoded on its own, so one bad output never affects the others.
//! The output always has exactly one entry per request, in submission order.

use super::decode::decode_output;
use super::types::{
    BatchJob, BatchOptions, BatchPhase, BatchSummary, ExtractedItem, ExtractionResult,
    PRIMING_TOKEN,
};
use crate::errors::ExtractError;
use crate::payload::ExtractionRequest;
use crate::providers::ai::{
    BatchProvider, CallParams, CallSpec, Message, MessageContent, ResultOutcome, Role,
};
use crate::schema::{project_meta_schema, ExtractionSchema, MetaSchema};
use futures::StreamExt;
use std::collections::HashMap;
use std::marker::PhantomData;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Extracts `S` records from assembled requests through a batch provider.
///
/// The meta-schema and system prompt are derived once, at construction.
#[derive(Debug)]
pub struct BatchExtractor<S: ExtractionSchema> {
    provider: Box<dyn BatchProvider>,
    options: BatchOptions,
    meta_schema: MetaSchema,
    system_prompt: String,
    _schema: PhantomData<fn() -> S>,
}

impl<S: ExtractionSchema> BatchExtractor<S> {
    /// Creates an engine for schema `S`.
    ///
    /// Fails with [`ExtractError::InvalidSchema`] if `S` projects to no fields.
    pub fn new(provider: Box<dyn BatchProvider>, options: BatchOptions) -> Result<Self, ExtractError> {
        let meta_schema = project_meta_schema::<S>()?;
        if meta_schema.is_empty() {
            return Err(ExtractError::InvalidSchema(format!(
                "schema '{}' declares no fields",
                S::NAME
            )));
        }
        let system_prompt = S::system_prompt(&meta_schema);
        debug!(schema = S::NAME, system_prompt = %system_prompt, "Prepared batch extractor");

        Ok(Self {
            provider,
            options,
            meta_schema,
            system_prompt,
            _schema: PhantomData,
        })
    }

    pub fn meta_schema(&self) -> &MetaSchema {
        &self.meta_schema
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    fn priming_prefix(&self) -> Option<&'static str> {
        self.options.prime_json.then_some(PRIMING_TOKEN)
    }

    /// Builds the provider call for one request.
    pub fn build_call_spec(&self, request: &ExtractionRequest) -> CallSpec {
        let mut messages = vec![Message {
            role: Role::User,
            content: MessageContent::Blocks(request.content().to_vec()),
        }];
        if let Some(prefix) = self.priming_prefix() {
            messages.push(Message {
                role: Role::Assistant,
                content: MessageContent::Text(prefix.to_string()),
            });
        }

        CallSpec {
            custom_id: request.correlation_id().to_string(),
            params: CallParams {
                model: self.options.model.clone(),
                max_tokens: self.options.max_tokens,
                temperature: self.options.temperature,
                top_p: self.options.top_p,
                system: self.system_prompt.clone(),
                messages,
            },
        }
    }

    /// Runs a batch to completion without a cancellation path.
    pub async fn extract(
        &self,
        requests: &[ExtractionRequest],
    ) -> Result<Vec<ExtractedItem<S>>, ExtractError> {
        self.extract_with_cancel(requests, &CancellationToken::new())
            .await
    }

    /// Runs a batch to completion, aborting with [`ExtractError::Cancelled`]
    /// if `cancel` fires before the job has ended.
    #[instrument(skip_all, fields(schema = S::NAME, count = requests.len()))]
    pub async fn extract_with_cancel(
        &self,
        requests: &[ExtractionRequest],
        cancel: &CancellationToken,
    ) -> Result<Vec<ExtractedItem<S>>, ExtractError> {
        if requests.is_empty() {
            info!("No requests to extract; skipping batch submission.");
            return Ok(Vec::new());
        }

        // --- Building ---
        debug!(phase = ?BatchPhase::Building, "Building {} call specifications.", requests.len());
        let index = correlation_index(requests)?;
        let specs: Vec<CallSpec> = requests.iter().map(|r| self.build_call_spec(r)).collect();

        if cancel.is_cancelled() {
            return Err(ExtractError::Cancelled);
        }

        // --- Submitted ---
        let job_id = self.provider.submit_batch(&specs).await?;
        let mut job = BatchJob::new(job_id, specs.len());
        info!(phase = ?BatchPhase::Submitted, job_id = %job.job_id, "Submitted batch of {} requests.", job.submitted);

        // --- Polling ---
        self.wait_for_completion(&mut job, cancel).await?;

        // --- Drained ---
        let items = self.drain(&job, requests, &index).await?;
        let summary = BatchSummary::from_items(&items);
        info!(phase = ?BatchPhase::Drained, job_id = %job.job_id, "Batch finished: {summary}.");
        Ok(items)
    }

    async fn wait_for_completion(
        &self,
        job: &mut BatchJob,
        cancel: &CancellationToken,
    ) -> Result<(), ExtractError> {
        let started = Instant::now();
        let mut polls = 0usize;

        loop {
            if cancel.is_cancelled() {
                self.abandon(&job.job_id).await;
                return Err(ExtractError::Cancelled);
            }

            let reported = self.provider.get_status(&job.job_id).await?;
            polls += 1;
            if !job.advance(reported) {
                warn!(
                    job_id = %job.job_id,
                    "Provider reported {reported:?} after {:?}; keeping the later status.",
                    job.status
                );
            }
            debug!(phase = ?BatchPhase::Polling, job_id = %job.job_id, poll = polls, status = ?job.status);

            if job.status.is_terminal() {
                info!(job_id = %job.job_id, "Batch ended after {polls} polls.");
                return Ok(());
            }

            let waited = started.elapsed();
            if let Some(max_wait) = self.options.max_wait {
                if waited >= max_wait {
                    self.abandon(&job.job_id).await;
                    return Err(ExtractError::BatchTimeout {
                        job_id: job.job_id.clone(),
                        waited,
                    });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    self.abandon(&job.job_id).await;
                    return Err(ExtractError::Cancelled);
                }
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }
        }
    }

    /// Asks the provider to stop a job we are giving up on.
    async fn abandon(&self, job_id: &str) {
        warn!(job_id, "Abandoning batch before it ended.");
        if let Err(e) = self.provider.cancel_batch(job_id).await {
            warn!(job_id, "Failed to cancel batch: {e}");
        }
    }

    async fn drain(
        &self,
        job: &BatchJob,
        requests: &[ExtractionRequest],
        index: &HashMap<&str, usize>,
    ) -> Result<Vec<ExtractedItem<S>>, ExtractError> {
        let mut slots: Vec<Option<ExtractionResult<S>>> =
            std::iter::repeat_with(|| None).take(requests.len()).collect();
        let mut results = self.provider.stream_results(&job.job_id).await?;

        while let Some(envelope) = results.next().await {
            let Some(&position) = index.get(envelope.correlation_id.as_str()) else {
                warn!(
                    job_id = %job.job_id,
                    correlation_id = %envelope.correlation_id,
                    "Ignoring result for an id that was not submitted."
                );
                continue;
            };
            if slots[position].is_some() {
                warn!(
                    correlation_id = %envelope.correlation_id,
                    "Ignoring duplicate result; keeping the first."
                );
                continue;
            }

            let result = match envelope.outcome {
                ResultOutcome::Output(raw) => decode_output::<S>(&raw, self.priming_prefix()),
                ResultOutcome::Failed(reason) => ExtractionResult::Malformed(reason),
            };
            if let ExtractionResult::Malformed(reason) = &result {
                warn!(
                    identifier = requests[position].identifier(),
                    correlation_id = %envelope.correlation_id,
                    "Malformed result: {reason}"
                );
            }
            slots[position] = Some(result);
        }

        Ok(requests
            .iter()
            .zip(slots)
            .map(|(request, slot)| {
                let result = slot.unwrap_or_else(|| {
                    warn!(
                        identifier = request.identifier(),
                        correlation_id = request.correlation_id(),
                        "No result returned for request."
                    );
                    ExtractionResult::Missing
                });
                ExtractedItem {
                    correlation_id: request.correlation_id().to_string(),
                    identifier: request.identifier().to_string(),
                    result,
                }
            })
            .collect())
    }
}

/// Maps each correlation id to its submission position, rejecting duplicates.
fn correlation_index(
    requests: &[ExtractionRequest],
) -> Result<HashMap<&str, usize>, ExtractError> {
    let mut index = HashMap::with_capacity(requests.len());
    for (position, request) in requests.iter().enumerate() {
        if index.insert(request.correlation_id(), position).is_some() {
            return Err(ExtractError::DuplicateCorrelationId(
                request.correlation_id().to_string(),
            ));
        }
    }
    Ok(index)
}
