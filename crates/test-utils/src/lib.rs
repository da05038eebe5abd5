use async_trait::async_trait;
use flightscan::errors::ExtractError;
use flightscan::providers::ai::{BatchProvider, BatchStatus, CallSpec, ResultEnvelope};
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// --- Mock Batch Provider ---

#[derive(Clone, Debug)]
enum MockResponse {
    Output(String),
    Failed(String),
    Omit,
}

#[derive(Debug, Default)]
struct MockState {
    responses: Vec<(String, MockResponse)>,
    default_output: Option<String>,
    extra_results: Vec<ResultEnvelope>,
    pending_polls: usize,
    never_end: bool,
    submit_error: Option<String>,
    submissions: Vec<Vec<CallSpec>>,
    status_calls: usize,
    cancelled: Vec<String>,
}

/// An in-memory batch service.
///
/// Responses are keyed by a unique substring of each request's user prompt.
/// Results are streamed in reverse submission order so that callers cannot rely
/// on position.
#[derive(Clone, Debug, Default)]
pub struct MockBatchProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockBatchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-programs the raw model output (after the priming token) for matching requests.
    pub fn add_response(&self, key: &str, raw_output: &str) {
        self.push(key, MockResponse::Output(raw_output.to_string()));
    }

    /// Makes matching requests fail on the service side.
    pub fn add_failure(&self, key: &str, reason: &str) {
        self.push(key, MockResponse::Failed(reason.to_string()));
    }

    /// Leaves matching requests out of the result stream.
    pub fn omit_result(&self, key: &str) {
        self.push(key, MockResponse::Omit);
    }

    /// Output used for requests that match no key.
    pub fn set_default_output(&self, raw_output: &str) {
        self.state.lock().unwrap().default_output = Some(raw_output.to_string());
    }

    /// Adds a result that does not belong to any submitted request.
    pub fn add_extra_result(&self, envelope: ResultEnvelope) {
        self.state.lock().unwrap().extra_results.push(envelope);
    }

    /// Number of non-terminal statuses reported before `Ended`.
    pub fn set_pending_polls(&self, polls: usize) {
        self.state.lock().unwrap().pending_polls = polls;
    }

    /// Keeps every job processing forever.
    pub fn never_end(&self) {
        self.state.lock().unwrap().never_end = true;
    }

    /// Rejects the next submissions with this message.
    pub fn fail_submission(&self, message: &str) {
        self.state.lock().unwrap().submit_error = Some(message.to_string());
    }

    /// Every batch submitted so far.
    pub fn submissions(&self) -> Vec<Vec<CallSpec>> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    pub fn cancelled_jobs(&self) -> Vec<String> {
        self.state.lock().unwrap().cancelled.clone()
    }

    fn push(&self, key: &str, response: MockResponse) {
        self.state
            .lock()
            .unwrap()
            .responses
            .push((key.to_string(), response));
    }

    fn job_index(job_id: &str) -> Option<usize> {
        job_id.strip_prefix("mock-batch-")?.parse().ok()
    }
}

#[async_trait]
impl BatchProvider for MockBatchProvider {
    async fn submit_batch(&self, requests: &[CallSpec]) -> Result<String, ExtractError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.submit_error {
            return Err(ExtractError::Submission(message.clone()));
        }
        state.submissions.push(requests.to_vec());
        Ok(format!("mock-batch-{}", state.submissions.len() - 1))
    }

    async fn get_status(&self, job_id: &str) -> Result<BatchStatus, ExtractError> {
        let mut state = self.state.lock().unwrap();
        let known = Self::job_index(job_id).is_some_and(|i| i < state.submissions.len());
        if !known {
            return Err(ExtractError::AiApi(format!("unknown batch {job_id}")));
        }
        state.status_calls += 1;
        if state.never_end || state.status_calls <= state.pending_polls {
            Ok(BatchStatus::Processing)
        } else {
            Ok(BatchStatus::Ended)
        }
    }

    async fn stream_results(
        &self,
        job_id: &str,
    ) -> Result<BoxStream<'static, ResultEnvelope>, ExtractError> {
        let state = self.state.lock().unwrap();
        let specs = Self::job_index(job_id)
            .and_then(|i| state.submissions.get(i))
            .ok_or_else(|| ExtractError::AiApi(format!("unknown batch {job_id}")))?;

        let mut envelopes: Vec<ResultEnvelope> = specs
            .iter()
            .rev()
            .filter_map(|spec| {
                let prompt = spec.user_prompt().unwrap_or_default();
                let programmed = state
                    .responses
                    .iter()
                    .find(|(key, _)| prompt.contains(key.as_str()))
                    .map(|(_, response)| response.clone());

                match programmed {
                    Some(MockResponse::Output(raw)) => {
                        Some(ResultEnvelope::output(&spec.custom_id, raw))
                    }
                    Some(MockResponse::Failed(reason)) => {
                        Some(ResultEnvelope::failed(&spec.custom_id, reason))
                    }
                    Some(MockResponse::Omit) => None,
                    None => Some(match &state.default_output {
                        Some(raw) => ResultEnvelope::output(&spec.custom_id, raw.clone()),
                        None => ResultEnvelope::failed(
                            &spec.custom_id,
                            format!("MockBatchProvider: no response programmed for prompt '{prompt}'"),
                        ),
                    }),
                }
            })
            .collect();
        envelopes.extend(state.extra_results.iter().cloned());

        Ok(stream::iter(envelopes).boxed())
    }

    async fn cancel_batch(&self, job_id: &str) -> Result<(), ExtractError> {
        self.state.lock().unwrap().cancelled.push(job_id.to_string());
        Ok(())
    }
}
