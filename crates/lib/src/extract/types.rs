use crate::providers::ai::BatchStatus;
use std::fmt;
use std::time::Duration;

/// The outcome of extraction for one submitted request.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult<S> {
    /// The model's output validated against the schema.
    Record(S),
    /// The model reported that the input holds nothing to extract (`{}`).
    Empty,
    /// The output could not be parsed or validated, or the service failed the request.
    Malformed(String),
    /// No result for this request appeared in the result stream.
    Missing,
}

impl<S> ExtractionResult<S> {
    pub fn kind(&self) -> ResultKind {
        match self {
            ExtractionResult::Record(_) => ResultKind::Record,
            ExtractionResult::Empty => ResultKind::Empty,
            ExtractionResult::Malformed(_) => ResultKind::Malformed,
            ExtractionResult::Missing => ResultKind::Missing,
        }
    }

    pub fn record(&self) -> Option<&S> {
        match self {
            ExtractionResult::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<S> {
        match self {
            ExtractionResult::Record(record) => Some(record),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Record,
    Empty,
    Malformed,
    Missing,
}

/// One entry of the engine's output, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedItem<S> {
    pub correlation_id: String,
    pub identifier: String,
    pub result: ExtractionResult<S>,
}

/// Per-kind counts over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub records: usize,
    pub empty: usize,
    pub malformed: usize,
    pub missing: usize,
}

impl BatchSummary {
    pub fn from_items<S>(items: &[ExtractedItem<S>]) -> Self {
        items.iter().fold(Self::default(), |mut summary, item| {
            match item.result.kind() {
                ResultKind::Record => summary.records += 1,
                ResultKind::Empty => summary.empty += 1,
                ResultKind::Malformed => summary.malformed += 1,
                ResultKind::Missing => summary.missing += 1,
            }
            summary
        })
    }

    pub fn total(&self) -> usize {
        self.records + self.empty + self.malformed + self.missing
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records, {} empty, {} malformed, {} missing",
            self.records, self.empty, self.malformed, self.missing
        )
    }
}

/// Model and polling parameters for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Time between status polls.
    pub poll_interval: Duration,
    /// Upper bound on the total polling time. `None` waits indefinitely.
    pub max_wait: Option<Duration>,
    /// Append a `{` assistant turn so the model continues a JSON object.
    pub prime_json: bool,
}

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";

/// The forced start of the assistant's answer.
pub const PRIMING_TOKEN: &str = "{";

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            top_p: 1.0,
            poll_interval: Duration::from_secs(5),
            max_wait: Some(Duration::from_secs(24 * 60 * 60)),
            prime_json: true,
        }
    }
}

/// Where a batch run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Building,
    Submitted,
    Polling,
    Drained,
}

/// A submitted remote job, owned by the engine until drained.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub job_id: String,
    pub status: BatchStatus,
    pub submitted: usize,
}

impl BatchJob {
    pub fn new(job_id: String, submitted: usize) -> Self {
        Self {
            job_id,
            status: BatchStatus::Pending,
            submitted,
        }
    }

    /// Records a reported status. Returns `false` if the report would move the
    /// job backwards; the job keeps its furthest status in that case.
    pub fn advance(&mut self, reported: BatchStatus) -> bool {
        if reported < self.status {
            return false;
        }
        self.status = reported;
        true
    }
}
