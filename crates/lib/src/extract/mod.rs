pub mod decode;
pub mod engine;
pub mod types;

pub use decode::decode_output;
pub use engine::BatchExtractor;
pub use types::{
    BatchJob, BatchOptions, BatchPhase, BatchSummary, ExtractedItem, ExtractionResult,
    ResultKind, DEFAULT_MODEL, PRIMING_TOKEN,
};
