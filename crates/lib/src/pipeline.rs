//! # Extraction Pipeline
//!
//! Wires the components together: inputs are assembled into requests, extracted
//! in one batch, and materialized as one artifact per identifier.

use crate::errors::ExtractError;
use crate::extract::{BatchExtractor, BatchOptions, BatchSummary, ExtractedItem};
use crate::materialize::ResultMaterializer;
use crate::payload::{assemble_requests, ExtractionInput};
use crate::providers::ai::BatchProvider;
use crate::schema::ExtractionSchema;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// What a pipeline run produced.
#[derive(Debug)]
pub struct PipelineOutput<S> {
    pub items: Vec<ExtractedItem<S>>,
    pub summary: BatchSummary,
}

/// Runs assembly, batch extraction and materialization for schema `S`.
///
/// Assembly errors abort before any network call. Artifacts are only written
/// once the batch has been drained.
#[instrument(skip_all, fields(schema = S::NAME, inputs = inputs.len(), output_dir = %output_dir.display()))]
pub async fn run_extraction<S: ExtractionSchema>(
    provider: Box<dyn BatchProvider>,
    options: BatchOptions,
    inputs: Vec<ExtractionInput>,
    output_dir: &Path,
    cancel: &CancellationToken,
) -> Result<PipelineOutput<S>, ExtractError> {
    let requests = assemble_requests::<S>(inputs)?;
    let extractor = BatchExtractor::<S>::new(provider, options)?;

    let items = extractor.extract_with_cancel(&requests, cancel).await?;

    ResultMaterializer::new(output_dir).write_all(&items).await?;

    let summary = BatchSummary::from_items(&items);
    info!("Extraction pipeline finished: {summary}.");
    Ok(PipelineOutput { items, summary })
}
