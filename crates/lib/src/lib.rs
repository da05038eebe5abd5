//! # Flight Booking Extraction
//!
//! This crate turns unstructured booking emails (cleaned HTML text plus optional
//! PDF attachments) into typed flight records using a batch inference API.
//!
//! The flow is: [`payload::assemble_requests`] builds one request per input from a
//! schema's prompts, [`BatchExtractor`] submits them as one batch job, polls until it
//! ends and decodes each result independently, and [`ResultMaterializer`] writes one
//! artifact per input identifier. [`pipeline::run_extraction`] runs all three.

pub mod errors;
pub mod extract;
pub mod materialize;
pub mod payload;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod schema;
pub mod search_query;
pub mod source;

pub use errors::ExtractError;
pub use extract::{BatchExtractor, BatchOptions, ExtractedItem, ExtractionResult};
pub use materialize::ResultMaterializer;
pub use payload::{Attachment, ExtractionInput, ExtractionRequest};
pub use schema::{ExtractionSchema, FlightInfo, MetaSchema, SanityCheck, TextContext};
pub use source::{ContentNormalizer, MessageRecord};

pub use tokio_util::sync::CancellationToken;
