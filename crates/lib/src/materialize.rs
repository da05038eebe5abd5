//! # Result Materialization
//!
//! Writes one JSON artifact per input identifier. Records are written in full;
//! every other outcome is written as `{}` so that "processed, nothing found"
//! can be told apart from "never processed" (no file).

use crate::errors::ExtractError;
use crate::extract::{ExtractedItem, ExtractionResult};
use crate::payload::validate_identifier;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The artifact body for outcomes without a record.
pub const EMPTY_ARTIFACT: &str = "{}";

#[derive(Debug, Clone)]
pub struct ResultMaterializer {
    output_dir: PathBuf,
}

impl ResultMaterializer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The artifact path for an identifier: `<output_dir>/<identifier>.json`.
    pub fn artifact_path(&self, identifier: &str) -> Result<PathBuf, ExtractError> {
        validate_identifier(identifier)?;
        Ok(self.output_dir.join(format!("{identifier}.json")))
    }

    /// Renders an outcome to its artifact body. Deterministic for equal inputs.
    pub fn render<S: Serialize>(result: &ExtractionResult<S>) -> Result<String, ExtractError> {
        match result {
            ExtractionResult::Record(record) => Ok(serde_json::to_string_pretty(record)?),
            ExtractionResult::Empty | ExtractionResult::Malformed(_) | ExtractionResult::Missing => {
                Ok(EMPTY_ARTIFACT.to_string())
            }
        }
    }

    /// Writes (or overwrites) the artifact for one identifier.
    pub async fn write<S: Serialize>(
        &self,
        identifier: &str,
        result: &ExtractionResult<S>,
    ) -> Result<PathBuf, ExtractError> {
        let path = self.artifact_path(identifier)?;
        let body = Self::render(result)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(&path, body).await?;
        debug!(identifier, kind = ?result.kind(), "Wrote artifact {}", path.display());
        Ok(path)
    }

    /// Writes the artifacts for a whole batch, in order.
    pub async fn write_all<S: Serialize>(
        &self,
        items: &[ExtractedItem<S>],
    ) -> Result<Vec<PathBuf>, ExtractError> {
        let mut paths = Vec::with_capacity(items.len());
        for item in items {
            paths.push(self.write(&item.identifier, &item.result).await?);
        }
        info!(
            "Wrote {} artifacts to {}.",
            paths.len(),
            self.output_dir.display()
        );
        Ok(paths)
    }
}
