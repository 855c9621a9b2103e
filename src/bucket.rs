use tracing::{debug, warn};

use crate::catalog::CatalogApi;
use crate::domain::RecordId;
use crate::error::MefError;

/// Identifiers sent per selection PUT, keeping the request line short.
pub const BUCKET_BATCH_SIZE: usize = 100;

/// Stages identifiers in a named server-side selection.
#[derive(Debug, Clone)]
pub struct BucketManager {
    name: String,
    batch_size: usize,
}

impl BucketManager {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batch_size: BUCKET_BATCH_SIZE,
        }
    }

    /// Overrides the per-request size; zero falls back to the default.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = if batch_size == 0 {
            BUCKET_BATCH_SIZE
        } else {
            batch_size
        };
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn fill(&self, catalog: &dyn CatalogApi, ids: &[RecordId]) -> Result<(), MefError> {
        for chunk in ids.chunks(self.batch_size) {
            debug!(bucket = %self.name, count = chunk.len(), "adding to selection");
            catalog.add_to_selection(&self.name, chunk)?;
        }
        Ok(())
    }

    /// Deleting an absent or empty selection is not an error on the server side.
    pub fn clear(&self, catalog: &dyn CatalogApi) -> Result<(), MefError> {
        debug!(bucket = %self.name, "clearing selection");
        catalog.delete_selection(&self.name)
    }

    /// Reads the selection back and returns the size the server reports.
    pub fn verify(&self, catalog: &dyn CatalogApi, expected: usize) -> Result<usize, MefError> {
        let actual = catalog.selection(&self.name)?.len();
        if actual != expected {
            warn!(
                bucket = %self.name,
                expected,
                actual,
                "selection size differs from the staged batch"
            );
        }
        Ok(actual)
    }
}

impl Default for BucketManager {
    fn default() -> Self {
        Self::new(crate::domain::TRANSFER_BUCKET)
    }
}
