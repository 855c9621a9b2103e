use std::path::Path;
use std::time::Duration;

use camino::Utf8PathBuf;
use tracing::info;

use crate::bucket::BucketManager;
use crate::catalog::CatalogApi;
use crate::discovery::{discover, strategy_for};
use crate::domain::{ExportFormat, ImportMode, Query};
use crate::error::MefError;
use crate::export::{ExportOptions, ExportResult, export};
use crate::import::{ImportResult, import};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

impl ProgressEvent {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct GetOptions {
    pub query: Query,
    pub format: ExportFormat,
    /// Maximum number of records; zero means no limit.
    pub limit: usize,
    /// Records per archive; zero means a single archive.
    pub batch_size: usize,
    pub magic: bool,
    pub dry_run: bool,
    pub output_dir: Utf8PathBuf,
    pub timestamp: i64,
}

/// The `get` and `put` commands over one catalog session.
pub struct App<C: CatalogApi> {
    catalog: C,
    bucket: BucketManager,
}

impl<C: CatalogApi> App<C> {
    pub fn new(catalog: C, bucket: BucketManager) -> Self {
        Self { catalog, bucket }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Discovers the records matching the query and exports them in archives.
    pub fn get(&self, options: GetOptions, sink: &dyn ProgressSink) -> Result<ExportResult, MefError> {
        let strategy = strategy_for(options.magic);
        let ids = discover(&self.catalog, &options.query, options.limit, strategy.as_ref())?;
        info!(strategy = strategy.name(), count = ids.len(), "query resolved");
        sink.event(ProgressEvent::message(format!(
            "Query returned {} records",
            ids.len()
        )));

        let export_options = ExportOptions {
            batch_size: options.batch_size,
            format: options.format,
            dry_run: options.dry_run,
            output_dir: options.output_dir,
            timestamp: options.timestamp,
        };
        export(&self.catalog, &self.bucket, &ids, &export_options, sink)
    }

    /// Imports a local archive.
    pub fn put(
        &self,
        archive: &Path,
        mode: ImportMode,
        sink: &dyn ProgressSink,
    ) -> Result<ImportResult, MefError> {
        import(&self.catalog, archive, mode, sink)
    }
}

/// Batch size from the command line: anything below one means "everything in one archive".
pub fn batch_size_from(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}
