use std::time::Instant;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::info;

use crate::app::{ProgressEvent, ProgressSink};
use crate::bucket::BucketManager;
use crate::catalog::CatalogApi;
use crate::domain::{ExportFormat, RecordId, archive_file_name, partition};
use crate::error::MefError;
use crate::fs_util::ensure_dir;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Records per archive; zero puts everything in one archive.
    pub batch_size: usize,
    pub format: ExportFormat,
    pub dry_run: bool,
    pub output_dir: Utf8PathBuf,
    /// Unix seconds shared by every archive name of the run.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub discovered: usize,
    pub dry_run: bool,
    pub batches: Vec<BatchResult>,
}

impl ExportResult {
    pub fn written_files(&self) -> Vec<&Utf8PathBuf> {
        self.batches
            .iter()
            .filter(|batch| batch.written)
            .map(|batch| &batch.path)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub index: usize,
    pub records: usize,
    /// Size the server reported for the bucket after staging.
    pub staged: usize,
    pub path: Utf8PathBuf,
    pub written: bool,
    pub bytes: Option<u64>,
}

/// Stages each batch in the transfer bucket and downloads its archive.
///
/// The bucket is emptied before the first batch and after every batch, whether or not the
/// batch succeeded, so no identifiers leak from one archive into the next.
pub fn export(
    catalog: &dyn CatalogApi,
    bucket: &BucketManager,
    ids: &[RecordId],
    options: &ExportOptions,
    sink: &dyn ProgressSink,
) -> Result<ExportResult, MefError> {
    let batches = partition(ids, options.batch_size);
    let total = batches.len();
    let mut results = Vec::with_capacity(total);

    if total > 0 {
        if !options.dry_run {
            ensure_dir(&options.output_dir)?;
        }
        bucket.clear(catalog)?;
    }

    for (offset, batch) in batches.into_iter().enumerate() {
        let index = offset + 1;
        let outcome = export_batch(catalog, bucket, batch, index, total, options, sink);
        let cleared = bucket.clear(catalog);
        let result = outcome?;
        cleared?;
        results.push(result);
    }

    Ok(ExportResult {
        discovered: ids.len(),
        dry_run: options.dry_run,
        batches: results,
    })
}

fn export_batch(
    catalog: &dyn CatalogApi,
    bucket: &BucketManager,
    batch: &[RecordId],
    index: usize,
    total: usize,
    options: &ExportOptions,
    sink: &dyn ProgressSink,
) -> Result<BatchResult, MefError> {
    bucket.fill(catalog, batch)?;
    let staged = bucket.verify(catalog, batch.len())?;

    sink.event(ProgressEvent::message(format!(
        "[{index}/{total}] Retrieving {} MEF archive ({staged} records)...",
        options.format
    )));
    let file_name = archive_file_name(options.format, options.timestamp, index, total);
    let path = options.output_dir.join(file_name);

    if options.dry_run {
        sink.event(ProgressEvent::message(format!("Would write {path}")));
        return Ok(BatchResult {
            index,
            records: batch.len(),
            staged,
            path,
            written: false,
            bytes: None,
        });
    }

    let start = Instant::now();
    let bytes = catalog.export_mef(bucket.name(), options.format, path.as_std_path())?;
    info!(%path, bytes, "archive written");
    sink.event(ProgressEvent {
        message: format!("Wrote {path}"),
        elapsed: Some(start.elapsed()),
    });

    Ok(BatchResult {
        index,
        records: batch.len(),
        staged,
        path,
        written: true,
        bytes: Some(bytes),
    })
}
