use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::app::{ProgressEvent, ProgressSink};
use crate::archive::MefArchive;
use crate::catalog::CatalogApi;
use crate::domain::ImportMode;
use crate::error::MefError;

#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub archive: String,
    pub mode: ImportMode,
    /// Records sent one by one (`record`) or contained in the uploaded archive.
    pub records: usize,
}

/// Replays a local MEF archive into the catalog. Any failed call stops the import.
pub fn import(
    catalog: &dyn CatalogApi,
    archive_path: &Path,
    mode: ImportMode,
    sink: &dyn ProgressSink,
) -> Result<ImportResult, MefError> {
    let mut archive = MefArchive::open(archive_path)?;
    sink.event(ProgressEvent::message("Updating records..."));

    let records = match mode {
        ImportMode::Record => import_each(catalog, &mut archive, sink)?,
        ImportMode::Records => {
            let count = archive.records().len();
            catalog.upload_records(archive_path)?;
            count
        }
        ImportMode::Mef => {
            let count = archive.records().len();
            catalog.upload_mef(archive_path)?;
            count
        }
    };

    info!(archive = %archive_path.display(), %mode, records, "import finished");
    sink.event(ProgressEvent::message(format!("Updated {records} records")));
    Ok(ImportResult {
        archive: archive_path.display().to_string(),
        mode,
        records,
    })
}

fn import_each(
    catalog: &dyn CatalogApi,
    archive: &mut MefArchive,
    sink: &dyn ProgressSink,
) -> Result<usize, MefError> {
    let mut processed = 0;
    for entry in archive.records() {
        sink.event(ProgressEvent::message(entry.id.clone()));
        let xml = archive.read_metadata(&entry)?;
        catalog.put_record(&xml)?;
        processed += 1;
    }
    Ok(processed)
}
