#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Value, json};
use zip::write::SimpleFileOptions;

use catalog_mef::app::{ProgressEvent, ProgressSink};
use catalog_mef::catalog::CatalogApi;
use catalog_mef::domain::{ExportFormat, MAGIC_BUCKET, RecordId};
use catalog_mef::error::MefError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Search { from: Option<usize> },
    AddToSelection { bucket: String, ids: Vec<String> },
    Selection { bucket: String },
    DeleteSelection { bucket: String },
    ExportMef { bucket: String, ids: Vec<String> },
    PutRecord,
    UploadRecords(PathBuf),
    UploadMef(PathBuf),
}

#[derive(Default)]
struct State {
    last_query_seen: bool,
    buckets: HashMap<String, Vec<RecordId>>,
    calls: Vec<Call>,
    imported: Vec<String>,
    exports: usize,
}

/// In-memory catalog whose query matches `records`, served `page_size` at a time.
pub struct MockCatalog {
    records: Vec<String>,
    page_size: usize,
    /// Wraps every other page entry in a one-element list.
    wrap_entries: bool,
    /// Serves one-record pages as a bare object.
    bare_single: bool,
    fail_search: bool,
    fail_export_at: Option<usize>,
    fail_record_at: Option<usize>,
    state: Mutex<State>,
}

impl MockCatalog {
    pub fn new(records: &[&str]) -> Self {
        Self {
            records: records.iter().map(|id| id.to_string()).collect(),
            page_size: 2,
            wrap_entries: false,
            bare_single: false,
            fail_search: false,
            fail_export_at: None,
            fail_record_at: None,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn wrapping_entries(mut self) -> Self {
        self.wrap_entries = true;
        self
    }

    pub fn bare_single_pages(mut self) -> Self {
        self.bare_single = true;
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    /// The n-th archive download (1-based) answers 500.
    pub fn failing_export_at(mut self, n: usize) -> Self {
        self.fail_export_at = Some(n);
        self
    }

    /// The n-th record PUT (1-based) answers 400.
    pub fn failing_record_at(mut self, n: usize) -> Self {
        self.fail_record_at = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn imported(&self) -> Vec<String> {
        self.state.lock().unwrap().imported.clone()
    }

    pub fn bucket_len(&self, bucket: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn put_sizes(&self, bucket: &str) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::AddToSelection { bucket: name, ids } if name == bucket => Some(ids.len()),
                _ => None,
            })
            .collect()
    }

    pub fn exported_batches(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::ExportMef { ids, .. } => Some(ids),
                _ => None,
            })
            .collect()
    }

    pub fn deletes(&self, bucket: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::DeleteSelection { bucket: name } if name == bucket))
            .count()
    }

    fn status(status: u16, path: &str, body: &str) -> MefError {
        MefError::CatalogStatus {
            status,
            url: format!("http://mock/api/{path}"),
            message: catalog_mef::diagnostics::describe_failure(body),
        }
    }

    fn page(&self, from: usize) -> Value {
        let start = from.saturating_sub(1).min(self.records.len());
        let end = (start + self.page_size).min(self.records.len());
        let entries = self.records[start..end]
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let entry = json!({"uuid": id, "title": format!("Record {id}")});
                if self.wrap_entries && i % 2 == 0 {
                    json!([entry])
                } else {
                    entry
                }
            })
            .collect::<Vec<_>>();
        if entries.is_empty() {
            return json!({"@from": from.to_string(), "@to": "0"});
        }
        let to = (start + entries.len()).to_string();
        if self.bare_single && entries.len() == 1 && !entries[0].is_array() {
            return json!({"@from": from.to_string(), "@to": to, "metadata": entries[0]});
        }
        json!({"@from": from.to_string(), "@to": to, "metadata": entries})
    }
}

impl CatalogApi for MockCatalog {
    fn search(&self, params: &[(String, String)]) -> Result<Value, MefError> {
        let from = params
            .iter()
            .find(|(key, _)| key == "from")
            .and_then(|(_, value)| value.parse().ok());
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Search { from });
        if self.fail_search {
            return Err(Self::status(
                500,
                "q",
                "<html><body><h1>Internal error</h1></body></html>",
            ));
        }
        state.last_query_seen = true;
        Ok(self.page(from.unwrap_or(1)))
    }

    fn add_to_selection(&self, bucket: &str, ids: &[RecordId]) -> Result<(), MefError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AddToSelection {
            bucket: bucket.to_string(),
            ids: ids.iter().map(|id| id.to_string()).collect(),
        });
        let added = if ids.is_empty() && bucket == MAGIC_BUCKET && state.last_query_seen {
            self.records
                .iter()
                .map(|id| id.parse().unwrap())
                .collect::<Vec<RecordId>>()
        } else {
            ids.to_vec()
        };
        let selection = state.buckets.entry(bucket.to_string()).or_default();
        for id in added {
            if !selection.contains(&id) {
                selection.push(id);
            }
        }
        Ok(())
    }

    fn selection(&self, bucket: &str) -> Result<Vec<RecordId>, MefError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Selection {
            bucket: bucket.to_string(),
        });
        Ok(state.buckets.get(bucket).cloned().unwrap_or_default())
    }

    fn delete_selection(&self, bucket: &str) -> Result<(), MefError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteSelection {
            bucket: bucket.to_string(),
        });
        state.buckets.remove(bucket);
        Ok(())
    }

    fn export_mef(
        &self,
        bucket: &str,
        format: ExportFormat,
        destination: &Path,
    ) -> Result<u64, MefError> {
        let mut state = self.state.lock().unwrap();
        let ids = state
            .buckets
            .get(bucket)
            .map(|ids| ids.iter().map(|id| id.to_string()).collect::<Vec<_>>())
            .unwrap_or_default();
        state.calls.push(Call::ExportMef {
            bucket: bucket.to_string(),
            ids: ids.clone(),
        });
        state.exports += 1;
        if self.fail_export_at == Some(state.exports) {
            return Err(Self::status(
                500,
                "mef.export",
                r#"{"message":"NullPointerException"}"#,
            ));
        }
        let payload = format!("{format}\n{}\n", ids.join("\n"));
        std::fs::write(destination, &payload)
            .map_err(|err| MefError::Filesystem(err.to_string()))?;
        Ok(payload.len() as u64)
    }

    fn put_record(&self, xml: &str) -> Result<(), MefError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::PutRecord);
        if self.fail_record_at == Some(state.imported.len() + 1) {
            return Err(Self::status(400, "records", "Content is not allowed in prolog."));
        }
        state.imported.push(xml.to_string());
        Ok(())
    }

    fn upload_records(&self, archive: &Path) -> Result<(), MefError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UploadRecords(archive.to_path_buf()));
        Ok(())
    }

    fn upload_mef(&self, archive: &Path) -> Result<(), MefError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UploadMef(archive.to_path_buf()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

pub fn ids(values: &[&str]) -> Vec<RecordId> {
    values.iter().map(|value| value.parse().unwrap()).collect()
}

/// Writes a zip with the given entries; a `None` body adds a directory entry.
pub fn write_archive(path: &Path, entries: &[(&str, Option<&str>)]) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, body) in entries {
        match body {
            Some(body) => {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(body.as_bytes()).unwrap();
            }
            None => {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            }
        }
    }
    writer.finish().unwrap();
}
