use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::MefError;

pub const METADATA_FILE: &str = "metadata/metadata.xml";

/// One record directory of a MEF archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    /// Directory name, which is the record identifier.
    pub id: String,
    pub metadata_path: String,
}

/// A MEF archive opened read-only: one top-level directory per record.
pub struct MefArchive {
    path: PathBuf,
    archive: ZipArchive<File>,
}

impl MefArchive {
    pub fn open(path: &Path) -> Result<Self, MefError> {
        let file = File::open(path)
            .map_err(|err| MefError::Filesystem(format!("open archive {}: {err}", path.display())))?;
        let archive = ZipArchive::new(file)
            .map_err(|err| MefError::Archive(format!("{}: {err}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Top-level directories holding `metadata/metadata.xml`, in archive order.
    /// Directories without it are left out.
    pub fn records(&self) -> Vec<RecordEntry> {
        let names = self.archive.file_names().collect::<Vec<_>>();
        let present = names.iter().copied().collect::<HashSet<_>>();

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for name in names {
            let Some((dir, _)) = name.split_once('/') else {
                continue;
            };
            if dir.is_empty() || !seen.insert(dir) {
                continue;
            }
            let metadata_path = format!("{dir}/{METADATA_FILE}");
            if present.contains(metadata_path.as_str()) {
                records.push(RecordEntry {
                    id: dir.to_string(),
                    metadata_path,
                });
            } else {
                debug!(entry = dir, "no {METADATA_FILE}, skipping");
            }
        }
        records
    }

    pub fn read_metadata(&mut self, entry: &RecordEntry) -> Result<String, MefError> {
        let mut file = self
            .archive
            .by_name(&entry.metadata_path)
            .map_err(|err| MefError::Archive(format!("{}: {err}", entry.metadata_path)))?;
        let mut text = String::new();
        file.read_to_string(&mut text)
            .map_err(|err| MefError::Archive(format!("{}: {err}", entry.metadata_path)))?;
        Ok(text)
    }
}
