use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MefError;

/// Reserved bucket the server fills from the session's last query on an empty PUT.
pub const MAGIC_BUCKET: &str = "metadata";

/// Bucket that carries the records of one export batch.
pub const TRANSFER_BUCKET: &str = "mef";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = MefError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.chars().any(|ch| ch.is_control()) {
            return Err(MefError::InvalidRecordId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Simple,
    Partial,
    Full,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Simple => "simple",
            ExportFormat::Partial => "partial",
            ExportFormat::Full => "full",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// One PUT per record directory found in the archive.
    #[default]
    Record,
    /// The whole archive as a multipart upload to the bulk records endpoint.
    Records,
    /// The whole archive as a multipart upload to the MEF import endpoint.
    Mef,
}

impl ImportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportMode::Record => "record",
            ImportMode::Records => "records",
            ImportMode::Mef => "mef",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters sent to the catalog's `q` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<String, String>,
}

impl Default for Query {
    fn default() -> Self {
        let params = [
            ("_content_type", "json"),
            ("sortBy", "changeDate"),
            // shortest result shape that still carries the uuid
            ("resultType", "results"),
            ("buildSummary", "false"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
        Self { params }
    }
}

impl Query {
    /// Builds a query from `key=value,key=value` overrides; user keys win over the fixed ones.
    pub fn with_overrides(overrides: Option<&str>) -> Result<Self, MefError> {
        let mut query = Self::default();
        let Some(overrides) = overrides else {
            return Ok(query);
        };
        for piece in overrides.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let (key, value) = piece
                .split_once('=')
                .ok_or_else(|| MefError::InvalidQuery(piece.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(MefError::InvalidQuery(piece.to_string()));
            }
            query.params.insert(key.to_string(), value.trim().to_string());
        }
        Ok(query)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn to_params(&self, from: Option<usize>) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .params
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if let Some(from) = from {
            params.retain(|(key, _)| key != "from");
            params.push(("from".to_string(), from.to_string()));
        }
        params
    }
}

/// Splits identifiers into order-preserving batches. A size of zero yields a single batch.
pub fn partition(ids: &[RecordId], batch_size: usize) -> Vec<&[RecordId]> {
    if ids.is_empty() {
        return Vec::new();
    }
    if batch_size == 0 {
        return vec![ids];
    }
    ids.chunks(batch_size).collect()
}

/// `export-<format>-<timestamp>-<part>.zip`, part being `all` for a single batch.
pub fn archive_file_name(format: ExportFormat, timestamp: i64, index: usize, total: usize) -> String {
    let part = if total == 1 {
        "all".to_string()
    } else {
        format!("{index:02}")
    };
    format!("export-{format}-{timestamp}-{part}.zip")
}
