use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MefError {
    #[error("invalid record identifier: {0:?}")]
    InvalidRecordId(String),

    #[error("invalid query parameter (expected key=value): {0}")]
    InvalidQuery(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status} for {url}\n---\n{message}")]
    #[diagnostic(help("check the catalog URL and that the account may edit records"))]
    CatalogStatus {
        status: u16,
        url: String,
        message: String,
    },

    #[error("unexpected catalog response: {0}")]
    MalformedResponse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("archive error: {0}")]
    Archive(String),
}

impl MefError {
    pub fn is_catalog_failure(&self) -> bool {
        matches!(
            self,
            MefError::CatalogHttp(_) | MefError::CatalogStatus { .. }
        )
    }
}
