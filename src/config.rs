use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bucket::BUCKET_BATCH_SIZE;
use crate::domain::TRANSFER_BUCKET;
use crate::error::MefError;
use crate::session::Credentials;

pub const DEFAULT_URL: &str = "http://localhost:8080/geonetwork/srv";

/// Optional JSON settings file; every key may be omitted.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Catalog URL up to and including the `/srv` portion.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub bucket_batch_size: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bucket: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub url: String,
    pub credentials: Credentials,
    pub bucket: String,
    pub bucket_batch_size: usize,
    pub timeout: Option<Duration>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>, overrides: Overrides) -> Result<ResolvedConfig, MefError> {
        let config = match path {
            Some(path) => Self::load(PathBuf::from(path))?,
            None => Config::default(),
        };
        Self::resolve_config(config, overrides)
    }

    pub fn load(path: PathBuf) -> Result<Config, MefError> {
        let content = fs::read_to_string(&path).map_err(|_| MefError::ConfigRead(path.clone()))?;
        serde_json::from_str(&content).map_err(|err| MefError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config(config: Config, overrides: Overrides) -> Result<ResolvedConfig, MefError> {
        let defaults = Credentials::default();
        let bucket = overrides
            .bucket
            .or(config.bucket)
            .unwrap_or_else(|| TRANSFER_BUCKET.to_string());
        if !is_bucket_name(&bucket) {
            return Err(MefError::ConfigParse(format!(
                "invalid bucket name: {bucket:?} (use letters, digits, '_', '.' or '-')"
            )));
        }

        Ok(ResolvedConfig {
            url: overrides
                .url
                .or(config.url)
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
            credentials: Credentials {
                username: overrides
                    .username
                    .or(config.username)
                    .unwrap_or(defaults.username),
                password: overrides
                    .password
                    .or(config.password)
                    .unwrap_or(defaults.password),
            },
            bucket,
            bucket_batch_size: config
                .bucket_batch_size
                .filter(|size| *size > 0)
                .unwrap_or(BUCKET_BATCH_SIZE),
            timeout: config.timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Bucket names end up in a URL path segment, so only unreserved characters are allowed.
fn is_bucket_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        && name != "."
        && name != ".."
}
