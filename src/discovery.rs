use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::CatalogApi;
use crate::domain::{MAGIC_BUCKET, Query, RecordId};
use crate::error::MefError;

/// Resolves a query into the identifiers of the matching records.
pub trait DiscoveryStrategy {
    fn name(&self) -> &'static str;

    /// Identifiers in discovery order, truncated to `limit` when it is non-zero.
    fn discover(
        &self,
        catalog: &dyn CatalogApi,
        query: &Query,
        limit: usize,
    ) -> Result<Vec<RecordId>, MefError>;
}

/// Seeds the session's last query, then lets the server fill the magic bucket from it.
///
/// Relies on the server treating an id-less PUT on the magic bucket as "add every hit of the
/// last query", which is not part of the documented API.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicBucket;

impl DiscoveryStrategy for MagicBucket {
    fn name(&self) -> &'static str {
        "magic-bucket"
    }

    fn discover(
        &self,
        catalog: &dyn CatalogApi,
        query: &Query,
        limit: usize,
    ) -> Result<Vec<RecordId>, MefError> {
        catalog.search(&query.to_params(None))?;
        catalog.add_to_selection(MAGIC_BUCKET, &[])?;
        let mut ids = catalog.selection(MAGIC_BUCKET)?;
        truncate(&mut ids, limit);
        Ok(ids)
    }
}

/// Walks the result pages with an increasing `from` offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct Paginated;

impl DiscoveryStrategy for Paginated {
    fn name(&self) -> &'static str {
        "paginated"
    }

    fn discover(
        &self,
        catalog: &dyn CatalogApi,
        query: &Query,
        limit: usize,
    ) -> Result<Vec<RecordId>, MefError> {
        let mut ids = Vec::new();
        let mut to = 0usize;
        loop {
            let from = to + 1;
            let page = catalog.search(&query.to_params(Some(from)))?;
            let new_ids = page_record_ids(&page);
            debug!(from, count = new_ids.len(), "query page");
            if new_ids.is_empty() {
                break;
            }
            ids.extend(new_ids);
            if limit > 0 && ids.len() >= limit {
                break;
            }

            let next_to = page_to(&page)?;
            if next_to < from {
                warn!(from, to = next_to, "query offset did not advance, stopping");
                break;
            }
            to = next_to;
        }
        truncate(&mut ids, limit);
        Ok(ids)
    }
}

pub fn strategy_for(magic: bool) -> Box<dyn DiscoveryStrategy> {
    if magic {
        Box::new(MagicBucket)
    } else {
        Box::new(Paginated)
    }
}

pub fn discover(
    catalog: &dyn CatalogApi,
    query: &Query,
    limit: usize,
    strategy: &dyn DiscoveryStrategy,
) -> Result<Vec<RecordId>, MefError> {
    debug!(strategy = strategy.name(), limit, "discovering records");
    strategy.discover(catalog, query, limit)
}

fn truncate(ids: &mut Vec<RecordId>, limit: usize) {
    if limit > 0 && ids.len() >= limit {
        ids.truncate(limit);
    }
}

/// The `@to` offset of a result page, given either as a number or a numeric string.
pub fn page_to(page: &Value) -> Result<usize, MefError> {
    let value = page
        .get("@to")
        .ok_or_else(|| MefError::MalformedResponse("query page without @to".to_string()))?;
    let parsed = match value {
        Value::Number(number) => number.as_u64().map(|n| n as usize),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| MefError::MalformedResponse(format!("invalid @to value: {value}")))
}

/// Record entries of a page's `metadata` field.
///
/// The server sometimes wraps an entry in a one-element list and returns a bare object when a
/// page holds a single record; both are flattened here.
pub fn page_records(page: &Value) -> Vec<&Value> {
    match page.get("metadata") {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| match entry {
                Value::Array(wrapped) => wrapped.first(),
                other => Some(other),
            })
            .collect(),
        Some(entry @ Value::Object(_)) => vec![entry],
        _ => Vec::new(),
    }
}

pub fn page_record_ids(page: &Value) -> Vec<RecordId> {
    page_records(page)
        .into_iter()
        .filter_map(|record| {
            let uuid = record
                .get("uuid")
                .or_else(|| record.get("geonet:info").and_then(|info| info.get("uuid")))
                .and_then(Value::as_str);
            match uuid.map(str::parse::<RecordId>) {
                Some(Ok(id)) => Some(id),
                _ => {
                    warn!("skipping query entry without a usable uuid");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wrapped_entry_yields_same_id() {
        let plain = json!({"@to": "2", "metadata": [{"uuid": "a"}, {"uuid": "b"}]});
        let wrapped = json!({"@to": "2", "metadata": [[{"uuid": "a"}], {"uuid": "b"}]});
        assert_eq!(page_record_ids(&plain), page_record_ids(&wrapped));
    }

    #[test]
    fn single_object_page() {
        let page = json!({"@to": 1, "metadata": {"geonet:info": {"uuid": "only"}}});
        let ids = page_record_ids(&page);
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].as_str(), "only");
    }

    #[test]
    fn to_accepts_numbers_and_strings() {
        assert_eq!(page_to(&json!({"@to": 20})).unwrap(), 20);
        assert_eq!(page_to(&json!({"@to": "40"})).unwrap(), 40);
        assert!(page_to(&json!({})).is_err());
        assert!(page_to(&json!({"@to": "x"})).is_err());
    }

    #[test]
    fn missing_metadata_is_empty() {
        assert!(page_record_ids(&json!({"@from": "1", "@to": "0"})).is_empty());
    }
}
