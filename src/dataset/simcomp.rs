//! HTTP client for the comparison ("simcomp") service.
//!
//! Fetches a comparison payload and reshapes it into a [`ComparisonTable`]:
//! rows = predicates (properties), columns = contributions.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::DatasetSource;
use crate::core::{CellValue, ComparisonTable};
use crate::error::AgentError;

/// Request timeout for comparison fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A labeled entity in the comparison payload (contribution or predicate).
#[derive(Debug, Deserialize)]
struct LabeledEntity {
    id: String,
    label: String,
}

/// One cell value as delivered by the service.
#[derive(Debug, Deserialize)]
struct CellPayload {
    #[serde(default)]
    label: Option<String>,
}

/// Wire format of a comparison.
///
/// `data` maps a predicate id to one entry per contribution, each entry
/// holding the cell's values (possibly empty).
#[derive(Debug, Deserialize)]
struct ComparisonPayload {
    contributions: Vec<LabeledEntity>,
    predicates: Vec<LabeledEntity>,
    data: std::collections::HashMap<String, Vec<Vec<CellPayload>>>,
}

/// HTTP-backed [`DatasetSource`].
pub struct SimCompClient {
    http: reqwest::Client,
    base_url: String,
}

impl SimCompClient {
    /// Creates a client for the given service base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DatasetUnavailable`] if the HTTP client cannot
    /// be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AgentError::DatasetUnavailable {
                reason: format!("HTTP client construction failed: {e}"),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Reshapes a wire payload into a table.
    fn into_table(payload: ComparisonPayload) -> Result<ComparisonTable, AgentError> {
        let contributions: Vec<String> =
            payload.contributions.iter().map(|c| c.label.clone()).collect();
        let n_cols = contributions.len();

        let mut properties = Vec::with_capacity(payload.predicates.len());
        let mut cells = Vec::with_capacity(payload.predicates.len());

        for predicate in &payload.predicates {
            let row_cells = payload.data.get(&predicate.id);
            let mut row = Vec::with_capacity(n_cols);
            for col in 0..n_cols {
                let values = row_cells
                    .and_then(|r| r.get(col))
                    .map(|cell| {
                        cell.iter()
                            .filter_map(|v| v.label.as_deref())
                            .filter(|label| !label.trim().is_empty())
                            .map(CellValue::parse)
                            .collect()
                    })
                    .unwrap_or_default();
                row.push(values);
            }
            properties.push(predicate.label.clone());
            cells.push(row);
        }

        ComparisonTable::new(properties, contributions, cells)
    }
}

#[async_trait]
impl DatasetSource for SimCompClient {
    async fn fetch(&self, comparison_id: &str) -> Result<ComparisonTable, AgentError> {
        let url = format!("{}/comparison/{comparison_id}", self.base_url);
        debug!(%url, "fetching comparison");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AgentError::DatasetUnavailable {
                reason: format!("fetch failed: {e}"),
            })?
            .error_for_status()
            .map_err(|e| AgentError::DatasetUnavailable {
                reason: format!("comparison service returned an error: {e}"),
            })?;

        let payload: ComparisonPayload =
            response
                .json()
                .await
                .map_err(|e| AgentError::DatasetUnavailable {
                    reason: format!("malformed comparison payload: {e}"),
                })?;

        Self::into_table(payload)
    }
}

impl std::fmt::Debug for SimCompClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimCompClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
