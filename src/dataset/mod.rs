//! Dataset source: where comparison tables come from.
//!
//! The coordinator only sees the [`DatasetSource`] trait; the concrete
//! implementation talks HTTP to a comparison ("simcomp") service.

pub mod simcomp;

use async_trait::async_trait;

use crate::core::ComparisonTable;
use crate::error::AgentError;

pub use simcomp::SimCompClient;

/// Capability to fetch a comparison table by id.
///
/// Implementations handle the transport; the coordinator treats the source
/// as opaque and maps every failure (and every empty result) to
/// [`AgentError::DatasetUnavailable`].
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetches the comparison table for `comparison_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::DatasetUnavailable`] when the source errors or
    /// the payload cannot be turned into a table.
    async fn fetch(&self, comparison_id: &str) -> Result<ComparisonTable, AgentError>;
}
