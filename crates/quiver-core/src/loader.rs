//! Bulk-load helper interface.

use async_trait::async_trait;

use crate::error::Result;
use crate::table::DataTable;

/// Stages node and relationship tables and materializes them as a named
/// graph once finished.
///
/// Obtained from [`crate::QueryRunner::create_bulk_loader`]; the loader
/// writes through the runner that created it.
#[async_trait]
pub trait BulkLoader: Send {
    /// Buffers a table of nodes. Expected columns: `nodeId`, optionally
    /// `labels`, plus arbitrary property columns.
    async fn add_nodes(&mut self, nodes: DataTable) -> Result<()>;

    /// Buffers a table of relationships. Expected columns:
    /// `sourceNodeId` and `targetNodeId`, optionally `relationshipType`,
    /// plus arbitrary property columns.
    async fn add_relationships(&mut self, relationships: DataTable) -> Result<()>;

    /// Flushes outstanding batches and projects the staged data into the
    /// graph catalog under the loader's graph name.
    async fn finish(&mut self) -> Result<DataTable>;

    /// Removes staged data without projecting.
    async fn abort(&mut self) -> Result<()>;
}
