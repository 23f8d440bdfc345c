//! Client facade.

use std::sync::Arc;

use quiver_arrow::ArrowTransport;
use quiver_bolt::{BoltOptions, BoltRunner};
use quiver_core::{
    BulkLoader, ConnectionInfo, DataTable, Params, ProcedureCall, QueryRunner, Result,
};

use crate::bridge::ArrowBridgeRunner;
use crate::graph::GraphOps;
use crate::resolve::resolve_target;

const LIST_PROGRESS_ENDPOINT: &str = "gds.listProgress";

/// Entry point for running graph analytics calls.
///
/// Cheap to clone; clones share one underlying runner.
#[derive(Clone)]
pub struct QuiverClient {
    runner: Arc<dyn QueryRunner>,
}

impl QuiverClient {
    /// Connects over Bolt without Arrow bridging.
    pub async fn connect(engine: ConnectionInfo, options: BoltOptions) -> Result<Self> {
        let runner = BoltRunner::connect(&engine, options).await?;
        Ok(Self::from_runner(runner))
    }

    /// Connects over Bolt and bridges privileged calls through the
    /// Arrow endpoint advertised by `primary`.
    ///
    /// Discovery runs once, here; the resolved target is fixed for the
    /// client's lifetime.
    pub async fn connect_bridged(
        engine: ConnectionInfo,
        options: BoltOptions,
        primary: ConnectionInfo,
    ) -> Result<Self> {
        let target = resolve_target(&primary).await?;
        let transport = ArrowTransport::connect(&target)?;
        let delegate = BoltRunner::connect(&engine, options).await?;
        let bridge = ArrowBridgeRunner::new(
            delegate,
            Box::new(transport),
            primary.credentials,
            target.encrypted,
        );
        Ok(Self::from_runner(bridge))
    }

    /// Wraps an already-constructed runner.
    pub fn from_runner(runner: impl QueryRunner + 'static) -> Self {
        Self {
            runner: Arc::new(runner),
        }
    }

    /// Dispatches one procedure or function call.
    pub async fn call(&self, call: ProcedureCall) -> Result<DataTable> {
        self.runner.call(call).await
    }

    /// Runs a raw Cypher statement.
    pub async fn run_cypher(
        &self,
        query: &str,
        params: Params,
        database: Option<&str>,
    ) -> Result<DataTable> {
        self.runner.run_cypher(query, params, database).await
    }

    /// Progress of running tasks, optionally narrowed to one job.
    pub async fn list_progress(&self, job_id: Option<&str>) -> Result<DataTable> {
        let call = match job_id {
            Some(job_id) => ProcedureCall::procedure(LIST_PROGRESS_ENDPOINT)
                .body("$job_id")
                .param("job_id", job_id),
            None => ProcedureCall::procedure(LIST_PROGRESS_ENDPOINT),
        };
        self.runner.call(call).await
    }

    pub fn set_database(&self, database: &str) {
        self.runner.set_database(database);
    }

    pub fn database(&self) -> Option<String> {
        self.runner.database()
    }

    pub fn set_bookmarks(&self, bookmarks: Vec<String>) {
        self.runner.set_bookmarks(bookmarks);
    }

    pub fn bookmarks(&self) -> Vec<String> {
        self.runner.bookmarks()
    }

    pub fn last_bookmarks(&self) -> Vec<String> {
        self.runner.last_bookmarks()
    }

    /// Graph catalog operations.
    pub fn graph(&self) -> GraphOps {
        GraphOps::new(Arc::clone(&self.runner))
    }

    /// Builds a bulk-load helper writing through this client.
    pub async fn create_bulk_loader(
        &self,
        graph_name: &str,
        concurrency: usize,
        undirected_relationship_types: Vec<String>,
    ) -> Result<Box<dyn BulkLoader>> {
        self.runner
            .create_bulk_loader(graph_name, concurrency, undirected_relationship_types)
            .await
    }

    /// Releases the runner and, for bridged clients, the Arrow
    /// transport. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.runner.close().await
    }
}
