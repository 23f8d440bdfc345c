//! Graph catalog façades.
//!
//! Thin request formatters over the graph catalog: each method
//! assembles a [`ProcedureCall`] and forwards it. Credential injection
//! for remote graphs happens in the runner underneath, not here.

use std::sync::Arc;

use serde_json::{Value, json};

use quiver_core::{DataTable, Params, ProcedureCall, QueryRunner, QuiverError, Result};

use crate::bridge::REMOTE_PROJECTION_ENDPOINT;

/// Catalog operations handle, obtained from
/// [`QuiverClient::graph`](crate::QuiverClient::graph).
pub struct GraphOps {
    runner: Arc<dyn QueryRunner>,
}

impl GraphOps {
    pub(crate) fn new(runner: Arc<dyn QueryRunner>) -> Self {
        Self { runner }
    }

    /// Catalog entries, optionally narrowed to one graph.
    pub async fn list(&self, graph_name: Option<&str>) -> Result<DataTable> {
        let call = match graph_name {
            Some(name) => ProcedureCall::procedure("gds.graph.list")
                .body("$graph_name")
                .param("graph_name", name),
            None => ProcedureCall::procedure("gds.graph.list"),
        };
        self.runner.call(call).await
    }

    /// Whether a graph of this name is in the catalog.
    pub async fn exists(&self, graph_name: &str) -> Result<bool> {
        let table = self
            .runner
            .call(
                ProcedureCall::function("gds.graph.exists")
                    .body("$graph_name")
                    .param("graph_name", graph_name),
            )
            .await?;
        table.value().and_then(Value::as_bool).ok_or_else(|| {
            QuiverError::Protocol("`gds.graph.exists` did not return a boolean".into())
        })
    }

    pub async fn drop(&self, graph_name: &str) -> Result<DataTable> {
        self.runner
            .call(
                ProcedureCall::procedure("gds.graph.drop")
                    .body("$graph_name")
                    .param("graph_name", graph_name),
            )
            .await
    }

    /// Exports a projected graph into a new database.
    pub async fn export(&self, graph_name: &str, config: Params) -> Result<DataTable> {
        self.runner
            .call(
                ProcedureCall::procedure("gds.graph.export")
                    .body("$graph_name, $config")
                    .param("graph_name", graph_name)
                    .param("config", Value::Object(config)),
            )
            .await
    }

    /// Memory estimate for a native projection.
    pub async fn project_estimate(
        &self,
        node_projection: Value,
        relationship_projection: Value,
    ) -> Result<DataTable> {
        self.runner
            .call(
                ProcedureCall::procedure("gds.graph.project.estimate")
                    .body("$node_projection, $relationship_projection")
                    .param("node_projection", node_projection)
                    .param("relationship_projection", relationship_projection),
            )
            .await
    }

    /// Projects a graph from a remote database.
    ///
    /// `token`, `host`, and `config` are placeholders; the bridging
    /// runner fills them after its handshake.
    pub async fn project_remote(&self, graph_name: &str, query: &str) -> Result<DataTable> {
        self.runner
            .call(
                ProcedureCall::procedure(REMOTE_PROJECTION_ENDPOINT)
                    .body("$graph_name, $query, $token, $host, $config")
                    .param("graph_name", graph_name)
                    .param("query", query),
            )
            .await
    }

    /// Writes node properties back to the database.
    ///
    /// Always passes a `config` map, so bridged runners have a place to
    /// put connection details when the graph lives remotely.
    pub async fn write_node_properties(
        &self,
        graph_name: &str,
        properties: &[&str],
        config: Params,
    ) -> Result<DataTable> {
        self.runner
            .call(
                ProcedureCall::procedure("gds.graph.nodeProperties.write")
                    .body("$graph_name, $properties, $config")
                    .param("graph_name", graph_name)
                    .param("properties", json!(properties))
                    .param("config", Value::Object(config)),
            )
            .await
    }
}
