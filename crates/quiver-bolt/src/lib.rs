//! Bolt protocol adapter.
//!
//! [`BoltRunner`] executes procedure calls and Cypher statements over a
//! pooled Bolt connection (neo4rs) and exposes them through the
//! [`QueryRunner`] seam. Database selection and bookmarks are tracked
//! client-side; the driver does not surface server bookmarks.

mod encode;
mod loader;

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, query};
use parking_lot::Mutex;
use serde_json::Value;

use quiver_core::{
    BulkLoader, ConnectionInfo, DataTable, Params, ProcedureCall, QueryRunner, QuiverError, Result,
};

pub use loader::CypherBulkLoader;

/// Connection options for [`BoltRunner::connect`].
#[derive(Debug, Clone)]
pub struct BoltOptions {
    /// Database selected for calls that do not name one.
    pub database: Option<String>,
    /// Rows fetched per pull message.
    pub fetch_size: usize,
    /// Connection pool size.
    pub max_connections: usize,
}

impl Default for BoltOptions {
    fn default() -> Self {
        Self {
            database: None,
            fetch_size: 1000,
            max_connections: 16,
        }
    }
}

impl BoltOptions {
    /// Options for a short-lived, single-query probe connection.
    pub fn probe() -> Self {
        Self {
            max_connections: 1,
            ..Self::default()
        }
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

#[derive(Debug, Default)]
struct RunnerState {
    database: Option<String>,
    bookmarks: Vec<String>,
    last_bookmarks: Vec<String>,
}

/// Query runner backed by a pooled Bolt connection.
pub struct BoltRunner {
    // `None` once closed; the pool tears down when the last clone drops.
    graph: Mutex<Option<Graph>>,
    state: Mutex<RunnerState>,
}

impl BoltRunner {
    /// Connects to the given Bolt endpoint.
    pub async fn connect(info: &ConnectionInfo, options: BoltOptions) -> Result<Self> {
        let mut builder = ConfigBuilder::default()
            .uri(&info.uri)
            .user(&info.credentials.username)
            .password(&info.credentials.password)
            .fetch_size(options.fetch_size)
            .max_connections(options.max_connections);
        if let Some(database) = &options.database {
            builder = builder.db(database.as_str());
        }
        let config = builder
            .build()
            .map_err(|e| QuiverError::Driver(e.to_string()))?;
        let graph = Graph::connect(config)
            .await
            .map_err(|e| QuiverError::Driver(e.to_string()))?;

        tracing::debug!(uri = %info.uri, "bolt runner connected");
        Ok(Self {
            graph: Mutex::new(Some(graph)),
            state: Mutex::new(RunnerState {
                database: options.database,
                ..RunnerState::default()
            }),
        })
    }

    fn graph(&self) -> Result<Graph> {
        self.graph
            .lock()
            .clone()
            .ok_or_else(|| QuiverError::Driver("runner is closed".into()))
    }

    /// Runs `text` with `params` against `database` (or the selected one)
    /// and collects the result rows.
    async fn execute(
        &self,
        text: &str,
        params: &Params,
        database: Option<&str>,
        context: Option<&str>,
    ) -> Result<DataTable> {
        let graph = self.graph()?;
        let database = database
            .map(ToOwned::to_owned)
            .or_else(|| self.state.lock().database.clone());
        let table = run_query(&graph, text, params, database.as_deref(), context).await?;

        // The driver does not expose server bookmarks; record the ones
        // in effect for the transaction that just completed.
        let mut state = self.state.lock();
        state.last_bookmarks = state.bookmarks.clone();
        Ok(table)
    }
}

/// Runs a single statement and collects the full result.
pub(crate) async fn run_query(
    graph: &Graph,
    text: &str,
    params: &Params,
    database: Option<&str>,
    context: Option<&str>,
) -> Result<DataTable> {
    let mut q = query(text);
    for (key, value) in params {
        q = q.param(key, encode::json_to_bolt(value));
    }

    let result = match database {
        Some(db) => graph.execute_on(db, q).await,
        None => graph.execute(q).await,
    };
    let mut stream = result.map_err(|e| driver_error(e, context))?;

    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::new();
    loop {
        let row = match stream.next().await {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => return Err(driver_error(e, context)),
        };
        let object: serde_json::Map<String, Value> = row
            .to()
            .map_err(|e| QuiverError::Protocol(format!("result row not convertible: {e}")))?;
        if columns.is_empty() {
            columns = object.keys().cloned().collect();
        }
        rows.push(
            columns
                .iter()
                .map(|column| object.get(column).cloned().unwrap_or(Value::Null))
                .collect(),
        );
    }
    Ok(DataTable::new(columns, rows))
}

fn driver_error(error: neo4rs::Error, context: Option<&str>) -> QuiverError {
    match context {
        Some(endpoint) => QuiverError::Driver(format!("error running `{endpoint}`: {error}")),
        None => QuiverError::Driver(error.to_string()),
    }
}

#[async_trait]
impl QueryRunner for BoltRunner {
    async fn call(&self, call: ProcedureCall) -> Result<DataTable> {
        let text = encode::render(&call);
        tracing::debug!(endpoint = %call.endpoint, "dispatching call");
        let context = call.custom_error.then_some(call.endpoint.as_str());
        self.execute(&text, &call.params, call.database.as_deref(), context)
            .await
    }

    async fn run_cypher(
        &self,
        query: &str,
        params: Params,
        database: Option<&str>,
    ) -> Result<DataTable> {
        self.execute(query, &params, database, None).await
    }

    fn set_database(&self, database: &str) {
        self.state.lock().database = Some(database.to_string());
    }

    fn database(&self) -> Option<String> {
        self.state.lock().database.clone()
    }

    fn set_bookmarks(&self, bookmarks: Vec<String>) {
        self.state.lock().bookmarks = bookmarks;
    }

    fn bookmarks(&self) -> Vec<String> {
        self.state.lock().bookmarks.clone()
    }

    fn last_bookmarks(&self) -> Vec<String> {
        self.state.lock().last_bookmarks.clone()
    }

    async fn create_bulk_loader(
        &self,
        graph_name: &str,
        concurrency: usize,
        undirected_relationship_types: Vec<String>,
    ) -> Result<Box<dyn BulkLoader>> {
        if !undirected_relationship_types.is_empty() {
            return Err(QuiverError::Unsupported(
                "undirected relationship types are not supported by the Cypher loader".into(),
            ));
        }
        let graph = self.graph()?;
        let database = self.state.lock().database.clone();
        Ok(Box::new(CypherBulkLoader::new(
            graph,
            database,
            graph_name.to_string(),
            concurrency,
        )))
    }

    async fn close(&self) -> Result<()> {
        self.graph.lock().take();
        Ok(())
    }
}
