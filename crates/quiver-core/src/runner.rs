//! The query-runner seam.
//!
//! Every transport adapter and every decorating layer implements
//! [`QueryRunner`]; callers and façades only ever hold the trait. This is
//! deliberately one narrow interface rather than per-method forwarding
//! types, so that decorators compose uniformly.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::loader::BulkLoader;
use crate::table::DataTable;

/// Parameter map attached to a call.
pub type Params = Map<String, Value>;

/// Whether an endpoint is invoked as `CALL …` or evaluated as `RETURN …`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Procedure,
    Function,
}

/// One procedure or function invocation.
///
/// Assembled by the request-formatting façades; decorating runners may
/// rewrite `params` before forwarding, nothing else.
#[derive(Debug, Clone)]
pub struct ProcedureCall {
    pub kind: CallKind,
    pub endpoint: String,
    /// Columns for the `YIELD` clause; empty means yield everything.
    pub yields: Vec<String>,
    /// Argument template placed between the parentheses, e.g.
    /// `"$graph_name, $config"`. `None` renders an empty argument list.
    pub body: Option<String>,
    pub params: Params,
    /// Overrides the runner's selected database for this call.
    pub database: Option<String>,
    /// When `false`, driver failures are surfaced without endpoint
    /// context. Used by probes that interpret errors themselves.
    pub custom_error: bool,
}

impl ProcedureCall {
    pub fn procedure(endpoint: impl Into<String>) -> Self {
        Self {
            kind: CallKind::Procedure,
            endpoint: endpoint.into(),
            yields: Vec::new(),
            body: None,
            params: Params::new(),
            database: None,
            custom_error: true,
        }
    }

    pub fn function(endpoint: impl Into<String>) -> Self {
        Self {
            kind: CallKind::Function,
            ..Self::procedure(endpoint)
        }
    }

    pub fn yields<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.yields = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn body(mut self, template: impl Into<String>) -> Self {
        self.body = Some(template.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Surface raw driver errors instead of endpoint-annotated ones.
    pub fn raw_error(mut self) -> Self {
        self.custom_error = false;
        self
    }
}

/// Narrow delegate interface for dispatching calls to a graph database.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Executes a procedure or function call and collects the result.
    async fn call(&self, call: ProcedureCall) -> Result<DataTable>;

    /// Runs a raw Cypher statement.
    async fn run_cypher(
        &self,
        query: &str,
        params: Params,
        database: Option<&str>,
    ) -> Result<DataTable>;

    /// Selects the database used when a call does not name one.
    fn set_database(&self, database: &str);

    /// The currently selected database, if any.
    fn database(&self) -> Option<String>;

    /// Bookmarks to chain the next transaction after.
    fn set_bookmarks(&self, bookmarks: Vec<String>);

    fn bookmarks(&self) -> Vec<String>;

    /// Bookmarks observed after the most recent transaction.
    fn last_bookmarks(&self) -> Vec<String>;

    /// Builds a bulk-load helper that stages data through this runner.
    async fn create_bulk_loader(
        &self,
        graph_name: &str,
        concurrency: usize,
        undirected_relationship_types: Vec<String>,
    ) -> Result<Box<dyn BulkLoader>>;

    /// Releases the underlying resources. Idempotent.
    async fn close(&self) -> Result<()>;
}
