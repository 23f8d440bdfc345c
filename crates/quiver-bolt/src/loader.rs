//! Cypher-based bulk loading.
//!
//! Node and relationship tables are buffered client-side and projected
//! in one `gds.graph.project.cypher` call on [`finish`]. The staged rows
//! travel as query parameters, so nothing is written to the database
//! outside the projection itself.
//!
//! [`finish`]: quiver_core::BulkLoader::finish

use async_trait::async_trait;
use neo4rs::Graph;
use serde_json::{Value, json};

use quiver_core::{BulkLoader, DataTable, Params, QuiverError, Result};

const NODE_ID: &str = "nodeId";
const LABELS: &str = "labels";
const SOURCE_NODE_ID: &str = "sourceNodeId";
const TARGET_NODE_ID: &str = "targetNodeId";
const RELATIONSHIP_TYPE: &str = "relationshipType";

const PROJECT_ENDPOINT: &str = "gds.graph.project.cypher";

const PROJECT_CALL: &str = "CALL gds.graph.project.cypher($graph_name, $node_query, \
     $relationship_query, {readConcurrency: $read_concurrency, \
     parameters: {nodes: $nodes, relationships: $relationships}, \
     validateRelationships: false}) \
     YIELD graphName, nodeCount, relationshipCount";

/// Buffering loader that projects staged tables via Cypher.
pub struct CypherBulkLoader {
    graph: Graph,
    database: Option<String>,
    graph_name: String,
    read_concurrency: usize,
    nodes: Vec<Value>,
    node_columns: Option<Vec<String>>,
    relationships: Vec<Value>,
    relationship_columns: Option<Vec<String>>,
    finished: bool,
}

impl CypherBulkLoader {
    pub(crate) fn new(
        graph: Graph,
        database: Option<String>,
        graph_name: String,
        read_concurrency: usize,
    ) -> Self {
        Self {
            graph,
            database,
            graph_name,
            read_concurrency,
            nodes: Vec::new(),
            node_columns: None,
            relationships: Vec::new(),
            relationship_columns: None,
            finished: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(QuiverError::ContractViolation(
                "bulk loader is already finished".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BulkLoader for CypherBulkLoader {
    async fn add_nodes(&mut self, nodes: DataTable) -> Result<()> {
        self.ensure_open()?;
        accept_batch(&nodes, &[NODE_ID], &mut self.node_columns)?;
        self.nodes.extend(objects(&nodes));
        Ok(())
    }

    async fn add_relationships(&mut self, relationships: DataTable) -> Result<()> {
        self.ensure_open()?;
        accept_batch(
            &relationships,
            &[SOURCE_NODE_ID, TARGET_NODE_ID],
            &mut self.relationship_columns,
        )?;
        self.relationships.extend(objects(&relationships));
        Ok(())
    }

    async fn finish(&mut self) -> Result<DataTable> {
        self.ensure_open()?;
        // One-shot: a failed projection does not reopen the loader.
        self.finished = true;

        tracing::debug!(
            graph = %self.graph_name,
            nodes = self.nodes.len(),
            relationships = self.relationships.len(),
            "projecting staged graph"
        );

        let mut params = Params::new();
        params.insert("graph_name".into(), json!(self.graph_name));
        params.insert(
            "node_query".into(),
            json!(node_query(self.node_columns.as_deref().unwrap_or(&[]))),
        );
        params.insert(
            "relationship_query".into(),
            json!(relationship_query(
                self.relationship_columns.as_deref().unwrap_or(&[]),
            )),
        );
        params.insert("read_concurrency".into(), json!(self.read_concurrency));
        params.insert(
            "nodes".into(),
            Value::Array(std::mem::take(&mut self.nodes)),
        );
        params.insert(
            "relationships".into(),
            Value::Array(std::mem::take(&mut self.relationships)),
        );

        crate::run_query(
            &self.graph,
            PROJECT_CALL,
            &params,
            self.database.as_deref(),
            Some(PROJECT_ENDPOINT),
        )
        .await
    }

    async fn abort(&mut self) -> Result<()> {
        self.finished = true;
        self.nodes.clear();
        self.relationships.clear();
        Ok(())
    }
}

/// Validates a staged batch and pins the loader's column set to the
/// first batch seen.
fn accept_batch(
    table: &DataTable,
    required: &[&str],
    schema: &mut Option<Vec<String>>,
) -> Result<()> {
    for column in required {
        if !table.columns().iter().any(|c| c == column) {
            return Err(QuiverError::ContractViolation(format!(
                "staged table is missing the `{column}` column"
            )));
        }
    }
    if let Some(column) = table.columns().iter().find(|c| c.contains('`')) {
        return Err(QuiverError::ContractViolation(format!(
            "column name `{column}` cannot be projected"
        )));
    }

    let mut columns: Vec<String> = table.columns().to_vec();
    columns.sort_unstable();
    match schema {
        None => *schema = Some(columns),
        Some(existing) if *existing == columns => {}
        Some(_) => {
            return Err(QuiverError::ContractViolation(
                "staged batches must share one column set".into(),
            ));
        }
    }
    Ok(())
}

/// Rows as JSON objects keyed by column name.
fn objects(table: &DataTable) -> Vec<Value> {
    table
        .rows()
        .iter()
        .map(|row| {
            Value::Object(
                table
                    .columns()
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect(),
            )
        })
        .collect()
}

fn node_query(columns: &[String]) -> String {
    let mut text = String::from("UNWIND $nodes AS node RETURN node.nodeId AS id");
    if columns.iter().any(|c| c == LABELS) {
        text.push_str(", node.labels AS labels");
    }
    for column in columns.iter().filter(|c| *c != NODE_ID && *c != LABELS) {
        text.push_str(&format!(", node.`{column}` AS `{column}`"));
    }
    text
}

fn relationship_query(columns: &[String]) -> String {
    let mut text = String::from(
        "UNWIND $relationships AS relationship \
         RETURN relationship.sourceNodeId AS source, relationship.targetNodeId AS target",
    );
    if columns.iter().any(|c| c == RELATIONSHIP_TYPE) {
        text.push_str(", relationship.relationshipType AS type");
    }
    for column in columns
        .iter()
        .filter(|c| *c != SOURCE_NODE_ID && *c != TARGET_NODE_ID && *c != RELATIONSHIP_TYPE)
    {
        text.push_str(&format!(
            ", relationship.`{column}` AS `{column}`"
        ));
    }
    text
}
