//! Dispatcher tests over scripted test doubles.
//!
//! `CollectingRunner` records every call it is forwarded and answers
//! from a scripted queue; `MockAuthenticator` hands out one `AuthPair`
//! per handshake. No real Bolt or Flight connection is involved.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use quiver::{
    ArrowAuthenticator, ArrowBridgeRunner, AuthPair, BulkLoader, Credentials, DataTable, Params,
    ProcedureCall, QueryRunner, QuiverError, Result,
};

#[derive(Default)]
struct RunnerInner {
    calls: Mutex<Vec<ProcedureCall>>,
    results: Mutex<VecDeque<Result<DataTable>>>,
    cyphers: Mutex<Vec<String>>,
    database: Mutex<Option<String>>,
    bookmarks: Mutex<Vec<String>>,
    loader_requests: Mutex<Vec<(String, usize, Vec<String>)>>,
    closed: Mutex<bool>,
    fail_close: Mutex<bool>,
}

/// Scripted delegate; clones share state so tests can inspect what the
/// bridge forwarded.
#[derive(Clone, Default)]
struct CollectingRunner(Arc<RunnerInner>);

impl CollectingRunner {
    fn script(&self, table: DataTable) {
        self.0.results.lock().push_back(Ok(table));
    }

    fn script_error(&self, error: QuiverError) {
        self.0.results.lock().push_back(Err(error));
    }

    fn fail_close(&self) {
        *self.0.fail_close.lock() = true;
    }

    fn calls(&self) -> Vec<ProcedureCall> {
        self.0.calls.lock().clone()
    }

    fn closed(&self) -> bool {
        *self.0.closed.lock()
    }
}

#[async_trait]
impl QueryRunner for CollectingRunner {
    async fn call(&self, call: ProcedureCall) -> Result<DataTable> {
        self.0.calls.lock().push(call);
        self.0
            .results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(DataTable::empty()))
    }

    async fn run_cypher(
        &self,
        query: &str,
        _params: Params,
        _database: Option<&str>,
    ) -> Result<DataTable> {
        self.0.cyphers.lock().push(query.to_string());
        Ok(DataTable::empty())
    }

    fn set_database(&self, database: &str) {
        *self.0.database.lock() = Some(database.to_string());
    }

    fn database(&self) -> Option<String> {
        self.0.database.lock().clone()
    }

    fn set_bookmarks(&self, bookmarks: Vec<String>) {
        *self.0.bookmarks.lock() = bookmarks;
    }

    fn bookmarks(&self) -> Vec<String> {
        self.0.bookmarks.lock().clone()
    }

    fn last_bookmarks(&self) -> Vec<String> {
        self.0.bookmarks.lock().clone()
    }

    async fn create_bulk_loader(
        &self,
        graph_name: &str,
        concurrency: usize,
        undirected_relationship_types: Vec<String>,
    ) -> Result<Box<dyn BulkLoader>> {
        self.0.loader_requests.lock().push((
            graph_name.to_string(),
            concurrency,
            undirected_relationship_types,
        ));
        Err(QuiverError::Unsupported(
            "no loader in this test double".into(),
        ))
    }

    async fn close(&self) -> Result<()> {
        *self.0.closed.lock() = true;
        if *self.0.fail_close.lock() {
            Err(QuiverError::Driver("delegate close failed".into()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct AuthInner {
    pairs: Mutex<VecDeque<AuthPair>>,
    handshakes: Mutex<usize>,
    seen: Mutex<Vec<(String, String)>>,
    reject: Mutex<bool>,
    closed: Mutex<bool>,
    fail_close: Mutex<bool>,
}

/// Scripted handshake endpoint.
#[derive(Clone, Default)]
struct MockAuthenticator(Arc<AuthInner>);

impl MockAuthenticator {
    fn push_pair(&self, token: &str, address: &str) {
        self.0.pairs.lock().push_back(AuthPair::new(token, address));
    }

    fn reject(&self) {
        *self.0.reject.lock() = true;
    }

    fn fail_close(&self) {
        *self.0.fail_close.lock() = true;
    }

    fn handshakes(&self) -> usize {
        *self.0.handshakes.lock()
    }

    fn seen(&self) -> Vec<(String, String)> {
        self.0.seen.lock().clone()
    }

    fn closed(&self) -> bool {
        *self.0.closed.lock()
    }
}

#[async_trait]
impl ArrowAuthenticator for MockAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<AuthPair> {
        *self.0.handshakes.lock() += 1;
        self.0
            .seen
            .lock()
            .push((username.to_string(), password.to_string()));
        if *self.0.reject.lock() {
            return Err(QuiverError::AuthenticationFailed("bad credentials".into()));
        }
        Ok(self
            .0
            .pairs
            .lock()
            .pop_front()
            .unwrap_or_else(|| AuthPair::new("T", "h2:5")))
    }

    async fn close(&self) -> Result<()> {
        *self.0.closed.lock() = true;
        if *self.0.fail_close.lock() {
            Err(QuiverError::Transport("transport close failed".into()))
        } else {
            Ok(())
        }
    }
}

/// Bridge over shared-state doubles, resolved as an encrypted target.
fn bridged(
    delegate: &CollectingRunner,
    auth: &MockAuthenticator,
) -> ArrowBridgeRunner<CollectingRunner> {
    ArrowBridgeRunner::new(
        delegate.clone(),
        Box::new(auth.clone()),
        Credentials::new("neo4j", "secret"),
        true,
    )
}

fn location_table(location: &str) -> DataTable {
    DataTable::new(vec!["databaseLocation".into()], vec![vec![json!(location)]])
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ordinary_calls_pass_through_unchanged() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    let scripted = DataTable::new(vec!["score".into()], vec![vec![json!(0.15)]]);
    delegate.script(scripted.clone());
    let bridge = bridged(&delegate, &auth);

    let result = bridge
        .call(ProcedureCall::procedure("gds.pageRank.stream").param("graph_name", "g"))
        .await
        .unwrap();

    assert_eq!(result, scripted);
    assert_eq!(auth.handshakes(), 0);
    let calls = delegate.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].endpoint, "gds.pageRank.stream");
    assert_eq!(calls[0].params.get("graph_name"), Some(&json!("g")));
    assert!(!calls[0].params.contains_key("token"));
}

#[tokio::test]
async fn remote_projection_gets_token_host_and_config() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    auth.push_pair("T", "h2:5");
    let bridge = bridged(&delegate, &auth);

    bridge
        .call(ProcedureCall::procedure("gds.graph.project.remoteDb").param("graph_name", "g"))
        .await
        .unwrap();

    assert_eq!(auth.handshakes(), 1);
    assert_eq!(auth.seen(), vec![("neo4j".to_string(), "secret".to_string())]);
    let calls = delegate.calls();
    assert_eq!(calls.len(), 1);
    let params = &calls[0].params;
    assert_eq!(params.get("graph_name"), Some(&json!("g")));
    assert_eq!(params.get("token"), Some(&json!("T")));
    assert_eq!(params.get("host"), Some(&json!("h2:5")));
    assert_eq!(params.get("config"), Some(&json!({"useEncryption": true})));
}

#[tokio::test]
async fn every_privileged_call_handshakes_afresh() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    auth.push_pair("first", "h2:5");
    auth.push_pair("second", "h2:5");
    let bridge = bridged(&delegate, &auth);

    let call = ProcedureCall::procedure("gds.graph.project.remoteDb").param("graph_name", "g");
    bridge.call(call.clone()).await.unwrap();
    bridge.call(call).await.unwrap();

    assert_eq!(auth.handshakes(), 2);
    let calls = delegate.calls();
    assert_eq!(calls[0].params.get("token"), Some(&json!("first")));
    assert_eq!(calls[1].params.get("token"), Some(&json!("second")));
}

#[tokio::test]
async fn write_on_remote_graph_extends_config() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    auth.push_pair("T", "h2:5");
    delegate.script(location_table("remote"));
    let bridge = bridged(&delegate, &auth);

    bridge
        .call(
            ProcedureCall::procedure("x.write")
                .param("graph_name", "g")
                .param("config", json!({"foo": 1})),
        )
        .await
        .unwrap();

    assert_eq!(auth.handshakes(), 1);
    let calls = delegate.calls();
    assert_eq!(calls.len(), 2);

    // The lookup is one ordinary delegate call.
    assert_eq!(calls[0].endpoint, "gds.graph.list");
    assert_eq!(calls[0].body.as_deref(), Some("$graph_name"));
    assert_eq!(calls[0].yields, vec!["databaseLocation".to_string()]);
    assert_eq!(calls[0].params.get("graph_name"), Some(&json!("g")));

    assert_eq!(calls[1].endpoint, "x.write");
    assert_eq!(
        calls[1].params.get("config"),
        Some(&json!({
            "foo": 1,
            "arrowConnectionInfo": {
                "hostname": "h2",
                "port": 5,
                "bearerToken": "T",
                "useEncryption": true,
            },
        })),
    );
}

#[tokio::test]
async fn write_lookup_follows_the_call_database() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    delegate.script(location_table("remote"));
    let bridge = bridged(&delegate, &auth);

    bridge
        .call(
            ProcedureCall::procedure("x.write")
                .param("graph_name", "g")
                .param("config", json!({}))
                .database("analytics"),
        )
        .await
        .unwrap();

    let calls = delegate.calls();
    assert_eq!(calls[0].database.as_deref(), Some("analytics"));
}

#[tokio::test]
async fn write_on_local_graph_is_forwarded_unmodified() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    delegate.script(location_table("local"));
    let bridge = bridged(&delegate, &auth);

    bridge
        .call(
            ProcedureCall::procedure("x.write")
                .param("graph_name", "g")
                .param("config", json!({"foo": 1})),
        )
        .await
        .unwrap();

    assert_eq!(auth.handshakes(), 0);
    let calls = delegate.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].endpoint, "gds.graph.list");
    assert_eq!(calls[1].params.get("config"), Some(&json!({"foo": 1})));
    assert!(!calls[1].params.contains_key("token"));
}

#[tokio::test]
async fn write_on_unknown_graph_is_ordinary() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    delegate.script(DataTable::empty());
    let bridge = bridged(&delegate, &auth);

    bridge
        .call(
            ProcedureCall::procedure("x.write")
                .param("graph_name", "g")
                .param("config", json!({})),
        )
        .await
        .unwrap();

    assert_eq!(auth.handshakes(), 0);
    assert_eq!(delegate.calls().len(), 2);
}

#[tokio::test]
async fn write_without_graph_name_is_a_contract_violation() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    let bridge = bridged(&delegate, &auth);

    let err = bridge
        .call(ProcedureCall::procedure("x.write").param("config", json!({})))
        .await
        .unwrap_err();

    assert!(matches!(err, QuiverError::ContractViolation(_)));
    assert!(delegate.calls().is_empty());
}

#[tokio::test]
async fn remote_write_without_config_fails_loudly() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    delegate.script(location_table("remote"));
    let bridge = bridged(&delegate, &auth);

    let err = bridge
        .call(ProcedureCall::procedure("x.write").param("graph_name", "g"))
        .await
        .unwrap_err();

    assert!(matches!(err, QuiverError::ContractViolation(_)));
    // Only the lookup reached the delegate; the write never did.
    assert_eq!(delegate.calls().len(), 1);
}

#[tokio::test]
async fn lookup_errors_propagate() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    delegate.script_error(QuiverError::Driver("lookup broke".into()));
    let bridge = bridged(&delegate, &auth);

    let err = bridge
        .call(
            ProcedureCall::procedure("x.write")
                .param("graph_name", "g")
                .param("config", json!({})),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, QuiverError::Driver(_)));
    assert_eq!(auth.handshakes(), 0);
}

#[tokio::test]
async fn handshake_failure_aborts_the_call() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    auth.reject();
    let bridge = bridged(&delegate, &auth);

    let err = bridge
        .call(ProcedureCall::procedure("gds.graph.project.remoteDb").param("graph_name", "g"))
        .await
        .unwrap_err();

    assert!(matches!(err, QuiverError::AuthenticationFailed(_)));
    assert!(delegate.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Forwarding and lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lifecycle_operations_forward_without_classification() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    let bridge = bridged(&delegate, &auth);

    bridge.set_database("analytics");
    assert_eq!(bridge.database().as_deref(), Some("analytics"));
    bridge.set_bookmarks(vec!["bm-1".into()]);
    assert_eq!(bridge.bookmarks(), vec!["bm-1".to_string()]);
    assert_eq!(bridge.last_bookmarks(), vec!["bm-1".to_string()]);

    bridge
        .run_cypher("RETURN 1", Params::new(), None)
        .await
        .unwrap();
    assert_eq!(*delegate.0.cyphers.lock(), vec!["RETURN 1".to_string()]);

    let err = bridge.create_bulk_loader("g", 4, Vec::new()).await;
    assert!(err.is_err());
    assert_eq!(
        *delegate.0.loader_requests.lock(),
        vec![("g".to_string(), 4, Vec::new())],
    );

    assert_eq!(auth.handshakes(), 0);
    assert!(delegate.calls().is_empty());
}

#[tokio::test]
async fn close_releases_both_sides() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    let bridge = bridged(&delegate, &auth);

    bridge.close().await.unwrap();
    assert!(auth.closed());
    assert!(delegate.closed());
}

#[tokio::test]
async fn close_attempts_delegate_even_when_transport_close_fails() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    auth.fail_close();
    let bridge = bridged(&delegate, &auth);

    let err = bridge.close().await.unwrap_err();
    assert!(matches!(err, QuiverError::Transport(_)));
    assert!(delegate.closed());
}

#[tokio::test]
async fn close_surfaces_delegate_failure_when_transport_closes_cleanly() {
    let delegate = CollectingRunner::default();
    let auth = MockAuthenticator::default();
    delegate.fail_close();
    let bridge = bridged(&delegate, &auth);

    let err = bridge.close().await.unwrap_err();
    assert!(matches!(err, QuiverError::Driver(_)));
    assert!(auth.closed());
}
