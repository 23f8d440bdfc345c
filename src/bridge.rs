//! Credential-bridging dispatcher.
//!
//! [`ArrowBridgeRunner`] decorates a delegate [`QueryRunner`]. Calls that
//! make the server reach out to a remote Arrow endpoint are intercepted:
//! the dispatcher performs a fresh Flight handshake, then injects the
//! bearer token and redirect address into the call's parameters before
//! forwarding. Everything else passes through untouched.
//!
//! Tokens are short-lived, so the handshake runs on every privileged
//! call; nothing is reused across calls.

use async_trait::async_trait;
use serde_json::{Value, json};

use quiver_core::{
    ArrowAuthenticator, AuthPair, BulkLoader, Credentials, DataTable, Params, ProcedureCall,
    QueryRunner, QuiverError, Result,
};

/// Projection procedure that always requires bridged credentials.
pub(crate) const REMOTE_PROJECTION_ENDPOINT: &str = "gds.graph.project.remoteDb";
/// Endpoint suffix that marks a call as a candidate remote write.
const WRITE_SUFFIX: &str = ".write";
/// Catalog lookup used to decide where a graph's data lives.
const GRAPH_LIST_ENDPOINT: &str = "gds.graph.list";
const REMOTE_LOCATION: &str = "remote";

/// Per-call classification; never persisted.
enum CallShape {
    Ordinary,
    RemoteProjection,
    RemoteWrite,
}

/// Decorating runner that injects Arrow credentials into privileged
/// calls.
///
/// Owns its delegate and the handshake transport exclusively; both are
/// released through [`QueryRunner::close`].
pub struct ArrowBridgeRunner<D> {
    delegate: D,
    authenticator: Box<dyn ArrowAuthenticator>,
    credentials: Credentials,
    /// Encryption flag of the resolved target, forwarded to the server
    /// so its outbound Arrow connection matches ours.
    encrypted: bool,
}

impl<D: QueryRunner> ArrowBridgeRunner<D> {
    pub fn new(
        delegate: D,
        authenticator: Box<dyn ArrowAuthenticator>,
        credentials: Credentials,
        encrypted: bool,
    ) -> Self {
        Self {
            delegate,
            authenticator,
            credentials,
            encrypted,
        }
    }

    /// Classifies a call, issuing at most one catalog lookup.
    ///
    /// The lookup goes straight to the delegate so it can never recurse
    /// into privileged handling.
    async fn classify(&self, call: &ProcedureCall) -> Result<CallShape> {
        if call.endpoint == REMOTE_PROJECTION_ENDPOINT {
            return Ok(CallShape::RemoteProjection);
        }
        if !call.endpoint.ends_with(WRITE_SUFFIX) {
            return Ok(CallShape::Ordinary);
        }

        let graph_name = call
            .params
            .get("graph_name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                QuiverError::ContractViolation(format!(
                    "write call `{}` carries no `graph_name` parameter",
                    call.endpoint
                ))
            })?;
        let mut lookup = ProcedureCall::procedure(GRAPH_LIST_ENDPOINT)
            .body("$graph_name")
            .yields(["databaseLocation"])
            .param("graph_name", graph_name);
        if let Some(database) = &call.database {
            lookup = lookup.database(database.clone());
        }

        let location = self.delegate.call(lookup).await?;
        if location.value().and_then(Value::as_str) == Some(REMOTE_LOCATION) {
            Ok(CallShape::RemoteWrite)
        } else {
            // Unknown graphs and local graphs both stay ordinary.
            Ok(CallShape::Ordinary)
        }
    }

    async fn handshake(&self) -> Result<AuthPair> {
        self.authenticator
            .authenticate(&self.credentials.username, &self.credentials.password)
            .await
    }
}

/// Fills the placeholder parameters of a remote projection call.
fn inject_projection(params: &mut Params, auth: &AuthPair, encrypted: bool) {
    params.insert("token".into(), json!(auth.token));
    params.insert("host".into(), json!(auth.address));
    params.insert("config".into(), json!({ "useEncryption": encrypted }));
}

/// Adds `arrowConnectionInfo` to the existing `config` parameter of a
/// remote write call.
fn inject_write(params: &mut Params, auth: &AuthPair, encrypted: bool) -> Result<()> {
    let (hostname, port) = auth.split_address()?;
    let config = params
        .get_mut("config")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| {
            QuiverError::ContractViolation(
                "remote write call carries no `config` parameter to extend".into(),
            )
        })?;
    config.insert(
        "arrowConnectionInfo".into(),
        json!({
            "hostname": hostname,
            "port": port,
            "bearerToken": auth.token,
            "useEncryption": encrypted,
        }),
    );
    Ok(())
}

#[async_trait]
impl<D: QueryRunner> QueryRunner for ArrowBridgeRunner<D> {
    async fn call(&self, mut call: ProcedureCall) -> Result<DataTable> {
        match self.classify(&call).await? {
            CallShape::Ordinary => self.delegate.call(call).await,
            CallShape::RemoteProjection => {
                let auth = self.handshake().await?;
                tracing::debug!(endpoint = %call.endpoint, "bridging remote projection");
                inject_projection(&mut call.params, &auth, self.encrypted);
                self.delegate.call(call).await
            }
            CallShape::RemoteWrite => {
                let auth = self.handshake().await?;
                tracing::debug!(endpoint = %call.endpoint, "bridging remote write");
                inject_write(&mut call.params, &auth, self.encrypted)?;
                self.delegate.call(call).await
            }
        }
    }

    async fn run_cypher(
        &self,
        query: &str,
        params: Params,
        database: Option<&str>,
    ) -> Result<DataTable> {
        self.delegate.run_cypher(query, params, database).await
    }

    fn set_database(&self, database: &str) {
        self.delegate.set_database(database);
    }

    fn database(&self) -> Option<String> {
        self.delegate.database()
    }

    fn set_bookmarks(&self, bookmarks: Vec<String>) {
        self.delegate.set_bookmarks(bookmarks);
    }

    fn bookmarks(&self) -> Vec<String> {
        self.delegate.bookmarks()
    }

    fn last_bookmarks(&self) -> Vec<String> {
        self.delegate.last_bookmarks()
    }

    async fn create_bulk_loader(
        &self,
        graph_name: &str,
        concurrency: usize,
        undirected_relationship_types: Vec<String>,
    ) -> Result<Box<dyn BulkLoader>> {
        self.delegate
            .create_bulk_loader(graph_name, concurrency, undirected_relationship_types)
            .await
    }

    /// Closes the transport, then the delegate. Both closes are
    /// attempted; the first failure is surfaced.
    async fn close(&self) -> Result<()> {
        let transport = self.authenticator.close().await;
        let delegate = self.delegate.close().await;
        transport.and(delegate)
    }
}
