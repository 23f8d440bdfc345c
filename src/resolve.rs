//! Arrow server discovery.
//!
//! The Flight endpoint is not configured directly; it is advertised by
//! the database through `internal.arrow.status()`. The resolver runs
//! that procedure once over a short-lived Bolt session and turns the
//! answer into a [`ResolvedTarget`].

use std::time::Duration;

use serde_json::Value;

use quiver_bolt::{BoltOptions, BoltRunner};
use quiver_core::{
    ConnectionInfo, DataTable, ProcedureCall, QueryRunner, QuiverError, ResolvedTarget, Result,
    split_host_port,
};

const STATUS_ENDPOINT: &str = "internal.arrow.status";

/// Upper bound on the whole probe: connect, status call, close.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolves the advertised Flight address of the server behind `info`.
///
/// The probe session is closed before returning, whatever the outcome;
/// a failed status call takes precedence over a failed close.
pub(crate) async fn resolve_target(info: &ConnectionInfo) -> Result<ResolvedTarget> {
    let probe = BoltRunner::connect(info, BoltOptions::probe()).await?;
    let status = tokio::time::timeout(
        DISCOVERY_TIMEOUT,
        probe.call(ProcedureCall::procedure(STATUS_ENDPOINT).raw_error()),
    )
    .await;
    let closed = probe.close().await;

    let table = match status {
        Ok(result) => result?,
        Err(_) => {
            return Err(QuiverError::Driver(format!(
                "`{STATUS_ENDPOINT}` did not answer within {}s",
                DISCOVERY_TIMEOUT.as_secs()
            )));
        }
    };
    closed?;

    let target = parse_status(&table, &info.uri)?;
    tracing::debug!(
        host = %target.host,
        port = target.port,
        encrypted = target.encrypted,
        "resolved Arrow endpoint"
    );
    Ok(target)
}

/// Interprets one `internal.arrow.status()` result row.
fn parse_status(status: &DataTable, uri: &str) -> Result<ResolvedTarget> {
    let running = status
        .cell(0, "running")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !running {
        return Err(QuiverError::ServiceUnavailable(uri.to_string()));
    }

    let address = match status
        .cell(0, "advertisedListenAddress")
        .and_then(Value::as_str)
    {
        Some(address) if !address.is_empty() => address,
        _ => return Err(QuiverError::ConnectionInfoMissing),
    };

    let (host, port) = split_host_port(address)?;
    ResolvedTarget::new(host, port, uri_uses_encryption(uri))
}

/// Whether the Bolt URI scheme negotiates TLS. The Arrow link inherits
/// the choice made for the transactional link.
fn uri_uses_encryption(uri: &str) -> bool {
    match uri.split_once("://") {
        Some((scheme, _)) => matches!(scheme, "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc"),
        None => false,
    }
}
