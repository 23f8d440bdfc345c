//! Quiver - graph analytics client with Arrow-bridged credentials.
//!
//! Ordinary calls run over Bolt. Calls that make the server open its own
//! Arrow Flight connection (projecting from a remote database, or
//! writing back to a graph whose data lives remotely) need short-lived
//! Flight credentials the caller does not have. A bridging runner
//! intercepts those calls, performs a fresh Flight handshake, and
//! injects the returned bearer token and address into the call's
//! parameters before forwarding it over Bolt.
//!
//! Construction is two-phase: [`QuiverClient::connect_bridged`] first
//! resolves the advertised Arrow address via `internal.arrow.status()`,
//! then wires a lazy Flight channel (TLS without certificate
//! verification on this internal link, plaintext otherwise) into an
//! [`ArrowBridgeRunner`] around the Bolt delegate.

pub mod bridge;
pub mod client;
pub mod graph;
mod resolve;

pub use bridge::ArrowBridgeRunner;
pub use client::QuiverClient;
pub use graph::GraphOps;
pub use quiver_arrow::{ArrowTransport, AuthPairInterceptor};
pub use quiver_bolt::{BoltOptions, BoltRunner, CypherBulkLoader};
pub use quiver_core::{
    ArrowAuthenticator, AuthPair, BulkLoader, CallKind, ConnectionInfo, Credentials, DataTable,
    Params, ProcedureCall, QueryRunner, QuiverError, ResolvedTarget, Result,
};
