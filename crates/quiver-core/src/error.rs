//! Error types shared across the workspace.

use thiserror::Error;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, QuiverError>;

/// Errors surfaced by the client, the Bolt delegate, and the Arrow bridge.
///
/// The first six variants are the semantic failures of the credential
/// bridge itself; the remaining ones wrap failures of the underlying
/// protocol layers. All errors are raised to the direct caller, never
/// swallowed or downgraded to unauthenticated behavior.
#[derive(Debug, Error)]
pub enum QuiverError {
    /// The Arrow service reported itself as not running, or discovery
    /// could not reach it. Construction of the bridge aborts.
    #[error("the Arrow server is not running at `{0}`")]
    ServiceUnavailable(String),

    /// The status query succeeded but advertised no listen address.
    #[error("did not retrieve connection info from database")]
    ConnectionInfoMissing,

    /// Malformed address string or malformed header shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The Arrow service rejected the handshake credentials.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A privileged call arrived without the parameters its upstream
    /// contract guarantees.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// A token or redirect address was needed before any handshake
    /// produced one.
    #[error("no token or address received from the Arrow server")]
    NotAuthenticated,

    /// Bolt driver failure.
    #[error("driver error: {0}")]
    Driver(String),

    /// Flight transport failure outside the handshake itself.
    #[error("transport error: {0}")]
    Transport(String),

    /// The operation is not supported by the executing runner.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
