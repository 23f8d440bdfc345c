//! Capability seam for the Arrow handshake.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::AuthPair;

/// Performs the basic-credential handshake against the Arrow service.
///
/// `authenticate` returns the token and redirect address observed in the
/// handshake response directly; tokens are short-lived, so implementations
/// must perform a fresh handshake on every call and never serve a cached
/// pair.
#[async_trait]
pub trait ArrowAuthenticator: Send + Sync {
    /// One handshake; yields the pair carried by this response's headers.
    async fn authenticate(&self, username: &str, password: &str) -> Result<AuthPair>;

    /// Releases the transport client. Idempotent.
    async fn close(&self) -> Result<()>;
}
