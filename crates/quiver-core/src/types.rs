//! Connection, target, and credential types.

use std::fmt;

use crate::error::{QuiverError, Result};

/// Basic-authentication credentials.
///
/// `Debug` redacts the password so the struct can appear in traces.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Address and credentials of the transactional endpoint used for
/// discovery. Immutable; consumed once by the resolver.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub uri: String,
    pub credentials: Credentials,
}

impl ConnectionInfo {
    pub fn new(
        uri: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            credentials: Credentials::new(username, password),
        }
    }
}

/// Network location of the Arrow service, resolved once at construction
/// of the bridge and fixed for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub host: String,
    pub port: u16,
    pub encrypted: bool,
}

impl ResolvedTarget {
    /// Fails with [`QuiverError::Protocol`] when the host part is empty.
    pub fn new(host: impl Into<String>, port: u16, encrypted: bool) -> Result<Self> {
        let host = host.into();
        if host.is_empty() {
            return Err(QuiverError::Protocol(
                "advertised address has an empty host".into(),
            ));
        }
        Ok(Self {
            host,
            port,
            encrypted,
        })
    }
}

/// Bearer token and redirect address captured from one handshake
/// response. Overwritten by every handshake, never persisted.
///
/// `Debug` redacts the token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthPair {
    pub token: String,
    pub address: String,
}

impl AuthPair {
    pub fn new(token: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            address: address.into(),
        }
    }

    /// Hostname and port of the redirect address.
    pub fn split_address(&self) -> Result<(String, u16)> {
        split_host_port(&self.address)
    }
}

impl fmt::Debug for AuthPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthPair")
            .field("token", &"<redacted>")
            .field("address", &self.address)
            .finish()
    }
}

/// Splits `host:port` on the last colon.
///
/// Splitting on the last colon keeps hosts containing colons intact;
/// the advertised form is always `host:port`.
pub fn split_host_port(address: &str) -> Result<(String, u16)> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| QuiverError::Protocol(format!("malformed address `{address}`")))?;
    if host.is_empty() {
        return Err(QuiverError::Protocol(format!(
            "malformed address `{address}`"
        )));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| QuiverError::Protocol(format!("invalid port in address `{address}`")))?;
    Ok((host.to_string(), port))
}
