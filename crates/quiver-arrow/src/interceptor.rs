//! Handshake response header interception.

use parking_lot::Mutex;
use tonic::metadata::MetadataMap;

use quiver_core::{AuthPair, QuiverError, Result};

/// Response header carrying `<scheme> <credential>`.
const AUTHORIZATION_HEADER: &str = "authorization";
/// Response header carrying the redirect address as a bare `host:port`.
const ARROW_ADDRESS_HEADER: &str = "arrowpluginaddress";
/// Token scheme accepted from the server.
const BEARER_SCHEME: &str = "Bearer";

/// What one specific response carried.
///
/// Distinct from the interceptor's cache: a caller that needs values
/// from *this* handshake (tokens are short-lived) reads these fields and
/// never risks seeing a previous handshake's leftovers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ObservedAuth {
    pub token: Option<String>,
    pub address: Option<String>,
}

impl ObservedAuth {
    /// Both values, when this response carried both.
    pub fn auth_pair(&self) -> Option<AuthPair> {
        match (&self.token, &self.address) {
            (Some(token), Some(address)) => Some(AuthPair::new(token, address)),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Cached {
    token: Option<String>,
    address: Option<String>,
}

/// Observes response metadata of handshake calls and keeps the most
/// recently seen bearer token and redirect address.
///
/// Purely passive: it never adds outgoing headers. Registered with the
/// transport at construction and fed every handshake response.
#[derive(Debug, Default)]
pub struct AuthPairInterceptor {
    cached: Mutex<Cached>,
}

impl AuthPairInterceptor {
    /// Parses one response header set, updates the cache, and returns
    /// what this response carried.
    ///
    /// The token is stored only for the `Bearer` scheme; an
    /// `authorization` value without a scheme separator is malformed and
    /// fails with [`QuiverError::Protocol`].
    pub fn observe(&self, metadata: &MetadataMap) -> Result<ObservedAuth> {
        let token = match first_header(metadata, AUTHORIZATION_HEADER)? {
            Some(value) => bearer_credential(&value)?,
            None => None,
        };
        let address = first_header(metadata, ARROW_ADDRESS_HEADER)?;

        let mut cached = self.cached.lock();
        if let Some(token) = &token {
            cached.token = Some(token.clone());
        }
        if let Some(address) = &address {
            cached.address = Some(address.clone());
        }
        Ok(ObservedAuth { token, address })
    }

    /// Most recently observed token.
    pub fn token(&self) -> Result<String> {
        self.cached
            .lock()
            .token
            .clone()
            .ok_or(QuiverError::NotAuthenticated)
    }

    /// Most recently observed redirect address.
    pub fn address(&self) -> Result<String> {
        self.cached
            .lock()
            .address
            .clone()
            .ok_or(QuiverError::NotAuthenticated)
    }
}

/// First value of a possibly repeated header, or `None` when absent.
fn first_header(metadata: &MetadataMap, name: &str) -> Result<Option<String>> {
    match metadata.get_all(name).iter().next() {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| QuiverError::Protocol(format!("header `{name}` is not a string")))?;
            Ok(Some(value.to_string()))
        }
        None => Ok(None),
    }
}

/// Credential part of `<scheme> <credential>`, for the Bearer scheme only.
fn bearer_credential(value: &str) -> Result<Option<String>> {
    let (scheme, credential) = value.split_once(' ').ok_or_else(|| {
        QuiverError::Protocol("malformed authorization header in handshake response".into())
    })?;
    if scheme == BEARER_SCHEME {
        Ok(Some(credential.to_string()))
    } else {
        Ok(None)
    }
}
