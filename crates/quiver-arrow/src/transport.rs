//! Long-lived Flight client bound to the resolved Arrow location.

use std::time::Duration;

use arrow_flight::HandshakeRequest;
use arrow_flight::flight_service_client::FlightServiceClient;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use futures::stream;
use http::Uri;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_rustls::TlsConnector;
use tonic::Request;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, Endpoint};

use quiver_core::{ArrowAuthenticator, AuthPair, QuiverError, ResolvedTarget, Result};

use crate::interceptor::AuthPairInterceptor;
use crate::tls;

/// Upper bound on one handshake round trip.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on establishing the TCP (and TLS) connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Flight client plus the interceptor watching its handshake responses.
///
/// The client slot is a single async mutex: a handshake and the capture
/// of its response headers form one critical section, so a concurrent
/// caller can never read another caller's in-flight token.
pub struct ArrowTransport {
    client: Mutex<Option<FlightServiceClient<Channel>>>,
    interceptor: AuthPairInterceptor,
}

impl ArrowTransport {
    /// Builds a lazily connecting client for the resolved target, with
    /// TLS when the discovery session was encrypted and plaintext
    /// otherwise. No traffic happens until the first handshake.
    pub fn connect(target: &ResolvedTarget) -> Result<Self> {
        let scheme = if target.encrypted { "https" } else { "http" };
        let endpoint = Endpoint::from_shared(format!(
            "{scheme}://{}:{}",
            target.host, target.port
        ))
        .map_err(|e| QuiverError::Transport(format!("invalid Arrow endpoint: {e}")))?
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HANDSHAKE_TIMEOUT);

        let channel = if target.encrypted {
            let config = tls::insecure_client_config()?;
            let name = tls::server_name(&target.host)?;
            let connector = TlsConnector::from(std::sync::Arc::new(config));
            let host = target.host.clone();
            let port = target.port;
            endpoint.connect_with_connector_lazy(tower::service_fn(move |_uri: Uri| {
                let connector = connector.clone();
                let name = name.clone();
                let host = host.clone();
                async move {
                    let stream = TcpStream::connect((host.as_str(), port)).await?;
                    let stream = connector.connect(name, stream).await?;
                    Ok::<_, std::io::Error>(TokioIo::new(stream))
                }
            }))
        } else {
            endpoint.connect_lazy()
        };

        tracing::debug!(
            host = %target.host,
            port = target.port,
            encrypted = target.encrypted,
            "arrow transport created",
        );
        Ok(Self {
            client: Mutex::new(Some(FlightServiceClient::new(channel))),
            interceptor: AuthPairInterceptor::default(),
        })
    }

    /// The interceptor observing this transport's handshake responses.
    pub fn interceptor(&self) -> &AuthPairInterceptor {
        &self.interceptor
    }
}

#[async_trait]
impl ArrowAuthenticator for ArrowTransport {
    async fn authenticate(&self, username: &str, password: &str) -> Result<AuthPair> {
        let mut guard = self.client.lock().await;
        let client = guard
            .as_mut()
            .ok_or_else(|| QuiverError::Transport("arrow transport is closed".into()))?;

        let encoded = BASE64.encode(format!("{username}:{password}"));
        let header: MetadataValue<Ascii> = format!("Basic {encoded}")
            .parse()
            .map_err(|_| QuiverError::Transport("credentials contain invalid characters".into()))?;
        let mut request = Request::new(stream::iter(vec![HandshakeRequest {
            protocol_version: 0,
            payload: Bytes::new(),
        }]));
        request.metadata_mut().insert("authorization", header);

        let response = tokio::time::timeout(HANDSHAKE_TIMEOUT, client.handshake(request))
            .await
            .map_err(|_| QuiverError::AuthenticationFailed("handshake timed out".into()))?
            .map_err(|status| QuiverError::AuthenticationFailed(status.message().to_string()))?;

        let observed = self.interceptor.observe(response.metadata())?;
        tracing::debug!(
            token_received = observed.token.is_some(),
            address = observed.address.as_deref().unwrap_or(""),
            "arrow handshake complete",
        );
        observed.auth_pair().ok_or(QuiverError::NotAuthenticated)
    }

    async fn close(&self) -> Result<()> {
        // Dropping the last handle tears down the channel.
        self.client.lock().await.take();
        Ok(())
    }
}
