//! Arrow Flight transport adapter.
//!
//! Owns the long-lived Flight client used for bulk-data authentication:
//! [`ArrowTransport`] connects to the location resolved over Bolt and
//! performs the basic-credential handshake, while
//! [`AuthPairInterceptor`] extracts the bearer token and redirect
//! address from handshake response metadata.

pub mod interceptor;
mod tls;
pub mod transport;

pub use interceptor::{AuthPairInterceptor, ObservedAuth};
pub use transport::ArrowTransport;
