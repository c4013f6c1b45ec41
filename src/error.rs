//! Errors returned by mock clients and servers.

use crate::verify::VerificationError;
use std::fmt;
use std::sync::Arc;

/// A boxed error as produced by request bodies and caller supplied code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All the ways a mock client or server operation can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A client endpoint simulated a transport failure.
    #[error("{method} {uri}: {source}")]
    Transport {
        method: http::Method,
        uri: http::Uri,
        #[source]
        source: TransportError,
    },

    /// The recorded history did not satisfy a verification.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// The deadline of a wait elapsed before a matching request arrived.
    #[error("deadline exceeded while waiting for request")]
    DeadlineExceeded,

    /// A wait was cancelled before a matching request arrived.
    #[error("cancelled while waiting for request")]
    Cancelled,

    /// The server listener could not be bound.
    #[error("failed to bind mock server listener: {0}")]
    Bind(#[source] std::io::Error),

    /// The server runtime could not be created.
    #[error("failed to build mock server runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The TLS configuration could not be loaded.
    #[error("invalid TLS configuration: {0}")]
    Tls(String),

    /// A request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(#[source] BoxError),

    /// A request could not be built, e.g. from an invalid url.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] http::Error),
}

/// The error a client endpoint hands back instead of a response.
///
/// Cheap to clone so a single configured failure can be returned for every
/// request the endpoint handles.
#[derive(Clone)]
pub struct TransportError(Arc<dyn std::error::Error + Send + Sync>);

impl TransportError {
    /// Wrap any error (or message) as a transport failure.
    pub fn new(err: impl Into<BoxError>) -> Self {
        TransportError(Arc::from(err.into()))
    }
}

impl fmt::Debug for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("TransportError").field(&self.0).finish()
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<&str> for TransportError {
    fn from(msg: &str) -> Self {
        TransportError::new(msg)
    }
}

impl From<String> for TransportError {
    fn from(msg: String) -> Self {
        TransportError::new(msg)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::new(err)
    }
}
