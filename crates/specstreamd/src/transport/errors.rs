//! Error types for listener and connection operations.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running the listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured host did not resolve.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// The configured host resolved to nothing.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// Binding the resolved address failed.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    BindTcp {
        /// Resolved address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bound socket did not report its address.
    #[error("failed to read listener address: {source}")]
    LocalAddr {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The listener could not be switched to non-blocking accepts.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A listener or worker thread could not be spawned.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        /// Which thread failed to start.
        role: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept loop or a worker panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}

/// Errors that end a single WebSocket connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The opening handshake failed or was refused.
    #[error("websocket handshake failed: {message}")]
    Handshake {
        /// Handshake failure description.
        message: String,
    },
    /// Configuring or polling the socket failed.
    #[error("socket error: {source}")]
    Socket {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The peer violated the WebSocket protocol or the stream broke.
    #[error("websocket protocol error: {source}")]
    Protocol {
        /// Underlying WebSocket error.
        #[source]
        source: Box<tungstenite::Error>,
    },
    /// A thread panicked while holding the socket lock.
    #[error("websocket lock poisoned")]
    Poisoned,
}

impl ConnectionError {
    pub(crate) fn protocol(source: tungstenite::Error) -> Self {
        Self::Protocol {
            source: Box::new(source),
        }
    }
}
