//! WebSocket transport for the streaming server.
//!
//! The listener accepts TCP connections on a background thread and hands them
//! to a fixed pool of workers. A worker completes the WebSocket handshake,
//! reads inbound messages, and queues outbound frames to the connection's
//! outbox, which writes them on its own thread.

mod errors;
mod listener;
mod outbox;
mod pool;
#[cfg(test)]
mod test_utils;
mod websocket;

use std::net::TcpStream;
use std::sync::atomic::AtomicBool;

pub use self::errors::{ConnectionError, ListenerError};
pub use self::listener::ListenerHandle;
pub(crate) use self::listener::SocketListener;
pub use self::outbox::{DeliveryError, DeliveryPolicy, DeliveryReport};
pub(crate) use self::outbox::{FrameSink, Outbox};
#[cfg(test)]
pub(crate) use self::test_utils::{CountingHandler, RecordingSink};
pub use self::websocket::SPECTROGRAM_PATH;
pub(crate) use self::websocket::WebSocketConnection;

pub(crate) const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Serves accepted connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Serves `stream` until the peer leaves or `shutdown` is raised.
    /// Implementations log their own failures and must not panic.
    fn handle(&self, stream: TcpStream, shutdown: &AtomicBool);
}
