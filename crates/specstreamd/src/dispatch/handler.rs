//! Connection handler serving WebSocket clients.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use specstream_analysis::SpectrogramAnalyzer;
use specstream_storage::ArrayStore;
use tracing::{debug, warn};

use crate::transport::{ConnectionHandler, Outbox, WebSocketConnection};

use super::DISPATCH_TARGET;
use super::response::Responder;
use super::router::MessageRouter;

/// Upgrades accepted streams and serves their requests one at a time.
pub(crate) struct DispatchConnectionHandler {
    router: MessageRouter,
}

impl DispatchConnectionHandler {
    pub(crate) fn new(store: Arc<dyn ArrayStore>, analyzer: Arc<dyn SpectrogramAnalyzer>) -> Self {
        Self {
            router: MessageRouter::new(store, analyzer),
        }
    }

    fn serve(&self, connection: &WebSocketConnection, shutdown: &AtomicBool) {
        let outbox = match Outbox::spawn(connection.sink()) {
            Ok(outbox) => outbox,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to start outbox");
                return;
            }
        };
        debug!(
            target: DISPATCH_TARGET,
            peer = ?connection.peer(),
            policy = ?outbox.policy(),
            "serving connection"
        );
        let responder = Responder::new(&outbox);
        loop {
            match connection.next_message(shutdown) {
                Ok(Some(bytes)) => self.router.route(&bytes, &responder),
                Ok(None) => break,
                Err(error) => {
                    warn!(
                        target: DISPATCH_TARGET,
                        peer = ?connection.peer(),
                        %error,
                        "connection failed"
                    );
                    break;
                }
            }
        }
        outbox.finish();
    }
}

impl ConnectionHandler for DispatchConnectionHandler {
    fn handle(&self, stream: TcpStream, shutdown: &AtomicBool) {
        let connection = match WebSocketConnection::accept(stream) {
            Ok(connection) => connection,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "websocket upgrade rejected");
                return;
            }
        };
        debug!(target: DISPATCH_TARGET, peer = ?connection.peer(), "client connected");
        self.serve(&connection, shutdown);
        connection.close();
        debug!(target: DISPATCH_TARGET, peer = ?connection.peer(), "client disconnected");
    }
}
