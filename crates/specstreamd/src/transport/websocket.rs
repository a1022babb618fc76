//! Server side of a WebSocket connection.
//!
//! The socket is shared between the worker reading requests and the outbox
//! thread writing frames. The worker waits for inbound bytes on a cloned TCP
//! stream without holding the lock, so queued frames are written while the
//! client is idle.

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use specstream_protocol::{Frame, Opcode};
use tracing::debug;
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::{Message, WebSocket};

use super::{ConnectionError, DeliveryError, FrameSink, LISTENER_TARGET};

/// Request path of the spectrogram endpoint.
pub const SPECTROGRAM_PATH: &str = "/compute/spectrogram";

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const READ_POLL: Duration = Duration::from_millis(50);

enum ReadOutcome {
    Message(Vec<u8>),
    Control,
    Pending,
    Closed,
}

/// Accepted WebSocket connection.
pub(crate) struct WebSocketConnection {
    socket: Arc<Mutex<WebSocket<TcpStream>>>,
    probe: TcpStream,
    peer: Option<SocketAddr>,
}

impl WebSocketConnection {
    /// Completes the opening handshake on `stream`, refusing every path but
    /// [`SPECTROGRAM_PATH`] with `404 Not Found`.
    pub(crate) fn accept(stream: TcpStream) -> Result<Self, ConnectionError> {
        let peer = stream.peer_addr().ok();
        stream
            .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
            .map_err(|source| ConnectionError::Socket { source })?;
        let socket = tungstenite::accept_hdr(stream, route_request).map_err(|error| {
            ConnectionError::Handshake {
                message: error.to_string(),
            }
        })?;
        // The clone shares the socket, so the poll timeout also bounds reads
        // made through the WebSocket.
        let probe = socket
            .get_ref()
            .try_clone()
            .map_err(|source| ConnectionError::Socket { source })?;
        probe
            .set_read_timeout(Some(READ_POLL))
            .map_err(|source| ConnectionError::Socket { source })?;
        Ok(Self {
            socket: Arc::new(Mutex::new(socket)),
            probe,
            peer,
        })
    }

    /// Remote address, when the socket reported one.
    pub(crate) const fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Sink writing frames to this connection.
    pub(crate) fn sink(&self) -> WebSocketSink {
        WebSocketSink {
            socket: Arc::clone(&self.socket),
        }
    }

    /// Waits for the next text or binary message.
    ///
    /// Returns `Ok(None)` when the peer closes the connection or `shutdown`
    /// is raised. Control frames are answered by the protocol layer and
    /// skipped.
    pub(crate) fn next_message(
        &self,
        shutdown: &AtomicBool,
    ) -> Result<Option<Vec<u8>>, ConnectionError> {
        loop {
            match self.read_buffered()? {
                ReadOutcome::Message(bytes) => return Ok(Some(bytes)),
                ReadOutcome::Closed => return Ok(None),
                ReadOutcome::Control => {}
                ReadOutcome::Pending => {
                    if !self.wait_readable(shutdown)? {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Sends a close frame; failures only mean the peer is already gone.
    pub(crate) fn close(&self) {
        let Ok(mut socket) = self.lock() else {
            return;
        };
        if let Err(error) = socket.close(None).and_then(|()| socket.flush()) {
            debug!(
                target: LISTENER_TARGET,
                peer = ?self.peer,
                %error,
                "close handshake incomplete"
            );
        }
    }

    fn read_buffered(&self) -> Result<ReadOutcome, ConnectionError> {
        let result = self.lock()?.read();
        match result {
            Ok(Message::Text(text)) => Ok(ReadOutcome::Message(text.into_bytes())),
            Ok(Message::Binary(bytes)) => Ok(ReadOutcome::Message(bytes)),
            Ok(Message::Close(_)) => Ok(ReadOutcome::Closed),
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                Ok(ReadOutcome::Control)
            }
            Err(tungstenite::Error::Io(error)) if is_timeout(&error) => Ok(ReadOutcome::Pending),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(ReadOutcome::Closed)
            }
            Err(error) => Err(ConnectionError::protocol(error)),
        }
    }

    /// Blocks outside the socket lock until bytes arrive. Returns `false`
    /// when `shutdown` is raised first.
    fn wait_readable(&self, shutdown: &AtomicBool) -> Result<bool, ConnectionError> {
        let mut byte = [0_u8; 1];
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return Ok(false);
            }
            match self.probe.peek(&mut byte) {
                Ok(_) => return Ok(true),
                Err(error) if is_timeout(&error) => {}
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => return Err(ConnectionError::Socket { source }),
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, WebSocket<TcpStream>>, ConnectionError> {
        self.socket.lock().map_err(|_| ConnectionError::Poisoned)
    }
}

/// Writes frames to a shared WebSocket.
pub(crate) struct WebSocketSink {
    socket: Arc<Mutex<WebSocket<TcpStream>>>,
}

impl FrameSink for WebSocketSink {
    fn send_frame(&mut self, frame: &Frame) -> Result<(), DeliveryError> {
        let message = frame_message(frame)?;
        let mut socket = self.socket.lock().map_err(|_| DeliveryError::Poisoned)?;
        socket
            .send(message)
            .map_err(|source| DeliveryError::transport(&source))
    }
}

/// Maps a frame onto a WebSocket message.
///
/// Header-only frames travel as text when their encoding is valid UTF-8 and
/// fall back to binary otherwise, which happens once the length prefix
/// carries a byte of 128 or above. A header's size depends on its values, so
/// the same action may arrive under either opcode: clients must decode the
/// message bytes as a frame regardless of the opcode. Payload frames are
/// always binary.
pub(crate) fn frame_message(frame: &Frame) -> Result<Message, DeliveryError> {
    let bytes = frame.encode()?;
    Ok(match frame.opcode() {
        Opcode::Binary => Message::Binary(bytes),
        Opcode::Text => match String::from_utf8(bytes) {
            Ok(text) => Message::Text(text),
            Err(error) => Message::Binary(error.into_bytes()),
        },
    })
}

fn route_request(request: &Request, response: Response) -> Result<Response, ErrorResponse> {
    let path = request.uri().path();
    if path == SPECTROGRAM_PATH || path.strip_suffix('/') == Some(SPECTROGRAM_PATH) {
        return Ok(response);
    }
    debug!(target: LISTENER_TARGET, path, "refusing websocket upgrade");
    let mut refusal = ErrorResponse::new(Some(format!("no websocket endpoint at {path}")));
    *refusal.status_mut() = StatusCode::NOT_FOUND;
    Err(refusal)
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
