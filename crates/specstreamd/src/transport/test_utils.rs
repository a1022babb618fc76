//! Test doubles for the transport module.

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use specstream_protocol::Frame;

use super::{ConnectionHandler, DeliveryError, FrameSink};

/// Counts connections and drops them immediately.
pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self::with_count(Arc::clone(&count)));
        (count, handler)
    }

    pub(crate) const fn with_count(count: Arc<AtomicUsize>) -> Self {
        Self { count }
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: TcpStream, _shutdown: &AtomicBool) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sink that records frames, optionally failing one write.
pub(crate) struct RecordingSink {
    sent: Arc<Mutex<Vec<Frame>>>,
    fail_at: Option<usize>,
    attempts: usize,
}

impl RecordingSink {
    pub(crate) fn new() -> (Self, Arc<Mutex<Vec<Frame>>>) {
        Self::build(None)
    }

    /// Fails the write with zero-based index `attempt`.
    pub(crate) fn failing_on(attempt: usize) -> (Self, Arc<Mutex<Vec<Frame>>>) {
        Self::build(Some(attempt))
    }

    fn build(fail_at: Option<usize>) -> (Self, Arc<Mutex<Vec<Frame>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Self {
            sent: Arc::clone(&sent),
            fail_at,
            attempts: 0,
        };
        (sink, sent)
    }
}

impl FrameSink for RecordingSink {
    fn send_frame(&mut self, frame: &Frame) -> Result<(), DeliveryError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_at == Some(attempt) {
            return Err(DeliveryError::transport(&"connection reset by peer"));
        }
        self.sent
            .lock()
            .map_err(|_| DeliveryError::Poisoned)?
            .push(frame.clone());
        Ok(())
    }
}
