//! Per-connection frame outbox.
//!
//! Frames are queued by the worker serving a request and written in FIFO
//! order by a dedicated thread. Every write reports a [`DeliveryReport`] to
//! the completion callback on that thread. The queue is bounded, so a client
//! that stops reading stalls the worker queueing its frames instead of
//! growing the queue.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use specstream_protocol::{Frame, FrameError};
use thiserror::Error;
use tracing::{debug, warn};

use super::LISTENER_TARGET;

/// Frames queued ahead of the writer before `enqueue` waits.
const OUTBOX_CAPACITY: usize = 16;

/// What the outbox promises about queued frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Each frame is written once. A failed write is reported to the
    /// completion callback and the outbox moves on to the next frame; nothing
    /// is retried and the connection is not torn down.
    #[default]
    BestEffort,
}

/// Why a frame was not delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] FrameError),
    /// The transport rejected the write.
    #[error("transport failure: {message}")]
    TransportFailure {
        /// Transport error description.
        message: String,
    },
    /// The outbox thread has exited.
    #[error("outbox closed")]
    Closed,
    /// A thread panicked while holding the socket lock.
    #[error("socket lock poisoned")]
    Poisoned,
}

impl DeliveryError {
    /// Wraps a transport error.
    pub fn transport(error: &impl std::fmt::Display) -> Self {
        Self::TransportFailure {
            message: error.to_string(),
        }
    }
}

/// Outcome of one frame write.
#[derive(Debug)]
pub struct DeliveryReport {
    /// Action label of the frame's header.
    pub action: &'static str,
    /// Time from queueing to write completion.
    pub elapsed: Duration,
    /// Write result.
    pub result: Result<(), DeliveryError>,
}

/// Destination of outbound frames.
pub(crate) trait FrameSink: Send + 'static {
    /// Writes one frame.
    fn send_frame(&mut self, frame: &Frame) -> Result<(), DeliveryError>;
}

struct Queued {
    action: &'static str,
    frame: Frame,
    queued_at: Instant,
}

/// FIFO queue drained by a writer thread.
pub(crate) struct Outbox {
    sender: Option<Sender<Queued>>,
    writer: Option<JoinHandle<()>>,
    policy: DeliveryPolicy,
}

impl Outbox {
    /// Starts a writer thread draining into `sink` and logging each report.
    pub(crate) fn spawn(sink: impl FrameSink) -> io::Result<Self> {
        Self::with_completion(sink, log_delivery)
    }

    /// Starts a writer thread draining into `sink`; `completion` receives a
    /// report for every frame.
    pub(crate) fn with_completion<S, F>(sink: S, completion: F) -> io::Result<Self>
    where
        S: FrameSink,
        F: Fn(DeliveryReport) + Send + 'static,
    {
        let policy = DeliveryPolicy::default();
        let (sender, receiver) = bounded::<Queued>(OUTBOX_CAPACITY);
        let writer = thread::Builder::new()
            .name("specstream-outbox".to_owned())
            .spawn(move || drain(&receiver, sink, &completion))?;
        debug!(target: LISTENER_TARGET, ?policy, "outbox started");
        Ok(Self {
            sender: Some(sender),
            writer: Some(writer),
            policy,
        })
    }

    /// Delivery promise of this outbox.
    pub(crate) const fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Queues `frame` behind every frame queued before it, waiting while
    /// the queue is full.
    pub(crate) fn enqueue(&self, action: &'static str, frame: Frame) -> Result<(), DeliveryError> {
        let sender = self.sender.as_ref().ok_or(DeliveryError::Closed)?;
        sender
            .send(Queued {
                action,
                frame,
                queued_at: Instant::now(),
            })
            .map_err(|_| DeliveryError::Closed)
    }

    /// Writes every queued frame, then stops the writer thread.
    pub(crate) fn finish(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.sender.take();
        if let Some(writer) = self.writer.take()
            && writer.join().is_err()
        {
            warn!(target: LISTENER_TARGET, "outbox writer panicked");
        }
    }
}

impl Drop for Outbox {
    fn drop(&mut self) {
        self.close();
    }
}

fn drain<S, F>(receiver: &Receiver<Queued>, mut sink: S, completion: &F)
where
    S: FrameSink,
    F: Fn(DeliveryReport),
{
    for queued in receiver {
        let result = sink.send_frame(&queued.frame);
        completion(DeliveryReport {
            action: queued.action,
            elapsed: queued.queued_at.elapsed(),
            result,
        });
    }
}

/// Default completion: logs the send duration or the transport error.
fn log_delivery(report: DeliveryReport) {
    let elapsed_ms = report.elapsed.as_secs_f64() * 1000.0;
    match report.result {
        Ok(()) => debug!(
            target: LISTENER_TARGET,
            action = report.action,
            elapsed_ms,
            "frame sent"
        ),
        Err(error) => warn!(
            target: LISTENER_TARGET,
            action = report.action,
            elapsed_ms,
            %error,
            "frame delivery failed"
        ),
    }
}
