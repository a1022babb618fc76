//! Fixed-size pool of connection workers.

use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};
use tracing::debug;

use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

/// Accepted connections queued per worker before the accept loop waits.
const QUEUE_PER_WORKER: usize = 4;
const QUEUE_WAIT: Duration = Duration::from_millis(50);

/// Workers pulling accepted connections from a shared queue.
///
/// Each worker serves one connection end to end before taking the next, so
/// at most `size` connections are served at once. Up to
/// `size * QUEUE_PER_WORKER` more wait queued; beyond that the accept loop
/// waits and further clients stay in the kernel backlog.
pub(crate) struct WorkerPool {
    sender: Option<Sender<TcpStream>>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Starts `size` workers (at least one).
    pub(crate) fn spawn(
        size: usize,
        handler: Arc<dyn ConnectionHandler>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, ListenerError> {
        let size = size.max(1);
        let (sender, receiver) = bounded::<TcpStream>(size * QUEUE_PER_WORKER);
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = receiver.clone();
            let handler = Arc::clone(&handler);
            let shutdown = Arc::clone(&shutdown);
            let worker = thread::Builder::new()
                .name(format!("specstream-worker-{index}"))
                .spawn(move || run_worker(&receiver, handler.as_ref(), &shutdown))
                .map_err(|source| ListenerError::Spawn {
                    role: "worker",
                    source,
                })?;
            workers.push(worker);
        }
        Ok(Self {
            sender: Some(sender),
            workers,
            shutdown,
        })
    }

    /// Queues `stream` for the next idle worker, waiting while the queue is
    /// full. Returns `false` when the stream was not queued because every
    /// worker has exited or shutdown was requested.
    pub(crate) fn dispatch(&self, stream: TcpStream) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        let mut pending = stream;
        loop {
            match sender.send_timeout(pending, QUEUE_WAIT) {
                Ok(()) => return true,
                Err(SendTimeoutError::Disconnected(_)) => return false,
                Err(SendTimeoutError::Timeout(stream)) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        return false;
                    }
                    pending = stream;
                }
            }
        }
    }

    /// Closes the queue and waits for the workers to drain it.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        self.sender.take();
        let mut panicked = false;
        for worker in self.workers.drain(..) {
            panicked |= worker.join().is_err();
        }
        if panicked {
            return Err(ListenerError::ThreadPanic);
        }
        Ok(())
    }
}

fn run_worker(
    receiver: &Receiver<TcpStream>,
    handler: &dyn ConnectionHandler,
    shutdown: &AtomicBool,
) {
    for stream in receiver {
        handler.handle(stream, shutdown);
    }
    debug!(target: LISTENER_TARGET, "worker exiting");
}
