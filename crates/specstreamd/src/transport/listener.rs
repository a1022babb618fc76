//! TCP listener feeding the worker pool.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::pool::WorkerPool;
use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Bound, not yet accepting, TCP listener.
#[derive(Debug)]
pub(crate) struct SocketListener {
    addr: SocketAddr,
    listener: TcpListener,
}

impl SocketListener {
    /// Resolves `host:port` and binds the first address it yields.
    pub(crate) fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let listener = bind_tcp(host, port)?;
        let addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self { addr, listener })
    }

    /// Bound address; reports the real port when bound to port 0.
    pub(crate) const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts the accept loop and `workers` connection workers.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        workers: usize,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let pool = WorkerPool::spawn(workers, handler, Arc::clone(&shutdown))?;
        let shutdown_flag = Arc::clone(&shutdown);
        let addr = self.addr;
        let handle = thread::Builder::new()
            .name("specstream-accept".to_owned())
            .spawn(move || run_accept_loop(&self, &shutdown_flag, pool))
            .map_err(|source| ListenerError::Spawn {
                role: "accept",
                source,
            })?;
        Ok(ListenerHandle {
            addr,
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to a running listener.
///
/// Dropping the handle raises the shutdown flag without waiting; call
/// [`ListenerHandle::join`] to wait for in-flight connections to finish.
#[derive(Debug)]
pub struct ListenerHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<Result<(), ListenerError>>>,
}

impl ListenerHandle {
    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Asks the accept loop and every connection to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop and the worker pool to exit.
    pub fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic)?,
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    pool: WorkerPool,
) -> Result<(), ListenerError> {
    info!(
        target: LISTENER_TARGET,
        addr = %listener.addr,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener) {
            Ok(Some((stream, peer))) => {
                last_error = None;
                debug!(target: LISTENER_TARGET, %peer, "connection accepted");
                if !pool.dispatch(stream) {
                    warn!(
                        target: LISTENER_TARGET,
                        %peer,
                        "connection not queued; stopping accept loop"
                    );
                    break;
                }
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: LISTENER_TARGET, "socket listener stopping");
    pool.join()
}

fn accept_connection(listener: &TcpListener) -> io::Result<Option<(TcpStream, SocketAddr)>> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_owned(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}
