//! Listener and server lifecycle.
//!
//! The accept loop runs in its own coroutine: accept, spawn one session
//! coroutine, immediately accept again, so the listener is always ready for
//! the next connection. All coroutines are multiplexed across the `may`
//! scheduler's fixed worker-thread pool (sized via
//! [`crate::runtime_config::RuntimeConfig::apply`]).

use crate::dispatcher::Dispatcher;
use crate::server::session::ConnectionSession;
use may::coroutine::JoinHandle;
use may::net::TcpListener;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

/// HTTP server: owns the dispatcher and turns accepted sockets into
/// sessions.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
}

/// Handle to a running HTTP server.
///
/// Provides methods for waiting until the server is ready, stopping it
/// gracefully, or joining the accept loop.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// The address the listener actually bound (useful with port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to be ready to accept connections.
    ///
    /// Polls the server address by attempting TCP connections until
    /// successful. Useful in tests to ensure the server is fully started
    /// before sending requests.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server doesn't become ready within ~250ms
    /// (50 attempts x 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if std::net::TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting connections and join the accept loop.
    ///
    /// Sessions already running finish on their own when their connections
    /// close. Safe to call from the signal-watcher thread; consuming `self`
    /// makes a second stop impossible, so the operation is idempotent at the
    /// process level.
    pub fn stop(self) {
        // SAFETY: may marks coroutine cancellation unsafe because the target
        // unwinds at its next scheduling point. The accept loop holds no
        // state that must survive unwinding; the listener socket closes with
        // it, which is exactly the shutdown we want.
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
        info!("Server stopped");
    }

    /// Block until the accept loop exits on its own (it normally never
    /// does).
    ///
    /// # Errors
    ///
    /// Returns an error if the accept coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl HttpServer {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        HttpServer { dispatcher }
    }

    /// Bind the listener and start the accept loop.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to bind to (e.g. `"0.0.0.0:8080"`; port 0 picks an
    ///   ephemeral port)
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound -
    /// fatal at startup by policy.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let listener = TcpListener::bind(addr)?;
        let addr = listener.local_addr()?;
        info!(addr = %addr, "Server listening");

        let dispatcher = self.dispatcher;
        let handle = may::go!(move || {
            accept_loop(&listener, &dispatcher);
        });

        Ok(ServerHandle { addr, handle })
    }
}

fn accept_loop(listener: &TcpListener, dispatcher: &Arc<Dispatcher>) {
    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                let dispatcher = Arc::clone(dispatcher);
                let _session = may::go!(move || {
                    ConnectionSession::new(stream, peer, dispatcher).run();
                });
            }
            Err(e) => {
                // Transient accept failures (e.g. fd exhaustion) must not
                // take the listener down.
                error!(error = %e, "Accept error");
            }
        }
    }
}
