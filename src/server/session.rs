//! Per-connection session state machine.
//!
//! One session per accepted socket, one coroutine per session. The coroutine
//! walks `Reading -> Dispatching -> Writing` and either loops back to
//! `Reading` (keep-alive) or half-closes the socket and ends. Because the
//! single coroutine is the only flow of control that ever touches the
//! session, the state needs no synchronization even though completions are
//! serviced by any scheduler worker.

use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
use crate::ids::RequestId;
use crate::server::request::{read_request, HttpRequest, ReadError, ReadOutcome};
use crate::server::response::write_response;
use may::net::TcpStream;
use std::net::{Shutdown, SocketAddr};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct ConnectionSession {
    stream: TcpStream,
    peer: SocketAddr,
    /// Read buffer; survives across requests on a keep-alive connection so
    /// an eagerly-sent next request is not lost.
    buf: Vec<u8>,
    dispatcher: Arc<Dispatcher>,
}

impl ConnectionSession {
    pub fn new(stream: TcpStream, peer: SocketAddr, dispatcher: Arc<Dispatcher>) -> Self {
        ConnectionSession {
            stream,
            peer,
            buf: Vec::new(),
            dispatcher,
        }
    }

    /// Drive the session until the connection closes.
    ///
    /// Transport faults are local to this session: they are logged (except a
    /// clean end-of-stream, which is silent) and end the session without
    /// touching the process. Exactly one response is written per request
    /// read.
    pub fn run(mut self) {
        info!(peer = %self.peer, "Session opened");

        loop {
            // Reading
            let request = match read_request(&mut self.stream, &mut self.buf) {
                Ok(ReadOutcome::Request(request)) => request,
                Ok(ReadOutcome::Eof) => {
                    debug!(peer = %self.peer, "Session closed by peer");
                    return;
                }
                Err(ReadError::Io(e)) => {
                    error!(peer = %self.peer, error = %e, "Read error");
                    return;
                }
                Err(ReadError::Malformed(msg)) => {
                    error!(peer = %self.peer, error = %msg, "Malformed request");
                    let response = HandlerResponse::error(500, "Internal server error");
                    let _ = write_response(&mut self.stream, &response, false);
                    return;
                }
            };

            let keep_alive = request.keep_alive();
            let mut handler_request = build_handler_request(request);

            // Dispatching: always produces exactly one response.
            let response = self.dispatcher.dispatch(&mut handler_request);

            // Writing
            if let Err(e) = write_response(&mut self.stream, &response, keep_alive) {
                error!(peer = %self.peer, error = %e, "Write error");
                return;
            }

            if !keep_alive {
                let _ = self.stream.shutdown(Shutdown::Write);
                debug!(peer = %self.peer, "Session closed");
                return;
            }
            // Keep-alive: back to Reading with a fresh request.
        }
    }
}

/// Lift a wire request into the dispatcher's request shape.
fn build_handler_request(request: HttpRequest) -> HandlerRequest {
    let request_id = RequestId::from_header_or_new(request.get_header("x-request-id"));
    let query_params = request.query_params();
    let body = request.json_body();
    let path = request.path_only().to_string();
    HandlerRequest {
        request_id,
        method: request.method,
        path,
        path_params: Default::default(),
        query_params,
        headers: request.headers,
        body,
    }
}
