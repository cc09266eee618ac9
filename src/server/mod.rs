//! # Server Module
//!
//! The transport layer: a listening coroutine that accepts TCP connections,
//! and a per-connection session coroutine that drives the
//! read → dispatch → write cycle.
//!
//! ## Session discipline
//!
//! Each accepted socket is owned by exactly one [`session::ConnectionSession`],
//! which is driven by exactly one coroutine. Many sessions run concurrently
//! across the `may` scheduler's worker threads, but no two stages of the same
//! session ever execute concurrently, so session state needs no locking.
//!
//! ## Lifecycle
//!
//! [`HttpServer::start`] binds the listener and returns a [`ServerHandle`].
//! `wait_ready()` polls until the listener accepts, `stop()` cancels the
//! accept loop and joins it, `join()` blocks until the server exits on its
//! own (it normally never does).

pub mod http_server;
pub mod request;
pub mod response;
pub mod session;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{HttpRequest, ReadError, ReadOutcome};
pub use response::write_response;
