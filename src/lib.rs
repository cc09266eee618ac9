//! # tunedeck
//!
//! **tunedeck** is the coroutine-powered HTTP backend for a music playback service,
//! built on the [`may`](https://docs.rs/may) runtime.
//!
//! ## Overview
//!
//! The crate is three things layered on top of each other:
//!
//! - A small HTTP/1.1 server: a listening coroutine accepts connections and spawns
//!   one session coroutine per connection, which reads a request, dispatches it,
//!   writes the response, and loops while the connection is kept alive.
//! - An ordered, parameterized path router and a dispatcher that converts handler
//!   faults into well-formed error responses instead of dead connections.
//! - A bounded, blocking connection pool that lends MySQL connections to handlers
//!   through an RAII guard, lazily re-validating each connection at acquisition.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`server`]** - Listener, per-connection session state machine, wire types
//! - **[`router`]** - Ordered path matching with `:name` capture segments
//! - **[`dispatcher`]** - Handler registry and the fault boundary around handlers
//! - **[`pool`]** - Bounded connection pool with blocking acquisition and recovery
//! - **[`db`]** - MySQL connection factory and data-access stores
//! - **[`handlers`]** - Business endpoints (users, playlists, play history)
//! - **[`auth`]** - Password hashing and bearer-token issuance/verification
//! - **[`config`]** - JSON configuration file loading
//!
//! ## Request Handling Flow
//!
//! ```text
//! accept -> ConnectionSession::run (one coroutine per connection)
//!            |  read one HTTP/1.1 message
//!            v
//!          Dispatcher::dispatch
//!            |  first matching route in registration order
//!            v
//!          Handler::handle
//!            |  Pool::acquire -> PoolGuard -> SQL -> guard drop releases
//!            v
//!          HandlerResponse -> serialized and flushed on the session socket
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tunedeck::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
//! use tunedeck::server::HttpServer;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.add_route(http::Method::GET, "/ping", "ping", |_req: &HandlerRequest| {
//!     Ok(HandlerResponse::json(200, serde_json::json!({ "pong": true })))
//! });
//!
//! let server = HttpServer::new(Arc::new(dispatcher));
//! let handle = server.start("127.0.0.1:8080").expect("bind failed");
//! handle.join().expect("server failed");
//! ```
//!
//! ## Runtime Considerations
//!
//! tunedeck uses the `may` coroutine runtime, not tokio or async-std. This means:
//!
//! - Every session runs in a coroutine (lightweight thread); a fixed pool of
//!   worker threads drives all of them
//! - Handlers run synchronously on whichever worker resumes the session, so they
//!   must not block for unbounded time
//! - Pool acquisition is the one deliberate blocking point, bounded by its timeout
//! - Stack size is configurable via the `TUNEDECK_STACK_SIZE` environment variable

pub mod auth;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod handlers;
pub mod ids;
pub mod models;
pub mod pool;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use config::AppConfig;
pub use dispatcher::{Dispatcher, HandlerError, HandlerRequest, HandlerResponse};
pub use pool::{ConnectionFactory, Pool, PoolError, PoolGuard};
pub use router::{RouteMatch, Router};
pub use server::{HttpServer, ServerHandle};
