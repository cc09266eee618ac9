//! # Dispatcher Module
//!
//! The dispatcher owns the routing table and the registry of business
//! handlers, and forms the fault boundary between business logic and the
//! connection session.
//!
//! ## Request Flow
//!
//! 1. A session hands the dispatcher one parsed request
//! 2. The router finds the first matching route in registration order
//! 3. Captured path parameters are attached to the request
//! 4. The handler runs synchronously on the session's coroutine
//! 5. The handler's response - or a synthesized 404/500 - goes back to the session
//!
//! ## Error Handling
//!
//! Exactly one response comes back for every request:
//! - No matching route returns a 404 response
//! - A handler returning `Err(HandlerError)` is logged and becomes a 500
//! - A handler panic is caught and becomes a 500
//!
//! Nothing a handler does can kill the connection or the process; transport
//! faults are the session's business, not the dispatcher's.

mod core;

pub use core::{
    Handler, HandlerError, HandlerRequest, HandlerResponse, HandlerResult, HeaderVec,
    Dispatcher, MAX_INLINE_HEADERS,
};
