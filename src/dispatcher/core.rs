//! Dispatcher core - hot path for request dispatch.

use crate::ids::RequestId;
use crate::router::{ParamVec, Router};
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation.
/// Most requests have well under 16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path.
///
/// Header names use `Arc<str>` because names repeat across requests
/// (`content-type`, `authorization`, ...) and `Arc::clone()` is O(1); values
/// remain `String` as they are per-request data.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// A parsed request as seen by business handlers.
///
/// Path parameters live in their own key space, separate from query
/// parameters and headers, so a capture named `id` can never collide with a
/// query parameter of the same name.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for log correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without the query component
    pub path: String,
    /// Path parameters captured by the matched route
    pub path_params: ParamVec,
    /// Query string parameters
    pub query_params: ParamVec,
    /// HTTP headers (lowercase names)
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
}

impl HandlerRequest {
    /// Get a path parameter by name.
    ///
    /// Uses "last write wins" semantics for duplicate names at different
    /// path depths.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name ("last write wins" for duplicates).
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Fetch a required field from the JSON body as a string.
    pub fn body_str(&self, field: &str) -> Option<&str> {
        self.body.as_ref()?.get(field)?.as_str()
    }
}

/// Response data produced by a handler.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    /// HTTP response headers
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    /// Create a JSON response with default headers.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create an `{"error": message}` response.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Get a header by name.
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// A fault raised by a handler.
///
/// This is not how handlers express business outcomes - a wrong password is
/// a 401 *response*, not an error. `HandlerError` is for the unexpected:
/// pool exhaustion, SQL failures, broken invariants. The dispatcher converts
/// every one of them into a generic 500 and logs the cause.
#[derive(Debug)]
pub struct HandlerError(anyhow::Error);

impl HandlerError {
    /// Construct a fault from a plain message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        HandlerError(anyhow::Error::msg(message))
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl<E: Into<anyhow::Error>> From<E> for HandlerError {
    fn from(err: E) -> Self {
        HandlerError(err.into())
    }
}

/// What a handler invocation produces: a response, or a fault for the
/// dispatcher to absorb.
pub type HandlerResult = Result<HandlerResponse, HandlerError>;

/// A business handler.
///
/// Handlers are pure with respect to the transport: they read the request and
/// return a response value (or fault), and never touch the socket. Any plain
/// `Fn(&HandlerRequest) -> HandlerResult` qualifies.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: &HandlerRequest) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&HandlerRequest) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, req: &HandlerRequest) -> HandlerResult {
        self(req)
    }
}

/// Dispatcher that routes requests to registered handlers.
///
/// Owns the routing table and the handler registry. Built once at startup,
/// then shared immutably across all sessions - no locking on the request
/// path.
#[derive(Default)]
pub struct Dispatcher {
    router: Router,
    handlers: HashMap<Arc<str>, Arc<dyn Handler>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Dispatcher {
            router: Router::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register a route and its handler in one step.
    ///
    /// Registration order defines match priority. If a handler with the same
    /// name already exists it is replaced; the route entries both stay, so
    /// the earlier pattern still shadows the later one.
    pub fn add_route<H: Handler>(
        &mut self,
        method: Method,
        pattern: &str,
        name: &str,
        handler: H,
    ) {
        if self
            .handlers
            .insert(Arc::from(name), Arc::new(handler))
            .is_some()
        {
            warn!(handler_name = %name, "Replaced existing handler");
        }
        self.router.add_route(method, pattern, name);
    }

    /// Number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.router.len()
    }

    /// Dispatch a request, producing exactly one response.
    ///
    /// Matches the request against the routing table, attaches captured path
    /// parameters, and invokes the handler. Handler faults (errors and
    /// panics) are absorbed here and converted into 500 responses; an
    /// unmatched route produces a 404.
    #[must_use]
    pub fn dispatch(&self, req: &mut HandlerRequest) -> HandlerResponse {
        let Some(route_match) = self.router.route(&req.method, &req.path) else {
            debug!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                "No route matched"
            );
            return HandlerResponse::error(404, "Not found");
        };

        req.path_params = route_match.path_params;

        let Some(handler) = self.handlers.get(&route_match.handler_name) else {
            // A route without a handler is a registration bug, not a client error.
            error!(
                handler_name = %route_match.handler_name,
                "Route matched but no handler is registered"
            );
            return HandlerResponse::error(500, "Internal server error");
        };

        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            handler_name = %route_match.handler_name,
            "Request dispatched to handler"
        );

        let start = Instant::now();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            handler.handle(req)
        }));
        let latency_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(response)) => {
                info!(
                    request_id = %req.request_id,
                    handler_name = %route_match.handler_name,
                    status = response.status,
                    latency_ms = latency_ms,
                    "Handler response"
                );
                response
            }
            Ok(Err(fault)) => {
                error!(
                    request_id = %req.request_id,
                    handler_name = %route_match.handler_name,
                    latency_ms = latency_ms,
                    fault = %fault,
                    "Handler fault"
                );
                HandlerResponse::error(500, "Internal server error")
            }
            Err(panic) => {
                error!(
                    request_id = %req.request_id,
                    handler_name = %route_match.handler_name,
                    latency_ms = latency_ms,
                    panic = ?panic,
                    "Handler panicked"
                );
                HandlerResponse::error(500, "Internal server error")
            }
        }
    }
}
