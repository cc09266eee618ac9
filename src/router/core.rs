//! Router core - hot path for request routing.

use http::Method;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path parameters before heap allocation.
/// The registered route set tops out at two captures
/// (`/playlists/:id/songs/:song_id`), so eight leaves ample headroom.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` instead of `String` because names come from the
/// static route table (known at startup) and `Arc::clone()` is O(1); values
/// remain `String` as they are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of successfully matching a request path to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Name of the handler that should process this request
    pub handler_name: Arc<str>,
    /// Path parameters extracted from the URL (e.g., `:id` -> `("id", "42")`)
    pub path_params: ParamVec,
}

struct RouteEntry {
    method: Method,
    pattern: Regex,
    param_names: Vec<Arc<str>>,
    handler_name: Arc<str>,
}

/// Router that matches HTTP requests to handler names.
///
/// Registration order defines match priority: the first registered route
/// whose method and pattern both match wins. The table is append-only during
/// startup and immutable afterwards.
#[derive(Default)]
pub struct Router {
    routes: Vec<RouteEntry>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Router { routes: Vec::new() }
    }

    /// Register a route. `pattern` is a literal path, optionally containing
    /// `:name` capture segments.
    ///
    /// # Panics
    ///
    /// Panics if the compiled pattern is not a valid regex; patterns are
    /// static strings written at startup, so this is a programming error.
    pub fn add_route(&mut self, method: Method, pattern: &str, handler_name: &str) {
        let (regex, param_names) = Self::path_to_regex(pattern);
        info!(
            method = %method,
            pattern = %pattern,
            handler_name = %handler_name,
            position = self.routes.len(),
            "Route registered"
        );
        self.routes.push(RouteEntry {
            method,
            pattern: regex,
            param_names,
            handler_name: Arc::from(handler_name),
        });
    }

    /// Match an HTTP request against the registered routes.
    ///
    /// The query component and a trailing slash on `path` are ignored.
    /// Returns `None` if no route matches (a 404 at the dispatch boundary).
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let path = normalize_path(path);

        for entry in &self.routes {
            if entry.method != *method {
                continue;
            }
            let Some(captures) = entry.pattern.captures(path) else {
                continue;
            };

            let mut path_params = ParamVec::new();
            for (i, name) in entry.param_names.iter().enumerate() {
                if let Some(value) = captures.get(i + 1) {
                    path_params.push((Arc::clone(name), value.as_str().to_string()));
                }
            }

            debug!(
                method = %method,
                path = %path,
                handler_name = %entry.handler_name,
                path_params = ?path_params,
                "Route matched"
            );

            return Some(RouteMatch {
                handler_name: Arc::clone(&entry.handler_name),
                path_params,
            });
        }

        debug!(method = %method, path = %path, "No route matched");
        None
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Convert a `:name` path pattern to an anchored regex and the ordered
    /// list of capture names.
    pub(crate) fn path_to_regex(path: &str) -> (Regex, Vec<Arc<str>>) {
        if path == "/" {
            return (
                Regex::new(r"^/$").expect("failed to compile path regex"),
                Vec::new(),
            );
        }

        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names: Vec<Arc<str>> = Vec::new();

        for segment in path.split('/') {
            if let Some(name) = segment.strip_prefix(':') {
                pattern.push_str("/([^/]+)");
                param_names.push(Arc::from(name));
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        let regex = Regex::new(&pattern).expect("failed to compile path regex");

        (regex, param_names)
    }
}

/// Strip the query component and any trailing slash (except for the root).
fn normalize_path(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or("/");
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}
