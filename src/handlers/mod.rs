//! # Handlers Module
//!
//! Business endpoints, registered with the dispatcher at startup. Every
//! handler is a pure `(request) -> response` function over [`AppState`]: it
//! borrows a database connection through the pool for at most its own
//! lifetime and never touches the transport.

pub mod history;
pub mod playlists;
pub mod users;

use crate::auth::TokenCodec;
use crate::db::{DbGuard, DbPool};
use crate::dispatcher::{Dispatcher, HandlerError, HandlerRequest, HandlerResponse, HandlerResult};
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Shared, immutable dependencies injected into every handler.
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub tokens: TokenCodec,
    /// Timeout applied to each pool acquisition.
    pub acquire_timeout: Duration,
}

impl AppState {
    /// Borrow a database connection for the duration of one handler call.
    ///
    /// Pool exhaustion and shutdown become handler faults here; the
    /// dispatch boundary turns them into 500 responses.
    pub fn db(&self) -> Result<DbGuard<'_>, HandlerError> {
        self.pool.acquire(self.acquire_timeout).map_err(|e| {
            warn!(error = %e, "Database connection unavailable");
            HandlerError::from(e)
        })
    }
}

/// Service banner, mirroring the original landing response.
fn banner(_req: &HandlerRequest) -> HandlerResult {
    Ok(HandlerResponse::json(
        200,
        serde_json::json!({ "code": 200, "message": "Welcome to tunedeck!" }),
    ))
}

/// Liveness probe.
fn health(_req: &HandlerRequest) -> HandlerResult {
    Ok(HandlerResponse::json(
        200,
        serde_json::json!({ "status": "ok" }),
    ))
}

/// Register every route, in priority order.
pub fn register_all(dispatcher: &mut Dispatcher, state: Arc<AppState>) {
    dispatcher.add_route(Method::GET, "/", "banner", banner);
    dispatcher.add_route(Method::POST, "/", "banner_post", banner);
    dispatcher.add_route(Method::GET, "/health", "health", health);

    route(dispatcher, &state, Method::POST, "/users/register", "register_user", users::register);
    route(dispatcher, &state, Method::POST, "/users/login", "login_user", users::login);
    route(dispatcher, &state, Method::GET, "/users/:id", "get_user", users::get_profile);
    route(dispatcher, &state, Method::PUT, "/users/:id", "update_user", users::update_profile);
    route(dispatcher, &state, Method::PUT, "/users/:id/password", "update_password", users::update_password);

    route(dispatcher, &state, Method::GET, "/playlists", "list_playlists", playlists::list);
    route(dispatcher, &state, Method::POST, "/playlists", "create_playlist", playlists::create);
    route(dispatcher, &state, Method::DELETE, "/playlists/:id", "delete_playlist", playlists::delete);
    route(dispatcher, &state, Method::GET, "/playlists/:id/songs", "list_playlist_songs", playlists::songs);
    route(dispatcher, &state, Method::POST, "/playlists/:id/songs", "add_playlist_song", playlists::add_song);
    route(dispatcher, &state, Method::DELETE, "/playlists/:id/songs/:song_id", "remove_playlist_song", playlists::remove_song);

    route(dispatcher, &state, Method::GET, "/history", "list_history", history::list);
    route(dispatcher, &state, Method::POST, "/history", "record_play", history::record);
    route(dispatcher, &state, Method::DELETE, "/history/:id", "delete_history_entry", history::delete_entry);
    route(dispatcher, &state, Method::DELETE, "/history", "clear_history", history::clear);
}

/// Bind one state-borrowing handler function to a route.
fn route(
    dispatcher: &mut Dispatcher,
    state: &Arc<AppState>,
    method: Method,
    pattern: &str,
    name: &str,
    handler: fn(&AppState, &HandlerRequest) -> HandlerResult,
) {
    let state = Arc::clone(state);
    dispatcher.add_route(method, pattern, name, move |req: &HandlerRequest| {
        handler(&state, req)
    });
}

/// Parse a numeric path parameter, or produce the 400 a handler should
/// return.
pub(crate) fn path_id(req: &HandlerRequest, name: &str) -> Result<u64, HandlerResponse> {
    req.get_path_param(name)
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or_else(|| HandlerResponse::error(400, "Invalid id"))
}
