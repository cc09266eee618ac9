//! # Router Module
//!
//! Path matching and route resolution. Routes are registered once at startup
//! as `(method, pattern)` pairs and compiled into regexes; matching scans the
//! compiled list in registration order, so the first registered route wins
//! when patterns overlap.
//!
//! ## Patterns
//!
//! A pattern is a `/`-separated path whose segments are either literals or
//! `:name` captures:
//!
//! - `/playlists` matches exactly `/playlists`
//! - `/playlists/:id/songs` matches `/playlists/42/songs` with `id = "42"`
//!
//! Matching ignores a trailing slash and any query component of the request
//! path.
//!
//! ## Concurrency
//!
//! The routing table is immutable after startup and is read concurrently by
//! every session without locking.

mod core;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
