//! Play-history endpoints.

use super::{path_id, AppState};
use crate::db::HistoryStore;
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use crate::models::PlayEntry;
use serde_json::json;
use tracing::info;

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;

/// `GET /history?limit=&offset=`
pub fn list(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };

    let limit = req
        .get_query_param("limit")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    let offset = req
        .get_query_param("offset")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let mut conn = state.db()?;
    let entries = HistoryStore::by_user(&mut conn, claims.uid, limit, offset)?;
    let total = HistoryStore::total_plays(&mut conn, claims.uid)?;

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "total": total, "history": entries }),
    ))
}

/// `POST /history`
pub fn record(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };

    let (Some(song_id), Some(song_name), Some(song_singer), Some(song_source)) = (
        req.body_str("song_id"),
        req.body_str("song_name"),
        req.body_str("song_singer"),
        req.body_str("song_source"),
    ) else {
        return Ok(HandlerResponse::error(
            400,
            "Missing song_id, song_name, song_singer or song_source",
        ));
    };

    let entry = PlayEntry {
        user_id: claims.uid,
        song_id: song_id.to_string(),
        song_name: song_name.to_string(),
        song_singer: song_singer.to_string(),
        song_pic: req.body_str("song_pic").map(str::to_string),
        song_source: song_source.to_string(),
        ..PlayEntry::default()
    };

    let mut conn = state.db()?;
    HistoryStore::record(&mut conn, &entry)?;

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "message": "Play recorded" }),
    ))
}

/// `DELETE /history/:id`
pub fn delete_entry(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };
    let id = match path_id(req, "id") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let mut conn = state.db()?;
    if !HistoryStore::delete(&mut conn, id, claims.uid)? {
        return Ok(HandlerResponse::error(404, "History entry not found"));
    }

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "message": "History entry deleted" }),
    ))
}

/// `DELETE /history`
pub fn clear(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };

    let mut conn = state.db()?;
    let removed = HistoryStore::clear(&mut conn, claims.uid)?;
    info!(user_id = claims.uid, removed = removed, "Play history cleared");

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "removed": removed }),
    ))
}
