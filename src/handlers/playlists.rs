//! Playlist endpoints.

use super::{path_id, AppState};
use crate::db::PlaylistStore;
use crate::dispatcher::{HandlerRequest, HandlerResponse, HandlerResult};
use crate::models::{Playlist, Song};
use mysql::Conn;
use serde_json::json;
use tracing::info;

/// Fetch a playlist and check the caller owns it. 404 for a missing
/// playlist, 401 for someone else's.
fn owned_playlist(
    conn: &mut Conn,
    playlist_id: u64,
    user_id: u64,
) -> Result<Result<Playlist, HandlerResponse>, mysql::Error> {
    match PlaylistStore::by_id(conn, playlist_id)? {
        None => Ok(Err(HandlerResponse::error(404, "Playlist not found"))),
        Some(playlist) if playlist.user_id != user_id => {
            Ok(Err(HandlerResponse::error(401, "Not the playlist owner")))
        }
        Some(playlist) => Ok(Ok(playlist)),
    }
}

/// `GET /playlists`
pub fn list(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };

    let mut conn = state.db()?;
    let playlists = PlaylistStore::by_user(&mut conn, claims.uid)?;

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "playlists": playlists }),
    ))
}

/// `POST /playlists`
pub fn create(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };
    let Some(name) = req.body_str("name") else {
        return Ok(HandlerResponse::error(400, "Missing playlist name"));
    };

    let mut conn = state.db()?;
    let playlist_id =
        PlaylistStore::insert(&mut conn, claims.uid, name, req.body_str("cover"))?;
    info!(user_id = claims.uid, playlist_id = playlist_id, "Playlist created");

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "playlist_id": playlist_id }),
    ))
}

/// `DELETE /playlists/:id`
pub fn delete(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };
    let playlist_id = match path_id(req, "id") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let mut conn = state.db()?;
    if let Err(response) = owned_playlist(&mut conn, playlist_id, claims.uid)? {
        return Ok(response);
    }

    PlaylistStore::delete(&mut conn, playlist_id)?;
    info!(user_id = claims.uid, playlist_id = playlist_id, "Playlist deleted");

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "message": "Playlist deleted" }),
    ))
}

/// `GET /playlists/:id/songs`
pub fn songs(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };
    let playlist_id = match path_id(req, "id") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let mut conn = state.db()?;
    if let Err(response) = owned_playlist(&mut conn, playlist_id, claims.uid)? {
        return Ok(response);
    }

    let songs = PlaylistStore::songs(&mut conn, playlist_id)?;
    let count = PlaylistStore::song_count(&mut conn, playlist_id)?;

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "count": count, "songs": songs }),
    ))
}

/// `POST /playlists/:id/songs`
pub fn add_song(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };
    let playlist_id = match path_id(req, "id") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    let (Some(song_id), Some(name), Some(singer), Some(source)) = (
        req.body_str("song_id"),
        req.body_str("name"),
        req.body_str("singer"),
        req.body_str("source"),
    ) else {
        return Ok(HandlerResponse::error(
            400,
            "Missing song_id, name, singer or source",
        ));
    };

    let mut conn = state.db()?;
    if let Err(response) = owned_playlist(&mut conn, playlist_id, claims.uid)? {
        return Ok(response);
    }

    let song = Song {
        song_id: song_id.to_string(),
        name: name.to_string(),
        singer: singer.to_string(),
        pic: req.body_str("pic").map(str::to_string),
        source: source.to_string(),
        ..Song::default()
    };
    let id = PlaylistStore::add_song(&mut conn, playlist_id, &song)?;

    Ok(HandlerResponse::json(200, json!({ "code": 200, "id": id })))
}

/// `DELETE /playlists/:id/songs/:song_id`
pub fn remove_song(state: &AppState, req: &HandlerRequest) -> HandlerResult {
    let claims = match state.tokens.authenticate(req) {
        Ok(claims) => claims,
        Err(response) => return Ok(response),
    };
    let playlist_id = match path_id(req, "id") {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let Some(song_id) = req.get_path_param("song_id") else {
        return Ok(HandlerResponse::error(400, "Invalid id"));
    };

    let mut conn = state.db()?;
    if let Err(response) = owned_playlist(&mut conn, playlist_id, claims.uid)? {
        return Ok(response);
    }

    if !PlaylistStore::remove_song(&mut conn, playlist_id, song_id)? {
        return Ok(HandlerResponse::error(404, "Song not in playlist"));
    }

    Ok(HandlerResponse::json(
        200,
        json!({ "code": 200, "message": "Song removed" }),
    ))
}
