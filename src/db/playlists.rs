//! Playlist and playlist-song table access.

use crate::models::{Playlist, Song};
use mysql::prelude::Queryable;
use mysql::Conn;

type PlaylistRow = (u64, u64, String, Option<String>, Option<String>);
type SongRow = (u64, String, String, String, Option<String>, String, Option<String>);

const PLAYLIST_COLUMNS: &str =
    "id, user_id, name, cover, DATE_FORMAT(create_at, '%Y-%m-%d %H:%i:%s')";
const SONG_COLUMNS: &str = "id, song_id, name, singer, pic, source, \
                            DATE_FORMAT(added_at, '%Y-%m-%d %H:%i:%s')";

fn playlist_from_row(row: PlaylistRow) -> Playlist {
    let (id, user_id, name, cover, create_at) = row;
    Playlist {
        id,
        user_id,
        name,
        cover,
        create_at,
    }
}

fn song_from_row(row: SongRow) -> Song {
    let (id, song_id, name, singer, pic, source, added_at) = row;
    Song {
        id,
        song_id,
        name,
        singer,
        pic,
        source,
        added_at,
    }
}

pub struct PlaylistStore;

impl PlaylistStore {
    /// Create a playlist and return its id.
    pub fn insert(
        conn: &mut Conn,
        user_id: u64,
        name: &str,
        cover: Option<&str>,
    ) -> Result<u64, mysql::Error> {
        conn.exec_drop(
            "INSERT INTO playlists (user_id, name, cover) VALUES (?, ?, ?)",
            (user_id, name, cover),
        )?;
        Ok(conn.last_insert_id())
    }

    pub fn by_id(conn: &mut Conn, id: u64) -> Result<Option<Playlist>, mysql::Error> {
        let row: Option<PlaylistRow> = conn.exec_first(
            format!("SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE id = ?"),
            (id,),
        )?;
        Ok(row.map(playlist_from_row))
    }

    pub fn by_user(conn: &mut Conn, user_id: u64) -> Result<Vec<Playlist>, mysql::Error> {
        let rows: Vec<PlaylistRow> = conn.exec(
            format!(
                "SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE user_id = ? ORDER BY create_at"
            ),
            (user_id,),
        )?;
        Ok(rows.into_iter().map(playlist_from_row).collect())
    }

    /// Delete a playlist and its songs. Returns whether the playlist
    /// existed.
    pub fn delete(conn: &mut Conn, id: u64) -> Result<bool, mysql::Error> {
        conn.exec_drop("DELETE FROM playlist_songs WHERE playlist_id = ?", (id,))?;
        conn.exec_drop("DELETE FROM playlists WHERE id = ?", (id,))?;
        Ok(conn.affected_rows() > 0)
    }

    /// Add a song to a playlist and return the row id. Idempotent: a song
    /// already in the playlist (same provider id and source) is left as-is
    /// and its existing row id returned.
    pub fn add_song(conn: &mut Conn, playlist_id: u64, song: &Song) -> Result<u64, mysql::Error> {
        let existing: Option<u64> = conn.exec_first(
            "SELECT id FROM playlist_songs \
             WHERE playlist_id = ? AND song_id = ? AND source = ?",
            (playlist_id, song.song_id.as_str(), song.source.as_str()),
        )?;
        if let Some(id) = existing {
            return Ok(id);
        }

        conn.exec_drop(
            "INSERT INTO playlist_songs (playlist_id, song_id, name, singer, pic, source) \
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                playlist_id,
                song.song_id.as_str(),
                song.name.as_str(),
                song.singer.as_str(),
                song.pic.as_deref(),
                song.source.as_str(),
            ),
        )?;
        Ok(conn.last_insert_id())
    }

    /// Remove one song (by provider id and source) from a playlist.
    /// Returns whether a row was removed.
    pub fn remove_song(
        conn: &mut Conn,
        playlist_id: u64,
        song_id: &str,
    ) -> Result<bool, mysql::Error> {
        conn.exec_drop(
            "DELETE FROM playlist_songs WHERE playlist_id = ? AND song_id = ?",
            (playlist_id, song_id),
        )?;
        Ok(conn.affected_rows() > 0)
    }

    pub fn songs(conn: &mut Conn, playlist_id: u64) -> Result<Vec<Song>, mysql::Error> {
        let rows: Vec<SongRow> = conn.exec(
            format!(
                "SELECT {SONG_COLUMNS} FROM playlist_songs WHERE playlist_id = ? ORDER BY added_at"
            ),
            (playlist_id,),
        )?;
        Ok(rows.into_iter().map(song_from_row).collect())
    }

    pub fn song_count(conn: &mut Conn, playlist_id: u64) -> Result<u64, mysql::Error> {
        let count: Option<u64> = conn.exec_first(
            "SELECT COUNT(*) FROM playlist_songs WHERE playlist_id = ?",
            (playlist_id,),
        )?;
        Ok(count.unwrap_or(0))
    }
}
