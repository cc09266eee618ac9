//! Domain records exchanged between the stores and the handlers.

use serde::Serialize;

/// A registered account.
#[derive(Debug, Clone, Serialize, Default)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    /// Hex-encoded password digest; never serialized into responses.
    #[serde(skip_serializing)]
    pub passwd_hash: String,
    pub qq_id: Option<String>,
    pub netease_id: Option<String>,
    pub create_at: Option<String>,
}

/// A user-owned playlist.
#[derive(Debug, Clone, Serialize, Default)]
pub struct Playlist {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub cover: Option<String>,
    pub create_at: Option<String>,
}

/// One song entry inside a playlist.
///
/// `song_id` and `source` identify the track on its upstream provider; the
/// rest is display metadata captured at insert time.
#[derive(Debug, Clone, Serialize, Default)]
pub struct Song {
    pub id: u64,
    pub song_id: String,
    pub name: String,
    pub singer: String,
    pub pic: Option<String>,
    pub source: String,
    pub added_at: Option<String>,
}

/// One play-history entry.
#[derive(Debug, Clone, Serialize, Default)]
pub struct PlayEntry {
    pub id: u64,
    pub user_id: u64,
    pub song_id: String,
    pub song_name: String,
    pub song_singer: String,
    pub song_pic: Option<String>,
    pub song_source: String,
    pub played_at: Option<String>,
    /// How many times this song has been played by this user.
    pub play_count: u64,
}
