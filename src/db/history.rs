//! Play-history table access.

use crate::models::PlayEntry;
use mysql::prelude::Queryable;
use mysql::Conn;

type EntryRow = (
    u64,
    u64,
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    u64,
);

const ENTRY_COLUMNS: &str = "id, user_id, song_id, song_name, song_singer, song_pic, \
                             song_source, DATE_FORMAT(played_at, '%Y-%m-%d %H:%i:%s'), play_count";

fn from_row(row: EntryRow) -> PlayEntry {
    let (id, user_id, song_id, song_name, song_singer, song_pic, song_source, played_at, play_count) =
        row;
    PlayEntry {
        id,
        user_id,
        song_id,
        song_name,
        song_singer,
        song_pic,
        song_source,
        played_at,
        play_count,
    }
}

pub struct HistoryStore;

impl HistoryStore {
    /// Record one play. A repeat play of a known song bumps its counter
    /// instead of inserting a duplicate row.
    pub fn record(conn: &mut Conn, entry: &PlayEntry) -> Result<(), mysql::Error> {
        let existing: Option<(u64, u64)> = conn.exec_first(
            "SELECT id, play_count FROM play_history WHERE user_id = ? AND song_id = ?",
            (entry.user_id, entry.song_id.as_str()),
        )?;

        if let Some((id, play_count)) = existing {
            conn.exec_drop(
                "UPDATE play_history SET play_count = ?, played_at = NOW() WHERE id = ?",
                (play_count + 1, id),
            )?;
            return Ok(());
        }

        conn.exec_drop(
            "INSERT INTO play_history \
             (user_id, song_id, song_name, song_singer, song_pic, song_source, play_count) \
             VALUES (?, ?, ?, ?, ?, ?, 1)",
            (
                entry.user_id,
                entry.song_id.as_str(),
                entry.song_name.as_str(),
                entry.song_singer.as_str(),
                entry.song_pic.as_deref(),
                entry.song_source.as_str(),
            ),
        )?;
        Ok(())
    }

    /// Most recent plays first.
    pub fn by_user(
        conn: &mut Conn,
        user_id: u64,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PlayEntry>, mysql::Error> {
        let rows: Vec<EntryRow> = conn.exec(
            format!(
                "SELECT {ENTRY_COLUMNS} FROM play_history WHERE user_id = ? \
                 ORDER BY played_at DESC LIMIT ? OFFSET ?"
            ),
            (user_id, limit, offset),
        )?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    /// Delete one entry, scoped to its owner. Returns whether a row was
    /// removed.
    pub fn delete(conn: &mut Conn, id: u64, user_id: u64) -> Result<bool, mysql::Error> {
        conn.exec_drop(
            "DELETE FROM play_history WHERE id = ? AND user_id = ?",
            (id, user_id),
        )?;
        Ok(conn.affected_rows() > 0)
    }

    /// Clear a user's whole history. Returns the number of removed rows.
    pub fn clear(conn: &mut Conn, user_id: u64) -> Result<u64, mysql::Error> {
        conn.exec_drop("DELETE FROM play_history WHERE user_id = ?", (user_id,))?;
        Ok(conn.affected_rows())
    }

    pub fn total_plays(conn: &mut Conn, user_id: u64) -> Result<u64, mysql::Error> {
        let count: Option<u64> = conn.exec_first(
            "SELECT COUNT(*) FROM play_history WHERE user_id = ?",
            (user_id,),
        )?;
        Ok(count.unwrap_or(0))
    }
}
