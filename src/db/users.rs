//! User table access.

use crate::models::User;
use mysql::prelude::Queryable;
use mysql::Conn;

type UserRow = (
    u64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

const USER_COLUMNS: &str = "id, username, passwd_hash, email, qq_id, netease_id, \
                            DATE_FORMAT(create_at, '%Y-%m-%d %H:%i:%s')";

fn from_row(row: UserRow) -> User {
    let (id, username, passwd_hash, email, qq_id, netease_id, create_at) = row;
    User {
        id,
        username,
        email,
        passwd_hash,
        qq_id,
        netease_id,
        create_at,
    }
}

pub struct UserStore;

impl UserStore {
    /// Insert a new user and return its id.
    pub fn insert(
        conn: &mut Conn,
        username: &str,
        passwd_hash: &str,
        email: &str,
    ) -> Result<u64, mysql::Error> {
        conn.exec_drop(
            "INSERT INTO users (username, passwd_hash, email) VALUES (?, ?, ?)",
            (username, passwd_hash, email),
        )?;
        Ok(conn.last_insert_id())
    }

    pub fn by_id(conn: &mut Conn, id: u64) -> Result<Option<User>, mysql::Error> {
        let row: Option<UserRow> = conn.exec_first(
            format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
            (id,),
        )?;
        Ok(row.map(from_row))
    }

    /// Look a user up by either login identifier.
    pub fn by_username_or_email(
        conn: &mut Conn,
        needle: &str,
    ) -> Result<Option<User>, mysql::Error> {
        let row: Option<UserRow> = conn.exec_first(
            format!("SELECT {USER_COLUMNS} FROM users WHERE username = ? OR email = ?"),
            (needle, needle),
        )?;
        Ok(row.map(from_row))
    }

    /// Replace a user's password digest. Returns whether a row changed.
    pub fn update_password(
        conn: &mut Conn,
        id: u64,
        passwd_hash: &str,
    ) -> Result<bool, mysql::Error> {
        conn.exec_drop(
            "UPDATE users SET passwd_hash = ? WHERE id = ?",
            (passwd_hash, id),
        )?;
        Ok(conn.affected_rows() > 0)
    }

    /// Update profile fields. Returns whether a row changed.
    pub fn update(
        conn: &mut Conn,
        id: u64,
        username: &str,
        email: &str,
        qq_id: Option<&str>,
        netease_id: Option<&str>,
    ) -> Result<bool, mysql::Error> {
        conn.exec_drop(
            "UPDATE users SET username = ?, email = ?, qq_id = ?, netease_id = ? WHERE id = ?",
            (username, email, qq_id, netease_id, id),
        )?;
        Ok(conn.affected_rows() > 0)
    }
}
