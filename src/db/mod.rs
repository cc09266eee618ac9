//! # Database Module
//!
//! MySQL integration: the [`ConnectionFactory`] implementation that plugs
//! MySQL into the [connection pool](crate::pool), and the per-table stores.
//!
//! Stores are namespaces of associated functions over a borrowed
//! `&mut mysql::Conn`. The connection comes from a handler-held
//! [`PoolGuard`](crate::pool::PoolGuard), so one request does all of its
//! queries on one loan and the loan ends when the handler returns.

mod history;
mod playlists;
mod users;

pub use history::HistoryStore;
pub use playlists::PlaylistStore;
pub use users::UserStore;

use crate::config::DatabaseConfig;
use crate::pool::{ConnectionFactory, Pool, PoolGuard};
use mysql::{Conn, Opts, OptsBuilder};

/// The production pool type.
pub type DbPool = Pool<MySqlFactory>;

/// A handler's loan of one MySQL connection.
pub type DbGuard<'a> = PoolGuard<'a, MySqlFactory>;

/// Establishes MySQL connections for the pool.
pub struct MySqlFactory {
    opts: Opts,
}

impl MySqlFactory {
    #[must_use]
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let builder = OptsBuilder::new()
            .ip_or_hostname(Some(config.host.clone()))
            .tcp_port(config.port)
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            .db_name(Some(config.dbname.clone()));
        MySqlFactory {
            opts: Opts::from(builder),
        }
    }
}

impl ConnectionFactory for MySqlFactory {
    type Conn = Conn;

    fn connect(&self) -> anyhow::Result<Conn> {
        let conn = Conn::new(self.opts.clone())?;
        Ok(conn)
    }

    /// COM_PING round trip; detects half-dead connections dropped by the
    /// server (wait_timeout, restarts) while they sat idle.
    fn is_valid(&self, conn: &mut Conn) -> bool {
        conn.ping().is_ok()
    }
}
