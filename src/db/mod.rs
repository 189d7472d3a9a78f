pub mod schema;
pub mod migrations;
pub mod helpers;
pub mod store;
pub use helpers::with_connection;
pub use store::{ActivityStore, SqliteStore};

use rusqlite::{Connection, Result};
use std::path::Path;
use std::time::Duration;

/// How long a connection waits on a locked database before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
