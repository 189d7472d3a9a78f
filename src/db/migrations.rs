use rusqlite::{Connection, Result};
use super::schema::SCHEMA;

pub fn run(conn: &Connection) -> Result<()> {
    // WAL lets the sampler write while the CLI thread reads.
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
