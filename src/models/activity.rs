use rusqlite::{Connection, Result, params};
use serde::Serialize;

/// One sample of the focused window, as stored in `activity_log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    pub id: Option<i64>,
    pub timestamp: String,
    pub window_title: String,
}

/// Number of samples recorded on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// `YYYY-MM-DD`
    pub date: String,
    pub count: i64,
}

impl ActivityRecord {
    pub fn new(timestamp: &str, window_title: &str) -> Self {
        Self {
            id: None,
            timestamp: timestamp.to_string(),
            window_title: window_title.to_string(),
        }
    }

    pub fn save(&mut self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO activity_log (timestamp, window_title) VALUES (?1, ?2)",
            params![self.timestamp, self.window_title],
        )?;
        self.id = Some(conn.last_insert_rowid());
        Ok(())
    }

    /// Latest records first.
    pub fn find_recent(conn: &Connection, limit: usize) -> Result<Vec<Self>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, window_title FROM activity_log
             ORDER BY id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit], |row| {
            Ok(Self {
                id: Some(row.get(0)?),
                timestamp: row.get(1)?,
                window_title: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    /// Samples grouped by the date part of their timestamp, oldest day first.
    pub fn daily_counts(conn: &Connection) -> Result<Vec<DailyCount>> {
        let mut stmt = conn.prepare(
            "SELECT substr(timestamp, 1, 10) AS day, COUNT(window_title)
             FROM activity_log GROUP BY day ORDER BY day",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(DailyCount {
                date: row.get(0)?,
                count: row.get(1)?,
            })
        })?;

        rows.collect()
    }
}
