pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    window_title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS focus_settings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    blocked_apps TEXT NOT NULL DEFAULT '',
    blocked_websites TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_activity_log_timestamp ON activity_log(timestamp);
";

pub const TABLES: &[&str] = &["activity_log", "focus_settings"];
