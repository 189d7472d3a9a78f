use crate::db::{migrations, with_connection, Database};
use crate::error::AppError;
use crate::models::{ActivityRecord, DailyCount, FocusSettings};
use std::path::PathBuf;

/// Persistence used by the sampler, the focus controller and reporting.
///
/// Implementations must be usable from several threads at once.
pub trait ActivityStore: Send + Sync {
    fn log_activity(&self, timestamp: &str, window_title: &str) -> Result<i64, AppError>;

    /// Validate and insert a new settings row, which becomes the active one.
    fn save_focus_settings(
        &self,
        start_time: &str,
        end_time: &str,
        blocked_apps: &str,
        blocked_websites: &str,
    ) -> Result<FocusSettings, AppError>;

    fn latest_focus_settings(&self) -> Result<Option<FocusSettings>, AppError>;

    fn daily_counts(&self) -> Result<Vec<DailyCount>, AppError>;

    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityRecord>, AppError>;
}

/// SQLite-backed store. Holds only the path; each call opens its own
/// connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let db = Database::open(&path)?;
        migrations::run(db.connection())?;
        log::debug!("Activity store ready at {}", path.display());
        Ok(Self { path })
    }
}

impl ActivityStore for SqliteStore {
    fn log_activity(&self, timestamp: &str, window_title: &str) -> Result<i64, AppError> {
        let mut record = ActivityRecord::new(timestamp, window_title);
        with_connection(&self.path, "log activity", |conn| record.save(conn))?;
        record
            .id
            .ok_or(AppError::NotFound { entity: "Activity record id" })
    }

    fn save_focus_settings(
        &self,
        start_time: &str,
        end_time: &str,
        blocked_apps: &str,
        blocked_websites: &str,
    ) -> Result<FocusSettings, AppError> {
        let mut settings =
            FocusSettings::parse(start_time, end_time, blocked_apps, blocked_websites)?;
        with_connection(&self.path, "save focus settings", |conn| settings.save(conn))?;
        Ok(settings)
    }

    fn latest_focus_settings(&self) -> Result<Option<FocusSettings>, AppError> {
        with_connection(&self.path, "load focus settings", FocusSettings::find_latest)
    }

    fn daily_counts(&self) -> Result<Vec<DailyCount>, AppError> {
        with_connection(&self.path, "count daily activity", ActivityRecord::daily_counts)
    }

    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityRecord>, AppError> {
        with_connection(&self.path, "load recent activity", |conn| {
            ActivityRecord::find_recent(conn, limit)
        })
    }
}
