use crate::db::ActivityStore;
use crate::error::AppError;
use crate::models::{ActivityRecord, DailyCount};
use log::error;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityReport {
    pub days: Vec<DailyCount>,
    pub total_samples: i64,
    pub busiest_day: Option<DailyCount>,
}

/// Sample counts per calendar day, oldest first.
pub fn daily_counts(store: &dyn ActivityStore) -> Result<Vec<DailyCount>, AppError> {
    store.daily_counts().map_err(|e| {
        error!("Failed to load daily counts: {e}");
        e
    })
}

/// The latest `limit` samples, newest first.
pub fn recent_activity(
    store: &dyn ActivityStore,
    limit: usize,
) -> Result<Vec<ActivityRecord>, AppError> {
    store.recent_activity(limit).map_err(|e| {
        error!("Failed to load recent activity: {e}");
        e
    })
}

pub fn activity_report(store: &dyn ActivityStore) -> Result<ActivityReport, AppError> {
    let days = daily_counts(store)?;
    let total_samples = days.iter().map(|d| d.count).sum();
    // On ties the earliest day wins.
    let busiest_day = days
        .iter()
        .rev()
        .max_by_key(|d| d.count)
        .cloned();

    Ok(ActivityReport {
        days,
        total_samples,
        busiest_day,
    })
}
