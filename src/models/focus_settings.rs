use crate::constants::TIME_FORMAT;
use crate::error::AppError;
use crate::validation::{
    split_list, validate_app_pattern, validate_hostname, validate_time_window,
};
use chrono::NaiveTime;
use rusqlite::types::Type;
use rusqlite::{Connection, Result, Row, params};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

/// A saved focus-mode configuration. Only the most recently inserted row
/// is ever in effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusSettings {
    pub id: Option<i64>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Substrings matched against the focused window title.
    pub blocked_apps: Vec<String>,
    pub blocked_websites: Vec<String>,
}

impl FocusSettings {
    /// Build settings from user input, validating every field.
    pub fn parse(
        start_time: &str,
        end_time: &str,
        blocked_apps: &str,
        blocked_websites: &str,
    ) -> std::result::Result<Self, AppError> {
        let (start_time, end_time) = validate_time_window(start_time, end_time)?;

        let blocked_apps = split_list(blocked_apps)
            .iter()
            .map(|app| validate_app_pattern(app).map(str::to_string))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut blocked_websites = split_list(blocked_websites)
            .iter()
            .map(|site| validate_hostname(site))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut seen = HashSet::new();
        blocked_websites.retain(|site| seen.insert(site.clone()));

        Ok(Self {
            id: None,
            start_time,
            end_time,
            blocked_apps,
            blocked_websites,
        })
    }

    pub fn start_time_str(&self) -> String {
        self.start_time.format(TIME_FORMAT).to_string()
    }

    pub fn end_time_str(&self) -> String {
        self.end_time.format(TIME_FORMAT).to_string()
    }

    pub fn blocked_apps_csv(&self) -> String {
        self.blocked_apps.join(",")
    }

    pub fn blocked_websites_csv(&self) -> String {
        self.blocked_websites.join(",")
    }

    /// Check if `time` is within `[start_time, end_time]`, both ends inclusive.
    pub fn is_active_at(&self, time: NaiveTime) -> bool {
        self.start_time <= time && time <= self.end_time
    }

    /// First blocked-app token that is a substring of `title`.
    ///
    /// Matching is case-sensitive and unanchored, so short tokens can hit
    /// unrelated titles.
    pub fn matching_app(&self, title: &str) -> Option<&str> {
        self.blocked_apps
            .iter()
            .map(String::as_str)
            .find(|app| title.contains(app))
    }

    /// Time left until `end_time`, or `None` once it has passed.
    pub fn remaining_at(&self, now: NaiveTime) -> Option<Duration> {
        let left = self.end_time.signed_duration_since(now);
        left.to_std().ok().filter(|d| !d.is_zero())
    }

    pub fn save(&mut self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO focus_settings (start_time, end_time, blocked_apps, blocked_websites)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                self.start_time_str(),
                self.end_time_str(),
                self.blocked_apps_csv(),
                self.blocked_websites_csv(),
            ],
        )?;
        self.id = Some(conn.last_insert_rowid());
        Ok(())
    }

    /// The most recently inserted settings row, if any.
    pub fn find_latest(conn: &Connection) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, start_time, end_time, blocked_apps, blocked_websites
             FROM focus_settings ORDER BY id DESC LIMIT 1",
        )?;

        let mut rows = stmt.query([])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::from_row(row)?))
        } else {
            Ok(None)
        }
    }

    fn from_row(row: &Row<'_>) -> Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            start_time: parse_time_column(row, 1)?,
            end_time: parse_time_column(row, 2)?,
            blocked_apps: split_list(&row.get::<_, String>(3)?),
            blocked_websites: split_list(&row.get::<_, String>(4)?),
        })
    }
}

fn parse_time_column(row: &Row<'_>, idx: usize) -> Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    NaiveTime::parse_from_str(&raw, TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_creates_settings() {
        let settings =
            FocusSettings::parse("09:00", "17:00", "app1, app2", "Site1.com,site2.com").unwrap();

        assert!(settings.id.is_none());
        assert_eq!(settings.start_time_str(), "09:00");
        assert_eq!(settings.end_time_str(), "17:00");
        assert_eq!(settings.blocked_apps, vec!["app1", "app2"]);
        assert_eq!(settings.blocked_websites, vec!["site1.com", "site2.com"]);
    }

    #[test]
    fn test_parse_rejects_invalid_input() {
        assert!(FocusSettings::parse("9am", "17:00", "", "").is_err());
        assert!(FocusSettings::parse("17:00", "09:00", "", "").is_err());
        assert!(FocusSettings::parse("09:00", "17:00", "", "not a host").is_err());
    }

    #[test]
    fn test_empty_lists_block_nothing() {
        let settings = FocusSettings::parse("09:00", "17:00", "", "").unwrap();
        assert!(settings.blocked_apps.is_empty());
        assert!(settings.matching_app("anything").is_none());
    }

    #[test]
    fn test_save_and_find_latest() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();

        assert!(FocusSettings::find_latest(conn).unwrap().is_none());

        let mut first = FocusSettings::parse("09:00", "12:00", "slack", "x.com").unwrap();
        first.save(conn).unwrap();
        let mut second = FocusSettings::parse("13:00", "17:00", "chrome.exe", "youtube.com").unwrap();
        second.save(conn).unwrap();

        let latest = FocusSettings::find_latest(conn).unwrap().unwrap();
        assert_eq!(latest, second);
    }

    #[test]
    fn test_find_latest_with_corrupt_time_is_error() {
        let (db, _dir) = setup_test_db();
        let conn = db.connection();
        conn.execute(
            "INSERT INTO focus_settings (start_time, end_time, blocked_apps, blocked_websites)
             VALUES ('soon', '17:00', '', '')",
            [],
        )
        .unwrap();

        assert!(FocusSettings::find_latest(conn).is_err());
    }

    #[test]
    fn test_is_active_at_is_inclusive() {
        let settings = FocusSettings::parse("09:00", "17:00", "chrome.exe", "x.com").unwrap();

        assert!(settings.is_active_at(hm(9, 0)));
        assert!(settings.is_active_at(hm(12, 0)));
        assert!(settings.is_active_at(hm(17, 0)));
        assert!(!settings.is_active_at(hm(8, 59)));
        assert!(!settings.is_active_at(hm(20, 0)));
    }

    #[test]
    fn test_matching_app_is_substring() {
        let settings = FocusSettings::parse("09:00", "17:00", "chrome.exe,slack", "").unwrap();

        assert_eq!(settings.matching_app("chrome.exe - Tab"), Some("chrome.exe"));
        assert_eq!(settings.matching_app("#general | slack"), Some("slack"));
        assert_eq!(settings.matching_app("Terminal"), None);
        assert_eq!(settings.matching_app("Chrome.exe - Tab"), None);
    }

    #[test]
    fn test_remaining_at() {
        let settings = FocusSettings::parse("09:00", "17:00", "", "").unwrap();

        assert_eq!(settings.remaining_at(hm(16, 30)), Some(Duration::from_secs(30 * 60)));
        assert_eq!(settings.remaining_at(hm(17, 0)), None);
        assert_eq!(settings.remaining_at(hm(20, 0)), None);
    }
}
