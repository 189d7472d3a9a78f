//! Shared test utilities for deskfocus.
//!
//! Database setup plus in-memory stand-ins for the store, the window probe,
//! the block list and the clock.

#![cfg(test)]

use crate::blocklist::HostBlocker;
use crate::clock::Clock;
use crate::db::{migrations, ActivityStore, Database};
use crate::error::AppError;
use crate::models::{ActivityRecord, DailyCount, FocusSettings};
use crate::platform::{ActiveWindow, WindowProbe};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

/// Create a temporary test database with migrations applied.
///
/// Returns a tuple of (Database, TempDir). The TempDir must be kept alive
/// for the duration of the test to prevent the database file from being deleted.
pub fn setup_test_db() -> (Database, TempDir) {
    let dir = tempdir().expect("Failed to create temp directory for test DB");
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).expect("Failed to open test database");
    migrations::run(db.connection()).expect("Failed to run migrations on test DB");
    (db, dir)
}

#[derive(Debug, Clone)]
enum ProbeReply {
    Window(ActiveWindow),
    Nothing,
    Fail,
}

/// Probe whose answer is set by the test.
#[derive(Debug)]
pub struct ScriptedProbe {
    reply: Mutex<ProbeReply>,
    calls: AtomicUsize,
    minimized: Mutex<Vec<ActiveWindow>>,
}

impl ScriptedProbe {
    fn with_reply(reply: ProbeReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
            minimized: Mutex::new(Vec::new()),
        }
    }

    pub fn with_title(title: &str) -> Self {
        let probe = Self::with_reply(ProbeReply::Nothing);
        probe.set_title(title);
        probe
    }

    pub fn empty() -> Self {
        Self::with_reply(ProbeReply::Nothing)
    }

    pub fn failing() -> Self {
        Self::with_reply(ProbeReply::Fail)
    }

    pub fn set_title(&self, title: &str) {
        *self.reply.lock().unwrap() = ProbeReply::Window(ActiveWindow {
            handle: 42,
            title: title.to_string(),
        });
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn minimized(&self) -> Vec<ActiveWindow> {
        self.minimized.lock().unwrap().clone()
    }
}

impl WindowProbe for ScriptedProbe {
    fn active_window(&self) -> Result<Option<ActiveWindow>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply.lock().unwrap().clone() {
            ProbeReply::Window(window) => Ok(Some(window)),
            ProbeReply::Nothing => Ok(None),
            ProbeReply::Fail => Err(AppError::Probe("scripted failure".into())),
        }
    }

    fn minimize(&self, window: &ActiveWindow) -> Result<(), AppError> {
        self.minimized.lock().unwrap().push(window.clone());
        Ok(())
    }
}

/// In-memory store. Writes can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ActivityRecord>>,
    settings: Mutex<Vec<FocusSettings>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(start: &str, end: &str, apps: &str, sites: &str) -> Self {
        let store = Self::new();
        store.save_focus_settings(start, end, apps, sites).unwrap();
        store
    }

    pub fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl ActivityStore for MemoryStore {
    fn log_activity(&self, timestamp: &str, window_title: &str) -> Result<i64, AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(rusqlite::Error::InvalidQuery));
        }
        let mut records = self.records.lock().unwrap();
        let id = i64::try_from(records.len()).unwrap() + 1;
        records.push(ActivityRecord {
            id: Some(id),
            timestamp: timestamp.to_string(),
            window_title: window_title.to_string(),
        });
        Ok(id)
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
        let mut all = self.settings.lock().unwrap();
        settings.id = Some(i64::try_from(all.len()).unwrap() + 1);
        all.push(settings.clone());
        Ok(settings)
    }

    fn latest_focus_settings(&self) -> Result<Option<FocusSettings>, AppError> {
        Ok(self.settings.lock().unwrap().last().cloned())
    }

    fn daily_counts(&self) -> Result<Vec<DailyCount>, AppError> {
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for record in self.records.lock().unwrap().iter() {
            let date: String = record.timestamp.chars().take(10).collect();
            *counts.entry(date).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect())
    }

    fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityRecord>, AppError> {
        Ok(self.records.lock().unwrap().iter().rev().take(limit).cloned().collect())
    }
}

/// Remembers which hostnames are blocked and every call made.
#[derive(Debug, Default)]
pub struct RecordingBlocker {
    blocked: Mutex<Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingBlocker {
    pub fn blocked(&self) -> Vec<String> {
        self.blocked.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl HostBlocker for RecordingBlocker {
    fn block(&self, hostname: &str) -> Result<bool, AppError> {
        self.calls.lock().unwrap().push(format!("block {hostname}"));
        let mut blocked = self.blocked.lock().unwrap();
        if blocked.iter().any(|h| h == hostname) {
            return Ok(false);
        }
        blocked.push(hostname.to_string());
        Ok(true)
    }

    fn unblock(&self, hostname: &str) -> Result<usize, AppError> {
        self.calls.lock().unwrap().push(format!("unblock {hostname}"));
        let mut blocked = self.blocked.lock().unwrap();
        let before = blocked.len();
        blocked.retain(|h| h != hostname);
        Ok(before - blocked.len())
    }
}

/// Clock frozen at a settable time.
#[derive(Debug)]
pub struct FixedClock(Mutex<NaiveDateTime>);

impl FixedClock {
    pub fn at(hour: u32, minute: u32) -> Self {
        Self(Mutex::new(datetime(hour, minute)))
    }

    pub fn set(&self, hour: u32, minute: u32) {
        *self.0.lock().unwrap() = datetime(hour, minute);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}

fn datetime(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}
