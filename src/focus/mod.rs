use crate::blocklist::HostBlocker;
use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::constants::{BLOCK_ERROR_BACKOFF, BLOCK_POLL_INTERVAL};
use crate::db::ActivityStore;
use crate::error::AppError;
use crate::models::FocusSettings;
use crate::platform::WindowProbe;
use crate::safe_lock;
use crate::validation::validate_hostname;
use chrono::{NaiveDateTime, TimeDelta};
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FocusConfig {
    /// Interval between app-blocking checks.
    pub poll_interval: Duration,
    /// Pause after a failed check.
    pub error_backoff: Duration,
    /// Session length for `start_from_settings`. `None` runs the session
    /// until the settings' end time.
    pub fixed_duration: Option<Duration>,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            poll_interval: BLOCK_POLL_INTERVAL,
            error_backoff: BLOCK_ERROR_BACKOFF,
            fixed_duration: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub active: bool,
    /// The timer has fired but the session has not been ended yet. Apps
    /// are no longer minimized; websites stay blocked until
    /// `poll_expiry` or `end_session` runs.
    pub expired: bool,
    pub blocked_websites: BTreeSet<String>,
    pub started_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
}

/// Sent from the session timer to whichever thread polls the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Expired { session: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Expired,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub started_at: NaiveDateTime,
    pub ended_at: NaiveDateTime,
    pub blocked_websites: Vec<String>,
    pub reason: EndReason,
}

/// One app-blocking check; cloned into the enforcement thread.
#[derive(Clone)]
struct Enforcement {
    store: Arc<dyn ActivityStore>,
    probe: Arc<dyn WindowProbe>,
    clock: Arc<dyn Clock>,
    config: FocusConfig,
}

impl Enforcement {
    /// Minimize the focused window if the latest settings block it right
    /// now. Returns the matching app token.
    fn check(&self) -> Result<Option<String>, AppError> {
        let Some(settings) = self.store.latest_focus_settings()? else {
            trace!("No focus settings saved, nothing to block");
            return Ok(None);
        };

        if !settings.is_active_at(self.clock.now().time()) {
            return Ok(None);
        }

        let Some(window) = self.probe.active_window()? else {
            return Ok(None);
        };

        let Some(app) = settings.matching_app(&window.title) else {
            return Ok(None);
        };

        self.probe.minimize(&window)?;
        info!("Blocking app: {app} ({})", window.title);
        Ok(Some(app.to_string()))
    }

    fn run(&self, token: &CancelToken) {
        while !token.is_cancelled() {
            let pause = match self.check() {
                Ok(_) => self.config.poll_interval,
                Err(e) => {
                    warn!("Error in app blocking: {e}");
                    self.config.error_backoff.max(self.config.poll_interval)
                }
            };
            if token.sleep(pause) {
                break;
            }
        }
    }
}

struct ActiveSession {
    id: u64,
    blocked_websites: BTreeSet<String>,
    started_at: NaiveDateTime,
    ends_at: NaiveDateTime,
    token: CancelToken,
    enforcement: JoinHandle<()>,
    timer: JoinHandle<()>,
}

struct Slot {
    current: Option<ActiveSession>,
    next_id: u64,
}

/// Runs focus sessions: blocks websites for the session's lifetime and
/// minimizes blocked apps during the configured time window.
///
/// Website blocking happens on the thread that starts or ends the session.
/// Timer expiry stops app blocking right away but is otherwise only
/// reported through [`SessionEvent`]; call [`FocusController::poll_expiry`]
/// or [`FocusController::wait_for_expiry`] to unblock the websites.
pub struct FocusController {
    enforcement: Enforcement,
    blocker: Arc<dyn HostBlocker>,
    slot: Mutex<Slot>,
    events_tx: Sender<SessionEvent>,
    events_rx: Mutex<Receiver<SessionEvent>>,
}

impl FocusController {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        probe: Arc<dyn WindowProbe>,
        blocker: Arc<dyn HostBlocker>,
        clock: Arc<dyn Clock>,
        config: FocusConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            enforcement: Enforcement {
                store,
                probe,
                clock,
                config,
            },
            blocker,
            slot: Mutex::new(Slot {
                current: None,
                next_id: 1,
            }),
            events_tx,
            events_rx: Mutex::new(events_rx),
        }
    }

    /// Start a session blocking `blocked_websites` for `duration`.
    ///
    /// Fails with [`AppError::SessionActive`] if one is already running. A
    /// missing or unwritable block list is logged and the session starts
    /// anyway.
    pub fn start_session(
        &self,
        blocked_websites: &[String],
        duration: Duration,
    ) -> Result<SessionState, AppError> {
        if duration.is_zero() {
            return Err(AppError::InvalidInput {
                field: "duration",
                reason: "must be positive".into(),
            });
        }
        let length = TimeDelta::from_std(duration).map_err(|e| AppError::InvalidInput {
            field: "duration",
            reason: e.to_string(),
        })?;

        let websites = blocked_websites
            .iter()
            .map(|site| validate_hostname(site))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let mut slot = safe_lock(&self.slot, "Focus session");
        if slot.current.is_some() {
            return Err(AppError::SessionActive);
        }

        let id = slot.next_id;
        slot.next_id += 1;

        self.block_websites(&websites);

        let token = CancelToken::new();

        let enforcement = {
            let token = token.clone();
            let check = self.enforcement.clone();
            thread::spawn(move || check.run(&token))
        };

        let timer = {
            let token = token.clone();
            let events = self.events_tx.clone();
            thread::spawn(move || {
                if !token.sleep(duration) {
                    // The receiver lives as long as the controller.
                    let _ = events.send(SessionEvent::Expired { session: id });
                    token.cancel();
                }
            })
        };

        let started_at = self.enforcement.clock.now();
        let session = ActiveSession {
            id,
            blocked_websites: websites,
            started_at,
            ends_at: started_at + length,
            token,
            enforcement,
            timer,
        };
        info!(
            "Focus session started, blocking {} website(s) until {}",
            session.blocked_websites.len(),
            session.ends_at.format("%H:%M:%S")
        );

        let state = Self::snapshot(Some(&session));
        slot.current = Some(session);
        Ok(state)
    }

    /// Start a session from saved settings. The session lasts until the
    /// settings' end time unless a fixed duration is configured.
    pub fn start_from_settings(&self, settings: &FocusSettings) -> Result<SessionState, AppError> {
        let duration = match self.enforcement.config.fixed_duration {
            Some(duration) => duration,
            None => settings
                .remaining_at(self.enforcement.clock.now().time())
                .ok_or_else(|| AppError::InvalidInput {
                    field: "end_time",
                    reason: format!("focus window already ended at {}", settings.end_time_str()),
                })?,
        };
        self.start_session(&settings.blocked_websites, duration)
    }

    /// Start a session from the most recently saved settings.
    pub fn start_latest(&self) -> Result<SessionState, AppError> {
        let settings = self
            .enforcement
            .store
            .latest_focus_settings()?
            .ok_or(AppError::NotFound { entity: "Focus settings" })?;
        self.start_from_settings(&settings)
    }

    /// End the running session. A no-op returning `None` when idle.
    pub fn end_session(&self) -> Option<SessionSummary> {
        self.finish(EndReason::Stopped, None)
    }

    /// End the session if its timer has fired since the last poll.
    pub fn poll_expiry(&self) -> Option<SessionSummary> {
        let expired: Vec<_> = safe_lock(&self.events_rx, "Session events").try_iter().collect();
        expired
            .into_iter()
            .find_map(|SessionEvent::Expired { session }| self.finish(EndReason::Expired, Some(session)))
    }

    /// Block until the running session expires or `timeout` passes.
    pub fn wait_for_expiry(&self, timeout: Duration) -> Option<SessionSummary> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = safe_lock(&self.events_rx, "Session events").recv_timeout(remaining);
            match event {
                Ok(SessionEvent::Expired { session }) => {
                    if let Some(summary) = self.finish(EndReason::Expired, Some(session)) {
                        return Some(summary);
                    }
                    trace!("Ignoring expiry of finished session {session}");
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    pub fn state(&self) -> SessionState {
        Self::snapshot(safe_lock(&self.slot, "Focus session").current.as_ref())
    }

    pub fn is_active(&self) -> bool {
        safe_lock(&self.slot, "Focus session").current.is_some()
    }

    /// Run one app-blocking check on the calling thread.
    pub fn enforce_now(&self) -> Result<Option<String>, AppError> {
        self.enforcement.check()
    }

    fn snapshot(session: Option<&ActiveSession>) -> SessionState {
        session.map_or_else(SessionState::default, |s| SessionState {
            active: true,
            expired: s.token.is_cancelled(),
            blocked_websites: s.blocked_websites.clone(),
            started_at: Some(s.started_at),
            ends_at: Some(s.ends_at),
        })
    }

    /// End the current session, or only session `only` when given.
    fn finish(&self, reason: EndReason, only: Option<u64>) -> Option<SessionSummary> {
        let mut slot = safe_lock(&self.slot, "Focus session");

        if only.is_some_and(|id| slot.current.as_ref().map(|s| s.id) != Some(id)) {
            return None;
        }
        let Some(session) = slot.current.take() else {
            debug!("No focus session to end");
            return None;
        };

        session.token.cancel();
        if session.enforcement.join().is_err() {
            error!("App blocking thread panicked");
        }
        if session.timer.join().is_err() {
            error!("Session timer thread panicked");
        }

        self.unblock_websites(&session.blocked_websites);

        info!("Your focus session has ended.");
        Some(SessionSummary {
            started_at: session.started_at,
            ended_at: self.enforcement.clock.now(),
            blocked_websites: session.blocked_websites.into_iter().collect(),
            reason,
        })
    }

    fn block_websites(&self, websites: &BTreeSet<String>) {
        for site in websites {
            match self.blocker.block(site) {
                Ok(true) => {}
                Ok(false) => debug!("{site} already blocked"),
                Err(e @ AppError::BlockListMissing { .. }) => {
                    error!("{e}; website blocking skipped");
                    break;
                }
                Err(e) => warn!("Failed to block {site}: {e}"),
            }
        }
    }

    fn unblock_websites(&self, websites: &BTreeSet<String>) {
        for site in websites {
            match self.blocker.unblock(site) {
                Ok(_) => {}
                Err(e @ AppError::BlockListMissing { .. }) => {
                    error!("{e}; website unblocking skipped");
                    break;
                }
                Err(e) => warn!("Failed to unblock {site}: {e}"),
            }
        }
    }
}

impl Drop for FocusController {
    fn drop(&mut self) {
        self.end_session();
    }
}
