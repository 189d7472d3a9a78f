// src/constants.rs

use std::time::Duration;

/// Title of deskfocus' own window; samples carrying it are not logged.
pub const APP_WINDOW_TITLE: &str = "DeskFocus";

/// Reported by the probe when no window has focus.
pub const NO_ACTIVE_WINDOW: &str = "No Active Window";

/// Reported by the probe when window enumeration fails.
pub const PROBE_ERROR_TITLE: &str = "Error";

/// Address blocked hostnames are redirected to.
pub const REDIRECT_IP: &str = "127.0.0.1";

/// Interval between activity samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Interval between app-blocking checks while a session is active.
pub const BLOCK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pause after a failed app-blocking iteration.
pub const BLOCK_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Capacity of the in-memory recent activity ring.
pub const RECENT_SAMPLES_CAP: usize = 1000;

/// Maximum hostname length (RFC 1035)
pub const MAX_HOSTNAME_LEN: usize = 253;

/// Maximum blocked-app token length
pub const MAX_APP_PATTERN_LEN: usize = 500;

/// `HH:MM` format used by focus settings
pub const TIME_FORMAT: &str = "%H:%M";

/// Timestamp format written to `activity_log`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
