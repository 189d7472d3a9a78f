use crate::constants::{
    APP_WINDOW_TITLE, BLOCK_ERROR_BACKOFF, BLOCK_POLL_INTERVAL, RECENT_SAMPLES_CAP, REDIRECT_IP,
    SAMPLE_INTERVAL,
};
use crate::error::AppError;
use crate::focus::FocusConfig;
use crate::tracker::TrackerConfig;
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.json";
const DB_FILE: &str = "activity_log.db";

#[cfg(windows)]
const DEFAULT_HOSTS_PATH: &str = r"C:\Windows\System32\drivers\etc\hosts";
#[cfg(not(windows))]
const DEFAULT_HOSTS_PATH: &str = "/etc/hosts";

/// User configuration, read from `config.json` in the platform config dir.
/// Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults to `activity_log.db` in the platform data dir.
    pub database_path: Option<PathBuf>,
    pub hosts_path: PathBuf,
    pub redirect_ip: String,
    /// Title of our own window, excluded from sampling.
    pub self_title: String,
    pub sample_interval_secs: u64,
    pub block_poll_interval_secs: u64,
    pub block_error_backoff_secs: u64,
    /// When set, sessions started from settings last this long instead
    /// of running until the settings' end time.
    pub fixed_session_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            hosts_path: PathBuf::from(DEFAULT_HOSTS_PATH),
            redirect_ip: REDIRECT_IP.to_string(),
            self_title: APP_WINDOW_TITLE.to_string(),
            sample_interval_secs: SAMPLE_INTERVAL.as_secs(),
            block_poll_interval_secs: BLOCK_POLL_INTERVAL.as_secs(),
            block_error_backoff_secs: BLOCK_ERROR_BACKOFF.as_secs(),
            fixed_session_secs: None,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs, AppError> {
    ProjectDirs::from("com", "deskfocus", "DeskFocus")
        .ok_or_else(|| AppError::Config("could not determine project directories".into()))
}

impl Config {
    /// Load from the platform config dir, falling back to defaults when no
    /// file exists.
    pub fn load() -> Result<Self, AppError> {
        let path = project_dirs()?.config_dir().join(CONFIG_FILE);
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Config(format!("{}: {e}", path.display())));
            }
        };

        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.sample_interval_secs == 0
            || self.block_poll_interval_secs == 0
            || self.block_error_backoff_secs == 0
        {
            return Err(AppError::Config(
                "poll intervals and back-off must be at least 1 second".into(),
            ));
        }
        if self.fixed_session_secs == Some(0) {
            return Err(AppError::Config("fixed_session_secs must be positive".into()));
        }
        if self.redirect_ip.parse::<std::net::IpAddr>().is_err() {
            return Err(AppError::Config(format!(
                "redirect_ip is not an IP address: {}",
                self.redirect_ip
            )));
        }
        Ok(())
    }

    /// The configured database path, or the default one in the data dir.
    /// Creates the parent directory.
    pub fn database_path(&self) -> Result<PathBuf, AppError> {
        let path = match &self.database_path {
            Some(path) => path.clone(),
            None => project_dirs()?.data_dir().join(DB_FILE),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Config(format!("could not create {}: {e}", parent.display())))?;
        }
        Ok(path)
    }

    pub fn tracker(&self) -> TrackerConfig {
        TrackerConfig {
            poll_interval: Duration::from_secs(self.sample_interval_secs),
            self_title: self.self_title.clone(),
            recent_capacity: RECENT_SAMPLES_CAP,
        }
    }

    pub fn focus(&self) -> FocusConfig {
        FocusConfig {
            poll_interval: Duration::from_secs(self.block_poll_interval_secs),
            error_backoff: Duration::from_secs(self.block_error_backoff_secs),
            fixed_duration: self.fixed_session_secs.map(Duration::from_secs),
        }
    }
}
