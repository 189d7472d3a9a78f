pub mod blocklist;
pub mod cancel;
pub mod clock;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod focus;
pub mod models;
pub mod platform;
pub mod report;
#[cfg(test)]
mod test_utils;
pub mod tracker;
pub mod validation;

use crate::blocklist::{HostBlocker, HostsFileBlocker, NoopBlocker};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::{ActivityStore, SqliteStore};
use crate::error::AppError;
use crate::focus::FocusController;
use crate::platform::{NativeProbe, WindowProbe};
use crate::tracker::ActivitySampler;
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard};

/// Lock a mutex, recovering from poisoning if necessary
pub(crate) fn safe_lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("{context} mutex was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// The wired-up application: one store, one probe, one sampler and one
/// focus controller sharing them.
pub struct App {
    pub store: Arc<SqliteStore>,
    pub sampler: ActivitySampler,
    pub focus: FocusController,
}

impl App {
    /// Build every component from `config`. With `block_websites` off the
    /// hosts file is never touched.
    pub fn open(config: &Config, block_websites: bool) -> Result<Self, AppError> {
        let db_path = config.database_path()?;
        let store = Arc::new(SqliteStore::open(&db_path)?);
        info!("Using database at {}", db_path.display());

        let activity_store: Arc<dyn ActivityStore> = Arc::<SqliteStore>::clone(&store);
        let probe: Arc<dyn WindowProbe> = Arc::new(NativeProbe::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let blocker: Arc<dyn HostBlocker> = if block_websites {
            Arc::new(HostsFileBlocker::new(&config.hosts_path, &config.redirect_ip))
        } else {
            Arc::new(NoopBlocker)
        };

        let sampler = ActivitySampler::new(
            Arc::clone(&activity_store),
            Arc::clone(&probe),
            Arc::clone(&clock),
            config.tracker(),
        );
        let focus = FocusController::new(
            activity_store,
            probe,
            blocker,
            clock,
            config.focus(),
        );

        Ok(Self {
            store,
            sampler,
            focus,
        })
    }
}
