use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::constants::{APP_WINDOW_TITLE, RECENT_SAMPLES_CAP, SAMPLE_INTERVAL, TIMESTAMP_FORMAT};
use crate::db::ActivityStore;
use crate::error::{is_busy, AppError};
use crate::platform::{active_window_title, WindowProbe};
use crate::safe_lock;
use log::{debug, error, info, trace, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    /// Samples of this window are not logged.
    pub self_title: String,
    pub recent_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: SAMPLE_INTERVAL,
            self_title: APP_WINDOW_TITLE.to_string(),
            recent_capacity: RECENT_SAMPLES_CAP,
        }
    }
}

/// A sample as seen by the UI, whether or not it reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySample {
    pub timestamp: String,
    pub window_title: String,
}

/// Everything one sampling tick needs; cloned into the loop thread.
#[derive(Clone)]
struct Sampling {
    config: TrackerConfig,
    store: Arc<dyn ActivityStore>,
    probe: Arc<dyn WindowProbe>,
    clock: Arc<dyn Clock>,
    recent: Arc<Mutex<VecDeque<ActivitySample>>>,
}

impl Sampling {
    fn tick(&self) -> Option<ActivitySample> {
        let title = active_window_title(self.probe.as_ref());
        if title == self.config.self_title {
            trace!("Skipping sample of own window");
            return None;
        }

        let timestamp = self.clock.now().format(TIMESTAMP_FORMAT).to_string();
        match self.store.log_activity(&timestamp, &title) {
            Ok(_) => trace!("Logged activity: {title}"),
            Err(AppError::Database(e)) if is_busy(&e) => {
                warn!("Activity store busy, dropped sample: {e}");
            }
            Err(e) => error!("Error logging activity: {e}"),
        }

        let sample = ActivitySample {
            timestamp,
            window_title: title,
        };

        let mut recent = safe_lock(&self.recent, "Recent samples");
        if recent.len() >= self.config.recent_capacity {
            recent.pop_front();
        }
        recent.push_back(sample.clone());

        Some(sample)
    }

    fn run(&self, token: &CancelToken) {
        while !token.is_cancelled() {
            self.tick();
            if token.sleep(self.config.poll_interval) {
                break;
            }
        }
    }
}

struct Worker {
    token: CancelToken,
    handle: JoinHandle<()>,
}

/// Polls the focused window on a background thread and logs every sample.
pub struct ActivitySampler {
    sampling: Sampling,
    worker: Mutex<Option<Worker>>,
}

impl ActivitySampler {
    pub fn new(
        store: Arc<dyn ActivityStore>,
        probe: Arc<dyn WindowProbe>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
    ) -> Self {
        let capacity = config.recent_capacity;
        Self {
            sampling: Sampling {
                config,
                store,
                probe,
                clock,
                recent: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            },
            worker: Mutex::new(None),
        }
    }

    /// Launch the sampling loop. Returns `false` if it was already running.
    pub fn start_tracking(&self) -> bool {
        let mut worker = safe_lock(&self.worker, "Sampler");

        if let Some(existing) = worker.take() {
            if !existing.handle.is_finished() {
                debug!("Tracking already running");
                *worker = Some(existing);
                return false;
            }
            // The previous loop died without being stopped.
            if existing.handle.join().is_err() {
                error!("Activity sampler thread panicked");
            }
        }

        let token = CancelToken::new();
        let loop_token = token.clone();
        let sampling = self.sampling.clone();
        let handle = thread::spawn(move || sampling.run(&loop_token));

        *worker = Some(Worker { token, handle });
        info!(
            "Tracking started, sampling every {:?}",
            self.sampling.config.poll_interval
        );
        true
    }

    /// Stop the sampling loop and wait for it to exit. Returns `false` if
    /// it was not running. No sample is logged after this returns.
    pub fn stop_tracking(&self) -> bool {
        // The guard is held across the join so a concurrent start can't
        // overlap with the exiting loop.
        let mut worker = safe_lock(&self.worker, "Sampler");

        let Some(Worker { token, handle }) = worker.take() else {
            debug!("Tracking is not running");
            return false;
        };

        token.cancel();
        if handle.join().is_err() {
            error!("Activity sampler thread panicked");
        }
        info!("Tracking stopped.");
        true
    }

    pub fn is_running(&self) -> bool {
        safe_lock(&self.worker, "Sampler")
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Take one sample on the calling thread.
    pub fn sample_once(&self) -> Option<ActivitySample> {
        self.sampling.tick()
    }

    /// Samples taken so far, oldest first, capped at the ring capacity.
    pub fn recent_samples(&self) -> Vec<ActivitySample> {
        safe_lock(&self.sampling.recent, "Recent samples")
            .iter()
            .cloned()
            .collect()
    }
}

impl Drop for ActivitySampler {
    fn drop(&mut self) {
        self.stop_tracking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{NO_ACTIVE_WINDOW, PROBE_ERROR_TITLE};
    use crate::test_utils::{FixedClock, MemoryStore, ScriptedProbe};
    use std::time::Instant;

    fn setup(
        probe: ScriptedProbe,
        poll_interval: Duration,
    ) -> (ActivitySampler, Arc<MemoryStore>, Arc<ScriptedProbe>) {
        let store = Arc::new(MemoryStore::new());
        let probe = Arc::new(probe);
        let config = TrackerConfig {
            poll_interval,
            ..TrackerConfig::default()
        };
        let sampler = ActivitySampler::new(
            Arc::<MemoryStore>::clone(&store),
            Arc::<ScriptedProbe>::clone(&probe),
            Arc::new(FixedClock::at(12, 0)),
            config,
        );
        (sampler, store, probe)
    }

    fn wait_for(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_tracker_starts_and_stops() {
        let (sampler, store, probe) =
            setup(ScriptedProbe::with_title("Test Window"), Duration::from_millis(10));

        assert!(!sampler.is_running());
        assert!(sampler.start_tracking());
        assert!(sampler.is_running());

        wait_for(|| probe.calls() >= 3);

        assert!(sampler.stop_tracking());
        assert!(!sampler.is_running());

        let logged = store.records().len();
        assert!(logged >= 3);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(store.records().len(), logged, "No rows after stop_tracking returns");
    }

    #[test]
    fn test_double_start_is_a_no_op() {
        let (sampler, _store, _probe) =
            setup(ScriptedProbe::with_title("Test Window"), Duration::from_millis(10));

        assert!(sampler.start_tracking());
        assert!(!sampler.start_tracking());
        assert!(sampler.stop_tracking());
        assert!(!sampler.stop_tracking());
    }

    #[test]
    fn test_concurrent_start_runs_one_loop() {
        const THREADS: usize = 8;
        let (sampler, _store, _probe) =
            setup(ScriptedProbe::with_title("Test Window"), Duration::from_millis(10));
        let sampler = Arc::new(sampler);
        let barrier = Arc::new(std::sync::Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let sampler = Arc::clone(&sampler);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    sampler.start_tracking()
                })
            })
            .collect();
        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&started| started)
            .count();

        assert_eq!(started, 1);
        assert!(sampler.is_running());
        assert!(sampler.stop_tracking());
        assert!(!sampler.is_running());
    }

    #[test]
    fn test_restart_after_stop() {
        let (sampler, store, _probe) =
            setup(ScriptedProbe::with_title("Test Window"), Duration::from_millis(10));

        assert!(sampler.start_tracking());
        wait_for(|| !store.records().is_empty());
        sampler.stop_tracking();

        let before = store.records().len();
        assert!(sampler.start_tracking());
        wait_for(|| store.records().len() > before);
        sampler.stop_tracking();
    }

    #[test]
    fn test_stop_does_not_wait_for_full_interval() {
        let (sampler, store, _probe) =
            setup(ScriptedProbe::with_title("Test Window"), Duration::from_secs(30));

        sampler.start_tracking();
        wait_for(|| !store.records().is_empty());

        let start = Instant::now();
        sampler.stop_tracking();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn test_own_window_is_not_logged() {
        let (sampler, store, _probe) =
            setup(ScriptedProbe::with_title(APP_WINDOW_TITLE), Duration::from_secs(5));

        assert!(sampler.sample_once().is_none());
        assert!(store.records().is_empty());
        assert!(sampler.recent_samples().is_empty());
    }

    #[test]
    fn test_no_active_window_is_logged_literally() {
        let (sampler, store, _probe) = setup(ScriptedProbe::empty(), Duration::from_secs(5));

        for _ in 0..3 {
            sampler.sample_once();
        }

        let records = store.records();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.window_title == NO_ACTIVE_WINDOW));
        assert_eq!(records[0].timestamp, "2024-09-01T12:00:00");
    }

    #[test]
    fn test_probe_failure_is_logged_as_error_title() {
        let (sampler, store, _probe) = setup(ScriptedProbe::failing(), Duration::from_secs(5));

        let sample = sampler.sample_once().unwrap();
        assert_eq!(sample.window_title, PROBE_ERROR_TITLE);
        assert_eq!(store.records()[0].window_title, PROBE_ERROR_TITLE);
    }

    #[test]
    fn test_store_failures_do_not_stop_the_loop() {
        let (sampler, store, probe) =
            setup(ScriptedProbe::with_title("Test Window"), Duration::from_millis(5));
        store.set_fail_writes(true);

        sampler.start_tracking();
        wait_for(|| probe.calls() >= 3);
        assert!(sampler.is_running());
        sampler.stop_tracking();

        assert!(store.records().is_empty());
        assert!(sampler.recent_samples().len() >= 3);
    }

    #[test]
    fn test_recent_samples_are_capped() {
        let store = Arc::new(MemoryStore::new());
        let probe = Arc::new(ScriptedProbe::with_title("Editor"));
        let sampler = ActivitySampler::new(
            store,
            Arc::<ScriptedProbe>::clone(&probe),
            Arc::new(FixedClock::at(9, 30)),
            TrackerConfig {
                recent_capacity: 2,
                ..TrackerConfig::default()
            },
        );

        sampler.sample_once();
        probe.set_title("Browser");
        sampler.sample_once();
        probe.set_title("Terminal");
        sampler.sample_once();

        let titles: Vec<_> = sampler
            .recent_samples()
            .into_iter()
            .map(|s| s.window_title)
            .collect();
        assert_eq!(titles, vec!["Browser", "Terminal"]);
    }
}
