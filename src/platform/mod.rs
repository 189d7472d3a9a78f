pub mod types;

pub use types::{ActiveWindow, WindowProbe};

use crate::constants::{NO_ACTIVE_WINDOW, PROBE_ERROR_TITLE};
#[cfg(not(target_os = "linux"))]
use crate::error::AppError;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxProbe as NativeProbe;

/// Title of the focused window, degraded to a placeholder when there is none
/// or the probe fails.
pub fn active_window_title(probe: &dyn WindowProbe) -> String {
    match probe.active_window() {
        Ok(Some(window)) => window.title,
        Ok(None) => NO_ACTIVE_WINDOW.to_string(),
        Err(e) => {
            log::warn!("Error retrieving active window: {e}");
            PROBE_ERROR_TITLE.to_string()
        }
    }
}

// Window enumeration is only implemented for X11; elsewhere nothing ever
// has focus and nothing can be minimized.
#[cfg(not(target_os = "linux"))]
#[derive(Debug, Default)]
pub struct NativeProbe;

#[cfg(not(target_os = "linux"))]
impl NativeProbe {
    pub fn new() -> Self { Self }
}

#[cfg(not(target_os = "linux"))]
impl WindowProbe for NativeProbe {
    fn active_window(&self) -> Result<Option<ActiveWindow>, AppError> {
        Ok(None)
    }

    fn minimize(&self, _window: &ActiveWindow) -> Result<(), AppError> {
        Err(AppError::Probe("minimizing windows is not supported on this platform".into()))
    }
}
