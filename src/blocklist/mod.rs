//! Website blocking through a hosts-style block list.

pub mod hosts_file;

pub use hosts_file::HostsFileBlocker;

use crate::error::AppError;

/// Capability to block and unblock a hostname system-wide.
pub trait HostBlocker: Send + Sync {
    /// Block `hostname`. Returns `false` when it was already blocked.
    fn block(&self, hostname: &str) -> Result<bool, AppError>;

    /// Unblock `hostname`. Returns how many entries were removed.
    fn unblock(&self, hostname: &str) -> Result<usize, AppError>;
}

/// Blocker that never touches the system. Used when website blocking is
/// turned off.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBlocker;

impl HostBlocker for NoopBlocker {
    fn block(&self, hostname: &str) -> Result<bool, AppError> {
        log::debug!("Website blocking disabled, not blocking {hostname}");
        Ok(false)
    }

    fn unblock(&self, _hostname: &str) -> Result<usize, AppError> {
        Ok(0)
    }
}
