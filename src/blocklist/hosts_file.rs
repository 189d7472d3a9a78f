use super::HostBlocker;
use crate::error::AppError;
use crate::safe_lock;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Blocks hostnames by redirecting them in a hosts file
/// (`<redirect-ip> <hostname>` per line).
///
/// Edits are read-modify-write and not atomic; a crash mid-write can leave
/// a partial file.
#[derive(Debug)]
pub struct HostsFileBlocker {
    path: PathBuf,
    redirect_ip: String,
    /// File content before we terminated its last line, so the newline
    /// can be dropped again once our entries are gone.
    unterminated: Mutex<Option<String>>,
}

impl HostsFileBlocker {
    pub fn new(path: impl Into<PathBuf>, redirect_ip: &str) -> Self {
        Self {
            path: path.into(),
            redirect_ip: redirect_ip.to_string(),
            unterminated: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<String, AppError> {
        fs::read_to_string(&self.path).map_err(|e| AppError::block_list(&self.path, e))
    }
}

/// Check if a hosts line maps `hostname`. Comments and the address column
/// are ignored.
pub fn line_mentions(line: &str, hostname: &str) -> bool {
    let entry = line.split('#').next().unwrap_or_default();
    entry
        .split_whitespace()
        .skip(1)
        .any(|host| host.eq_ignore_ascii_case(hostname))
}

impl HostBlocker for HostsFileBlocker {
    fn block(&self, hostname: &str) -> Result<bool, AppError> {
        let content = self.read()?;
        if content.lines().any(|line| line_mentions(line, hostname)) {
            return Ok(false);
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::block_list(&self.path, e))?;

        let terminate = !content.is_empty() && !content.ends_with('\n');
        let mut entry = String::new();
        if terminate {
            entry.push('\n');
        }
        entry.push_str(&format!("{} {hostname}\n", self.redirect_ip));

        file.write_all(entry.as_bytes())
            .map_err(|e| AppError::block_list(&self.path, e))?;
        if terminate {
            *safe_lock(&self.unterminated, "Hosts file") = Some(content);
        }
        log::info!("Blocked website: {hostname}");
        Ok(true)
    }

    fn unblock(&self, hostname: &str) -> Result<usize, AppError> {
        let content = self.read()?;

        let mut removed = 0;
        let mut kept: String = content
            .split_inclusive('\n')
            .filter(|line| {
                let mentions = line_mentions(line, hostname);
                if mentions {
                    removed += 1;
                }
                !mentions
            })
            .collect();

        if removed > 0 {
            let mut unterminated = safe_lock(&self.unterminated, "Hosts file");
            let restored = unterminated
                .as_deref()
                .is_some_and(|before| kept.strip_suffix('\n') == Some(before));
            if restored {
                kept.pop();
                *unterminated = None;
            }
            drop(unterminated);

            fs::write(&self.path, kept).map_err(|e| AppError::block_list(&self.path, e))?;
            log::info!("Unblocked website: {hostname}");
        }
        Ok(removed)
    }
}
