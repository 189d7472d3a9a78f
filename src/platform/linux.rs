use super::{ActiveWindow, WindowProbe};
use crate::error::AppError;
use std::fmt::Display;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ClientMessageEvent, ConnectionExt, EventMask, Window};
use x11rb::rust_connection::RustConnection;

/// ICCCM `IconicState`, requested through `WM_CHANGE_STATE` to minimize.
const ICONIC_STATE: u32 = 3;

pub struct LinuxProbe {
    conn: Option<RustConnection>,
    root: Window,
}

impl Default for LinuxProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn probe_err(context: &str, e: impl Display) -> AppError {
    AppError::Probe(format!("{context}: {e}"))
}

impl LinuxProbe {
    pub fn new() -> Self {
        match x11rb::connect(None) {
            Ok((conn, screen_num)) => {
                let Some(root) = conn.setup().roots.get(screen_num).map(|s| s.root) else {
                    log::warn!(
                        "Invalid screen number {} ({} screens available). Window tracking disabled.",
                        screen_num,
                        conn.setup().roots.len()
                    );
                    return Self { conn: None, root: 0 };
                };
                Self {
                    conn: Some(conn),
                    root,
                }
            }
            Err(e) => {
                // Wayland and headless sessions end up here; every probe
                // call then reports an error instead of panicking.
                log::warn!("Failed to connect to X server: {e}. Window tracking disabled.");
                Self { conn: None, root: 0 }
            }
        }
    }

    fn conn(&self) -> Result<&RustConnection, AppError> {
        self.conn
            .as_ref()
            .ok_or_else(|| AppError::Probe("no X server connection".into()))
    }

    fn atom(&self, name: &str) -> Result<u32, AppError> {
        let reply = self
            .conn()?
            .intern_atom(false, name.as_bytes())
            .map_err(|e| probe_err(name, e))?
            .reply()
            .map_err(|e| probe_err(name, e))?;
        Ok(reply.atom)
    }

    fn window_text_property(&self, window: Window, atom: u32) -> Result<Option<String>, AppError> {
        let reply = self
            .conn()?
            .get_property(false, window, atom, AtomEnum::ANY, 0, 1024)
            .map_err(|e| probe_err("get_property", e))?
            .reply()
            .map_err(|e| probe_err("get_property", e))?;

        if reply.value.is_empty() {
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
    }

    fn active_window_id(&self) -> Result<Option<Window>, AppError> {
        let atom = self.atom("_NET_ACTIVE_WINDOW")?;
        let reply = self
            .conn()?
            .get_property(false, self.root, atom, AtomEnum::WINDOW, 0, 1)
            .map_err(|e| probe_err("_NET_ACTIVE_WINDOW", e))?
            .reply()
            .map_err(|e| probe_err("_NET_ACTIVE_WINDOW", e))?;

        let id = reply.value32().and_then(|mut values| values.next());
        Ok(id.filter(|&id| id != 0))
    }
}

impl WindowProbe for LinuxProbe {
    fn active_window(&self) -> Result<Option<ActiveWindow>, AppError> {
        let Some(window_id) = self.active_window_id()? else {
            return Ok(None);
        };

        let net_wm_name = self.atom("_NET_WM_NAME")?;
        let title = match self.window_text_property(window_id, net_wm_name)? {
            Some(title) => title,
            None => self
                .window_text_property(window_id, AtomEnum::WM_NAME.into())?
                .unwrap_or_default(),
        };

        Ok(Some(ActiveWindow {
            handle: u64::from(window_id),
            title,
        }))
    }

    fn minimize(&self, window: &ActiveWindow) -> Result<(), AppError> {
        let conn = self.conn()?;
        let target = Window::try_from(window.handle)
            .map_err(|e| probe_err("window handle", e))?;
        let wm_change_state = self.atom("WM_CHANGE_STATE")?;

        let event = ClientMessageEvent::new(32, target, wm_change_state, [ICONIC_STATE, 0, 0, 0, 0]);
        conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )
        .map_err(|e| probe_err("WM_CHANGE_STATE", e))?
        .check()
        .map_err(|e| probe_err("WM_CHANGE_STATE", e))?;

        conn.flush().map_err(|e| probe_err("flush", e))?;
        Ok(())
    }
}
