use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveWindow {
    /// Platform window id (an X11 `Window` on Linux).
    pub handle: u64,
    pub title: String,
}

pub trait WindowProbe: Send + Sync {
    /// The focused window, or `None` when nothing has focus.
    fn active_window(&self) -> Result<Option<ActiveWindow>, AppError>;

    fn minimize(&self, window: &ActiveWindow) -> Result<(), AppError>;
}
