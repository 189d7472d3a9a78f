pub mod activity;
pub mod focus_settings;

pub use activity::{ActivityRecord, DailyCount};
pub use focus_settings::FocusSettings;
