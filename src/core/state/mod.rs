mod app_state;
mod config;

pub use app_state::{AppState, IntegrityReport};
pub use config::{LauncherConfig, COMPATIBLE_VERSION, SETTINGS_FILE};
