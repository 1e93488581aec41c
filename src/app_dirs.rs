use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "notarium";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Profile database under `$HOME/.local/state/notarium`, or the platform
    /// data directory when `HOME` is unset.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME);
            Some(state_dir.join("profile.db"))
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().join("profile.db"))
        }
    }

    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", APP_NAME) {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("notarium_config.json")
        }
    }
}
