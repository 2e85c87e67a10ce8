use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "fifteen-twenty";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/fifteen-twenty/results.csv`, or the platform
    /// data dir when `HOME` is unset.
    pub fn results_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("results.csv"))
    }

    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }
}
