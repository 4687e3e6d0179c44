use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Centralized application directory resolution
#[derive(Debug, Clone)]
pub struct AppDirs {
    data_dir: Option<PathBuf>,
}

impl AppDirs {
    /// Platform defaults: `$HOME/.local/state/encore`, else the project data dir
    pub fn new() -> Self {
        Self { data_dir: None }
    }

    /// Keep everything (database and config) under `dir`
    pub fn with_data_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            data_dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    pub fn state_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Some(dir.clone());
        }
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".local").join("state").join("encore"))
        } else {
            ProjectDirs::from("", "", "encore").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path(&self) -> Option<PathBuf> {
        self.state_dir().map(|dir| dir.join("encore.db"))
    }

    /// Config file override; `None` means the platform config dir
    pub fn config_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("config.json"))
    }
}

impl Default for AppDirs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_override_wins() {
        let dirs = AppDirs::with_data_dir("/tmp/encore-test");
        assert_eq!(
            dirs.db_path(),
            Some(PathBuf::from("/tmp/encore-test/encore.db"))
        );
        assert_eq!(
            dirs.config_path(),
            Some(PathBuf::from("/tmp/encore-test/config.json"))
        );
    }

    #[test]
    fn default_db_lives_in_encore_dir() {
        let dirs = AppDirs::new();
        if let Some(path) = dirs.db_path() {
            assert!(path.ends_with("encore/encore.db") || path.ends_with("encore.db"));
        }
        assert!(dirs.config_path().is_none());
    }
}
