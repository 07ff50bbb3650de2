//! Store configuration with layered overrides
//!
//! Defaults come from the platform data directory, then an optional
//! config file, then environment variables. The store itself only ever
//! reads the resolved [`Settings`].

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::warn;

/// Default SQLite cache file name.
pub const DEFAULT_DB_FILE: &str = "sqlcache.db";

/// Default number of rows per bulk-import chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Resolved store configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Writable cache directory.
    pub data_dir: PathBuf,

    /// Bundled read-only seed assets, copied into `data_dir` on first use.
    pub assets_dir: Option<PathBuf>,

    /// SQLite cache file name inside `data_dir`.
    pub db_file: String,

    /// Rows per bulk-import transaction chunk.
    pub chunk_size: usize,
}

/// Optional config file overlay (all keys optional).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    data_dir: Option<PathBuf>,
    assets_dir: Option<PathBuf>,
    db_file: Option<String>,
    chunk_size: Option<usize>,
}

impl Settings {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            assets_dir: None,
            db_file: DEFAULT_DB_FILE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_assets_dir(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(assets_dir.into());
        self
    }

    pub fn with_db_file(mut self, db_file: impl Into<String>) -> Self {
        self.db_file = db_file.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Resolve settings from defaults, config file and environment.
    ///
    /// Priority (lowest to highest): platform data dir, config file
    /// (`ORDERSTORE_CONFIG` or `<config dir>/config.json`), then the
    /// `ORDERSTORE_DATA_DIR` / `ORDERSTORE_ASSETS_DIR` /
    /// `ORDERSTORE_CHUNK_SIZE` environment variables.
    pub fn from_env() -> Self {
        let dirs = ProjectDirs::from("org", "orderstore", "orderstore");
        let default_data_dir = dirs
            .as_ref()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let mut settings = Settings::new(default_data_dir);

        let config_path = std::env::var_os("ORDERSTORE_CONFIG")
            .map(PathBuf::from)
            .or_else(|| dirs.as_ref().map(|d| d.config_dir().join("config.json")));
        if let Some(path) = config_path {
            settings.merge_file(&path);
        }

        if let Some(dir) = std::env::var_os("ORDERSTORE_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os("ORDERSTORE_ASSETS_DIR") {
            settings.assets_dir = Some(PathBuf::from(dir));
        }
        if let Ok(raw) = std::env::var("ORDERSTORE_CHUNK_SIZE") {
            match raw.parse::<usize>() {
                Ok(size) if size > 0 => settings.chunk_size = size,
                _ => warn!("ignoring non-numeric ORDERSTORE_CHUNK_SIZE: {raw}"),
            }
        }

        settings
    }

    fn merge_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("cannot read config {}: {e}", path.display());
                return;
            }
        };
        let overlay: SettingsFile = match serde_json::from_str(&contents) {
            Ok(o) => o,
            Err(e) => {
                warn!("cannot parse config {}: {e}", path.display());
                return;
            }
        };
        if let Some(dir) = overlay.data_dir {
            self.data_dir = dir;
        }
        if let Some(dir) = overlay.assets_dir {
            self.assets_dir = Some(dir);
        }
        if let Some(file) = overlay.db_file {
            self.db_file = file;
        }
        if let Some(size) = overlay.chunk_size {
            self.chunk_size = size;
        }
    }

    /// Writable path of a cache file.
    pub fn data_path(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    /// Bundled seed asset path of a cache file, when an assets dir is set.
    pub fn asset_path(&self, file_name: &str) -> Option<PathBuf> {
        self.assets_dir.as_ref().map(|dir| dir.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::new("/tmp/cache");
        assert_eq!(s.db_file, DEFAULT_DB_FILE);
        assert_eq!(s.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(s.assets_dir.is_none());
        assert!(s.asset_path("cacheTag.json").is_none());
    }

    #[test]
    fn test_builder_and_paths() {
        let s = Settings::new("/tmp/cache")
            .with_assets_dir("/tmp/assets")
            .with_chunk_size(500)
            .with_db_file("other.db");
        assert_eq!(s.data_path("cacheOrder.json"), PathBuf::from("/tmp/cache/cacheOrder.json"));
        assert_eq!(
            s.asset_path("cacheOrder.json"),
            Some(PathBuf::from("/tmp/assets/cacheOrder.json"))
        );
        assert_eq!(s.chunk_size, 500);
        assert_eq!(s.db_file, "other.db");
    }

    #[test]
    fn test_config_file_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"chunk_size": 250, "db_file": "bulk.db"}"#).unwrap();

        let mut s = Settings::new("/tmp/cache");
        s.merge_file(&path);
        assert_eq!(s.chunk_size, 250);
        assert_eq!(s.db_file, "bulk.db");
        assert_eq!(s.data_dir, PathBuf::from("/tmp/cache"));
    }

    #[test]
    fn test_missing_config_file_is_ignored() {
        let mut s = Settings::new("/tmp/cache");
        s.merge_file(Path::new("/nonexistent/config.json"));
        assert_eq!(s.chunk_size, DEFAULT_CHUNK_SIZE);
    }
}
