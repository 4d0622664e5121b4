//! Persisted folder configurations.
//!
//! Registered favlists live in a JSON array at `~/.bfav/config.json`,
//! overridable with `--config` or the `BFAV_CONFIG` environment variable.
//! Saves go through a temp-file-plus-rename so a crashed save can never
//! corrupt an existing store; an unreadable store logs a warning and starts
//! empty instead of refusing to run.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable naming the config store path.
pub const CONFIG_ENV: &str = "BFAV_CONFIG";

const APP_DIR: &str = ".bfav";
const CONFIG_FILENAME: &str = "config.json";

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_page_size() -> u32 {
    40
}

fn default_timeout() -> u64 {
    10
}

/// One registered favorites folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavFolderConfig {
    /// Favlist URL (or bare folder id).
    pub fav_url: String,
    /// Directory downloads and ledgers are written to.
    pub download_dir: PathBuf,
    /// Current ledger path; advanced by each successful update run.
    pub csv_path: PathBuf,
    /// Ledger text encoding label.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Listing page size.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Cookie for private folders.
    #[serde(default)]
    pub cookie: Option<String>,
    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Timestamp of the last successful sync.
    #[serde(default)]
    pub last_synced_at: Option<String>,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
}

impl FavFolderConfig {
    /// New config with defaults for everything but the three paths.
    #[must_use]
    pub fn new(fav_url: String, download_dir: PathBuf, csv_path: PathBuf) -> Self {
        Self {
            fav_url,
            download_dir,
            csv_path,
            encoding: default_encoding(),
            page_size: default_page_size(),
            cookie: None,
            timeout_secs: default_timeout(),
            last_synced_at: None,
            name: None,
        }
    }

    /// Name for listings: the configured name, else "favlist N".
    #[must_use]
    pub fn display_name(&self, listed_index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("favlist {listed_index}"))
    }
}

/// Resolve the config store path.
///
/// Priority: explicit path (CLI flag), `BFAV_CONFIG`, `~/.bfav/config.json`.
#[must_use]
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    directories::BaseDirs::new()
        .map(|b| b.home_dir().join(APP_DIR).join(CONFIG_FILENAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME))
}

/// The on-disk collection of registered folders.
pub struct ConfigStore {
    path: PathBuf,
    folders: Vec<FavFolderConfig>,
}

impl ConfigStore {
    /// Load the store at `path`; missing or unreadable files start empty.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let folders = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(folders) => folders,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e,
                        "config store is unreadable, starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, folders }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn folders(&self) -> &[FavFolderConfig] {
        &self.folders
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    /// Look up a folder by its 1-based index as shown by `folder list`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] for indices outside `1..=len`.
    pub fn get_listed(&self, listed_index: usize) -> Result<&FavFolderConfig> {
        listed_index
            .checked_sub(1)
            .and_then(|i| self.folders.get(i))
            .ok_or(Error::FolderNotFound {
                index: listed_index,
                count: self.folders.len(),
            })
    }

    /// Append a folder and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn add(&mut self, config: FavFolderConfig) -> Result<()> {
        self.folders.push(config);
        self.save()
    }

    /// Replace the folder at a 1-based index and persist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] for bad indices, or a write error.
    pub fn update_listed(&mut self, listed_index: usize, config: FavFolderConfig) -> Result<()> {
        let count = self.folders.len();
        let slot = listed_index
            .checked_sub(1)
            .and_then(|i| self.folders.get_mut(i))
            .ok_or(Error::FolderNotFound {
                index: listed_index,
                count,
            })?;
        *slot = config;
        self.save()
    }

    /// Remove the folder at a 1-based index and persist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderNotFound`] for bad indices, or a write error.
    pub fn remove_listed(&mut self, listed_index: usize) -> Result<FavFolderConfig> {
        let index = listed_index
            .checked_sub(1)
            .filter(|i| *i < self.folders.len())
            .ok_or(Error::FolderNotFound {
                index: listed_index,
                count: self.folders.len(),
            })?;
        let removed = self.folders.remove(index);
        self.save()?;
        Ok(removed)
    }

    /// Persist the store atomically (temp file, fsync, rename).
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = std::io::BufWriter::new(file);
            let content = serde_json::to_string_pretty(&self.folders)?;
            writer.write_all(content.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(url: &str) -> FavFolderConfig {
        FavFolderConfig::new(
            url.to_string(),
            PathBuf::from("/videos"),
            PathBuf::from("/videos/favlist.csv"),
        )
    }

    #[test]
    fn test_missing_store_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::load(temp_dir.path().join("config.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sub").join("config.json");

        let mut store = ConfigStore::load(&path);
        store.add(sample("https://x.test/favlist?fid=1")).unwrap();
        store.add(sample("https://x.test/favlist?fid=2")).unwrap();

        let reloaded = ConfigStore::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(
            reloaded.get_listed(2).unwrap().fav_url,
            "https://x.test/favlist?fid=2"
        );
    }

    #[test]
    fn test_partial_records_get_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"[{"fav_url":"u","download_dir":"/d","csv_path":"/d/l.csv"}]"#,
        )
        .unwrap();

        let store = ConfigStore::load(&path);
        let folder = store.get_listed(1).unwrap();
        assert_eq!(folder.encoding, "utf-8");
        assert_eq!(folder.page_size, 40);
        assert_eq!(folder.timeout_secs, 10);
        assert!(folder.cookie.is_none());
    }

    #[test]
    fn test_corrupt_store_starts_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let store = ConfigStore::load(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_listed_index_bounds() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = ConfigStore::load(temp_dir.path().join("config.json"));
        store.add(sample("u")).unwrap();

        assert!(store.get_listed(1).is_ok());
        assert!(matches!(
            store.get_listed(0),
            Err(Error::FolderNotFound { .. })
        ));
        assert!(matches!(
            store.get_listed(2),
            Err(Error::FolderNotFound { index: 2, count: 1 })
        ));
    }

    #[test]
    fn test_remove_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut store = ConfigStore::load(&path);
        store.add(sample("a")).unwrap();
        store.add(sample("b")).unwrap();

        let removed = store.remove_listed(1).unwrap();
        assert_eq!(removed.fav_url, "a");

        let reloaded = ConfigStore::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get_listed(1).unwrap().fav_url, "b");
    }

    #[test]
    fn test_display_name_fallback() {
        let mut folder = sample("u");
        assert_eq!(folder.display_name(3), "favlist 3");
        folder.name = Some("music".to_string());
        assert_eq!(folder.display_name(3), "music");
    }
}
