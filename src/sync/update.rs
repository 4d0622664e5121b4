//! The update flow: backup, resync, reconcile (or restore).
//!
//! A run moves through `Idle → BackedUp → Resyncing` and ends either
//! `Reconciled` (new ledger in place, diff handed to the downloader) or
//! `RestoredFromBackup` (the pre-attempt ledger is back, byte for byte).
//! The ledger is never left worse than before the attempt.
//!
//! The two renames are guarded by existence checks but are not atomic as a
//! pair across a power-loss crash; between them exactly one of the original
//! or the backup file exists, so nothing is lost either way.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::api::FavSource;
use crate::config::FavFolderConfig;
use crate::downloader::Downloader;
use crate::error::Result;
use crate::ledger::{self, LedgerRow};
use crate::sync::diff;
use crate::sync::export::{export_folder, ExportOptions, ExportOutcome};
use crate::sync::timestamp::{current_timestamp, ledger_filename};

/// The fixed backup path for a ledger (`<stem>.backup.csv`).
#[must_use]
pub fn backup_path(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("backup.csv")
}

/// Rename guard for the ledger during a resync attempt.
pub struct LedgerBackup {
    original: PathBuf,
    backup: PathBuf,
    taken: bool,
}

impl LedgerBackup {
    /// Move the ledger aside, overwriting any prior backup.
    ///
    /// When the ledger does not exist, no backup is taken and `restore`
    /// becomes a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename (or prior-backup removal) fails.
    pub fn take(original: &Path) -> io::Result<Self> {
        let backup = backup_path(original);
        let mut taken = false;
        if original.exists() {
            if backup.exists() {
                fs::remove_file(&backup)?;
            }
            fs::rename(original, &backup)?;
            taken = true;
        }
        Ok(Self {
            original: original.to_path_buf(),
            backup,
            taken,
        })
    }

    /// Whether a backup was actually taken.
    #[must_use]
    pub fn taken(&self) -> bool {
        self.taken
    }

    /// Where the backup lives.
    #[must_use]
    pub fn backup_file(&self) -> &Path {
        &self.backup
    }

    /// Move the backup back to the original path.
    ///
    /// Returns `true` when a restore happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    pub fn restore(&self) -> io::Result<bool> {
        if self.taken && self.backup.exists() {
            fs::rename(&self.backup, &self.original)?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Result of one update run.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    /// The resync's export result (new ledger path, folder info, entries).
    pub export: ExportOutcome,
    /// Rows new relative to the pre-attempt ledger, diff order.
    pub diff: Vec<LedgerRow>,
    /// Keys successfully handed to the downloader.
    pub downloaded: usize,
    /// Keys whose download failed (processing continued past each).
    pub failed: Vec<String>,
}

/// Run the full update flow for one registered folder.
///
/// On success the folder's ledger has advanced to a fresh timestamped file
/// and every diffed key was offered to the downloader, sequentially, in
/// diff order. On a resync failure the previous ledger is restored exactly
/// and the error propagates; nothing is diffed or downloaded.
///
/// The caller persists the new `csv_path`/`last_synced_at` into the config
/// store after a successful run.
///
/// # Errors
///
/// Export-stage errors (see [`export_folder`]) plus I/O errors from the
/// backup/restore renames. Downloader failures are not errors here; they
/// are collected in [`UpdateOutcome::failed`].
pub async fn run_update<S: FavSource, D: Downloader>(
    source: &S,
    downloader: &D,
    config: &FavFolderConfig,
    dry_run: bool,
) -> Result<UpdateOutcome> {
    let old_rows = ledger::read_rows(&config.csv_path, &config.encoding)?;

    let backup = LedgerBackup::take(&config.csv_path)?;
    if backup.taken() {
        tracing::info!(backup = %backup.backup_file().display(), "ledger backed up");
    } else {
        tracing::info!("no previous ledger, syncing from scratch");
    }

    fs::create_dir_all(&config.download_dir)?;
    let timestamp = current_timestamp();
    let new_csv = config.download_dir.join(ledger_filename(&timestamp));

    let options = ExportOptions {
        fav_url: config.fav_url.clone(),
        csv_path: new_csv,
        encoding: config.encoding.clone(),
        page_size: config.page_size,
        timestamp: Some(timestamp),
    };

    let export = match export_folder(source, &options).await {
        Ok(outcome) => outcome,
        Err(err) => {
            if backup.restore()? {
                tracing::warn!("resync failed, previous ledger restored");
            }
            return Err(err);
        }
    };

    let new_rows = ledger::read_rows(&export.csv_path, &config.encoding)?;
    let diffed = diff::new_entries(&old_rows, &new_rows);

    let mut downloaded = 0;
    let mut failed = Vec::new();
    for row in &diffed {
        let Some(key) = row.identity_key() else {
            continue;
        };
        match downloader.download(key, &config.download_dir, dry_run) {
            Ok(()) => downloaded += 1,
            Err(err) => {
                tracing::warn!(key, error = %err, "download failed, continuing");
                failed.push(key.to_string());
            }
        }
    }

    Ok(UpdateOutcome {
        export,
        diff: diffed,
        downloaded,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MediaPage};
    use crate::downloader::DownloaderError;
    use crate::model::{FolderInfo, RawMediaItem};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeSource {
        items: Vec<RawMediaItem>,
        fail: bool,
    }

    impl FavSource for FakeSource {
        fn folder_info(
            &self,
            media_id: u64,
        ) -> impl std::future::Future<Output = std::result::Result<FolderInfo, ApiError>> + Send
        {
            async move {
                if self.fail {
                    return Err(ApiError::Status {
                        endpoint: "info".to_string(),
                        code: -1,
                        message: "down".to_string(),
                    });
                }
                Ok(FolderInfo {
                    media_id,
                    fid: 0,
                    mid: 1,
                    title: "Favorites".to_string(),
                    media_count: self.items.len() as u64,
                })
            }
        }

        fn list_page(
            &self,
            _media_id: u64,
            _page: u32,
            _page_size: u32,
        ) -> impl std::future::Future<Output = std::result::Result<MediaPage, ApiError>> + Send
        {
            async move {
                Ok(MediaPage {
                    items: self.items.clone(),
                    has_more: false,
                })
            }
        }
    }

    /// Records requested keys; optionally fails specific ones.
    struct RecordingDownloader {
        requested: Mutex<Vec<String>>,
        fail_keys: Vec<String>,
    }

    impl RecordingDownloader {
        fn new() -> Self {
            Self {
                requested: Mutex::new(Vec::new()),
                fail_keys: Vec::new(),
            }
        }
    }

    impl Downloader for RecordingDownloader {
        fn download(
            &self,
            key: &str,
            _work_dir: &Path,
            _dry_run: bool,
        ) -> std::result::Result<(), DownloaderError> {
            self.requested.lock().unwrap().push(key.to_string());
            if self.fail_keys.iter().any(|k| k == key) {
                return Err(DownloaderError::Missing {
                    program: "bbdown".to_string(),
                });
            }
            Ok(())
        }
    }

    fn bv(key: &str) -> RawMediaItem {
        RawMediaItem {
            bv_id: Some(key.to_string()),
            bvid: None,
            id: None,
            title: key.to_string(),
        }
    }

    fn config_in(dir: &Path) -> FavFolderConfig {
        FavFolderConfig::new(
            "https://space.bilibili.com/1/favlist?fid=42".to_string(),
            dir.to_path_buf(),
            dir.join("favlist.csv"),
        )
    }

    fn run<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Runtime::new().unwrap().block_on(future)
    }

    #[test]
    fn test_backup_path_naming() {
        assert_eq!(
            backup_path(Path::new("/v/2026-01-05T10-00-00-favlist.csv")),
            PathBuf::from("/v/2026-01-05T10-00-00-favlist.backup.csv")
        );
    }

    #[test]
    fn test_failed_resync_restores_ledger_byte_identical() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        let before = "timestamp,identity_key,title,folder_name\nt,BV1,a,f\n";
        fs::write(&config.csv_path, before).unwrap();

        let source = FakeSource {
            items: vec![],
            fail: true,
        };
        let downloader = RecordingDownloader::new();

        let result = run(run_update(&source, &downloader, &config, false));
        assert!(result.is_err());

        assert_eq!(fs::read_to_string(&config.csv_path).unwrap(), before);
        assert!(!backup_path(&config.csv_path).exists());
        assert!(downloader.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn test_successful_update_downloads_exactly_the_diff_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());
        fs::write(
            &config.csv_path,
            "timestamp,identity_key,title,folder_name\nt,BV1,a,f\n",
        )
        .unwrap();

        let source = FakeSource {
            items: vec![bv("BV1"), bv("BV3"), bv("BV2")],
            fail: false,
        };
        let downloader = RecordingDownloader::new();

        let outcome = run(run_update(&source, &downloader, &config, false)).unwrap();

        assert_eq!(outcome.downloaded, 2);
        assert!(outcome.failed.is_empty());
        assert_eq!(*downloader.requested.lock().unwrap(), vec!["BV3", "BV2"]);

        // The old ledger survived as the backup; the new one holds everything.
        assert!(backup_path(&config.csv_path).exists());
        let new_rows = ledger::read_rows(&outcome.export.csv_path, "utf-8").unwrap();
        assert_eq!(new_rows.len(), 3);
    }

    #[test]
    fn test_first_update_without_ledger_takes_no_backup() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let source = FakeSource {
            items: vec![bv("BV1")],
            fail: false,
        };
        let downloader = RecordingDownloader::new();

        let outcome = run(run_update(&source, &downloader, &config, false)).unwrap();

        // No old snapshot: everything is new.
        assert_eq!(outcome.diff.len(), 1);
        assert!(!backup_path(&config.csv_path).exists());
    }

    #[test]
    fn test_download_failure_does_not_abort_the_batch() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(temp_dir.path());

        let source = FakeSource {
            items: vec![bv("BV1"), bv("BV2"), bv("BV3")],
            fail: false,
        };
        let downloader = RecordingDownloader {
            requested: Mutex::new(Vec::new()),
            fail_keys: vec!["BV2".to_string()],
        };

        let outcome = run(run_update(&source, &downloader, &config, false)).unwrap();

        assert_eq!(outcome.downloaded, 2);
        assert_eq!(outcome.failed, vec!["BV2"]);
        assert_eq!(
            *downloader.requested.lock().unwrap(),
            vec!["BV1", "BV2", "BV3"]
        );
    }

    #[test]
    fn test_take_overwrites_prior_backup() {
        let temp_dir = TempDir::new().unwrap();
        let original = temp_dir.path().join("favlist.csv");
        let backup = backup_path(&original);
        fs::write(&original, "current\n").unwrap();
        fs::write(&backup, "stale backup\n").unwrap();

        let guard = LedgerBackup::take(&original).unwrap();
        assert!(guard.taken());
        assert_eq!(fs::read_to_string(&backup).unwrap(), "current\n");
        assert!(!original.exists());

        assert!(guard.restore().unwrap());
        assert_eq!(fs::read_to_string(&original).unwrap(), "current\n");
    }
}
