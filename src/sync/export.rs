//! Folder export: pagination walk, dedup filtering, ledger append.
//!
//! The engine is all-or-nothing relative to the ledger: every failure mode
//! (URL resolution, metadata fetch, listing fetch, ledger read) happens
//! before the single append, so a failed sync never mutates the ledger.
//!
//! Callers must serialize runs against one ledger path; the engine takes no
//! lock of its own.

use std::path::PathBuf;

use crate::api::{ApiError, FavSource};
use crate::error::{Error, Result};
use crate::ledger;
use crate::model::{FolderInfo, RawMediaItem, VideoEntry};
use crate::sync::timestamp::current_timestamp;

/// Inputs for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Favlist URL or bare folder id.
    pub fav_url: String,
    /// Target ledger path.
    pub csv_path: PathBuf,
    /// Ledger text encoding label.
    pub encoding: String,
    /// Listing page size.
    pub page_size: u32,
    /// Run timestamp; current local time when `None`.
    pub timestamp: Option<String>,
}

/// Result of one export run.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    /// The ledger that was written (or verified to exist).
    pub csv_path: PathBuf,
    /// Folder metadata at sync time.
    pub folder: FolderInfo,
    /// Entries appended by this run, in listing order. May be empty.
    pub new_entries: Vec<VideoEntry>,
    /// The timestamp shared by all appended rows.
    pub timestamp: String,
}

/// Walk every listing page into one ordered item list.
///
/// Pages are requested from 1 upward with a constant page size until the
/// source reports no more pages, even when the last page is full. No
/// dedup happens here; that is layered on by [`export_folder`].
///
/// # Errors
///
/// The first source error aborts the walk; partial results are never
/// returned.
pub async fn collect_all_pages<S: FavSource>(
    source: &S,
    media_id: u64,
    page_size: u32,
) -> std::result::Result<Vec<RawMediaItem>, ApiError> {
    let mut items = Vec::new();
    let mut page = 1;
    loop {
        let listing = source.list_page(media_id, page, page_size).await?;
        let has_more = listing.has_more;
        items.extend(listing.items);
        if !has_more {
            break;
        }
        page += 1;
    }
    Ok(items)
}

/// Export a favorites folder to its CSV ledger.
///
/// Fetches folder metadata, walks all listing pages, filters items through
/// the ledger's dedup set, and appends only the new entries in listing
/// order. When nothing is new and no ledger exists yet, a header-only
/// ledger is still created so downstream tooling always finds a valid file.
///
/// # Errors
///
/// - [`Error::InvalidFolderUrl`] when the reference has no resolvable id.
/// - [`Error::MetadataFetch`] / [`Error::ListingFetch`] for remote failures.
/// - Ledger read/write errors from the codec.
pub async fn export_folder<S: FavSource>(
    source: &S,
    options: &ExportOptions,
) -> Result<ExportOutcome> {
    let media_id = crate::api::parse_folder_url(&options.fav_url)?;

    let folder = source
        .folder_info(media_id)
        .await
        .map_err(Error::MetadataFetch)?;
    tracing::info!(media_id, title = %folder.title, count = folder.media_count, "syncing folder");

    let mut known_keys = ledger::load_existing_keys(&options.csv_path, &options.encoding)?;

    let timestamp = options
        .timestamp
        .clone()
        .unwrap_or_else(current_timestamp);

    let items = collect_all_pages(source, media_id, options.page_size)
        .await
        .map_err(Error::ListingFetch)?;

    let mut new_entries = Vec::new();
    for item in items {
        let Some(key) = item.identity_key() else {
            // Listings can contain non-downloadable placeholders.
            tracing::debug!(title = %item.title, "listing item has no identity, skipping");
            continue;
        };
        if !known_keys.insert(key.clone()) {
            continue;
        }
        new_entries.push(VideoEntry {
            key,
            title: item.title.trim().to_string(),
            folder_title: folder.title.clone(),
            timestamp: timestamp.clone(),
            aid: item.id,
        });
    }

    if new_entries.is_empty() {
        if !options.csv_path.exists() {
            ledger::create_empty(&options.csv_path, &options.encoding)?;
        }
    } else {
        let written = ledger::append_entries(&options.csv_path, &options.encoding, &new_entries)?;
        tracing::info!(written, path = %options.csv_path.display(), "appended new entries");
    }

    Ok(ExportOutcome {
        csv_path: options.csv_path.clone(),
        folder,
        new_entries,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MediaPage;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory `FavSource` serving fixed pages.
    struct FakeSource {
        title: String,
        pages: Vec<MediaPage>,
        fail_info: bool,
        fail_page: Option<u32>,
        requested_pages: Mutex<Vec<u32>>,
    }

    impl FakeSource {
        fn with_pages(pages: Vec<MediaPage>) -> Self {
            Self {
                title: "Favorites".to_string(),
                pages,
                fail_info: false,
                fail_page: None,
                requested_pages: Mutex::new(Vec::new()),
            }
        }

        fn single_page(items: Vec<RawMediaItem>) -> Self {
            Self::with_pages(vec![MediaPage {
                items,
                has_more: false,
            }])
        }
    }

    fn api_failure(endpoint: &str) -> ApiError {
        ApiError::Status {
            endpoint: endpoint.to_string(),
            code: -400,
            message: "boom".to_string(),
        }
    }

    impl FavSource for FakeSource {
        fn folder_info(
            &self,
            media_id: u64,
        ) -> impl std::future::Future<Output = std::result::Result<FolderInfo, ApiError>> + Send
        {
            async move {
                if self.fail_info {
                    return Err(api_failure("info"));
                }
                Ok(FolderInfo {
                    media_id,
                    fid: 0,
                    mid: 7,
                    title: self.title.clone(),
                    media_count: self.pages.iter().map(|p| p.items.len() as u64).sum(),
                })
            }
        }

        fn list_page(
            &self,
            _media_id: u64,
            page: u32,
            _page_size: u32,
        ) -> impl std::future::Future<Output = std::result::Result<MediaPage, ApiError>> + Send
        {
            async move {
                self.requested_pages.lock().unwrap().push(page);
                if self.fail_page == Some(page) {
                    return Err(api_failure("list"));
                }
                Ok(self
                    .pages
                    .get((page - 1) as usize)
                    .cloned()
                    .unwrap_or_default())
            }
        }
    }

    fn bv(key: &str, title: &str) -> RawMediaItem {
        RawMediaItem {
            bv_id: Some(key.to_string()),
            bvid: None,
            id: None,
            title: title.to_string(),
        }
    }

    fn options(csv_path: &Path) -> ExportOptions {
        ExportOptions {
            fav_url: "https://space.bilibili.com/7/favlist?fid=42".to_string(),
            csv_path: csv_path.to_path_buf(),
            encoding: "utf-8".to_string(),
            page_size: 40,
            timestamp: Some("2026-01-05T10-00-00".to_string()),
        }
    }

    fn run<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Runtime::new().unwrap().block_on(future)
    }

    #[test]
    fn test_single_page_export_to_fresh_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("favlist.csv");
        let source = FakeSource::single_page(vec![bv("BV123", "x")]);

        let outcome = run(export_folder(&source, &options(&csv_path))).unwrap();

        assert_eq!(outcome.new_entries.len(), 1);
        assert_eq!(outcome.new_entries[0].key, "BV123");
        assert_eq!(outcome.new_entries[0].folder_title, "Favorites");
        assert_eq!(outcome.timestamp, "2026-01-05T10-00-00");

        let content = fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "timestamp,identity_key,title,folder_name");
        assert_eq!(lines[1], "2026-01-05T10-00-00,BV123,x,Favorites");
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("favlist.csv");
        let opts = options(&csv_path);

        let source = FakeSource::single_page(vec![bv("BV1", "a"), bv("BV2", "b")]);
        let first = run(export_folder(&source, &opts)).unwrap();
        assert_eq!(first.new_entries.len(), 2);

        let source = FakeSource::single_page(vec![bv("BV1", "a"), bv("BV2", "b")]);
        let second = run(export_folder(&source, &opts)).unwrap();
        assert!(second.new_entries.is_empty());

        let content = fs::read_to_string(&csv_path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_duplicate_key_across_pages_accepted_once() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("favlist.csv");
        let source = FakeSource::with_pages(vec![
            MediaPage {
                items: vec![bv("BV1", "a")],
                has_more: true,
            },
            MediaPage {
                items: vec![bv("BV1", "a again"), bv("BV2", "b")],
                has_more: false,
            },
        ]);

        let outcome = run(export_folder(&source, &options(&csv_path))).unwrap();

        let keys: Vec<_> = outcome.new_entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["BV1", "BV2"]);
        assert_eq!(*source.requested_pages.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_walk_stops_on_has_more_false_even_when_page_full() {
        let source = FakeSource::with_pages(vec![MediaPage {
            items: (0..40).map(|i| bv(&format!("BV{i}"), "t")).collect(),
            has_more: false,
        }]);

        let items = run(collect_all_pages(&source, 42, 40)).unwrap();
        assert_eq!(items.len(), 40);
        assert_eq!(*source.requested_pages.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_items_without_identity_are_dropped_silently() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("favlist.csv");
        let source = FakeSource::single_page(vec![
            RawMediaItem {
                title: "placeholder".to_string(),
                ..RawMediaItem::default()
            },
            bv("BV9", "  spaced title  "),
        ]);

        let outcome = run(export_folder(&source, &options(&csv_path))).unwrap();
        assert_eq!(outcome.new_entries.len(), 1);
        assert_eq!(outcome.new_entries[0].key, "BV9");
        assert_eq!(outcome.new_entries[0].title, "spaced title");
    }

    #[test]
    fn test_empty_folder_still_creates_header_only_ledger() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("favlist.csv");
        let source = FakeSource::single_page(Vec::new());

        let outcome = run(export_folder(&source, &options(&csv_path))).unwrap();
        assert!(outcome.new_entries.is_empty());
        assert_eq!(
            fs::read_to_string(&csv_path).unwrap(),
            "timestamp,identity_key,title,folder_name\n"
        );
    }

    #[test]
    fn test_metadata_failure_aborts_before_any_write() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("favlist.csv");
        let mut source = FakeSource::single_page(vec![bv("BV1", "a")]);
        source.fail_info = true;

        let result = run(export_folder(&source, &options(&csv_path)));
        assert!(matches!(result, Err(Error::MetadataFetch(_))));
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_listing_failure_leaves_existing_ledger_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("favlist.csv");
        fs::write(
            &csv_path,
            "timestamp,identity_key,title,folder_name\nt,BV1,a,f\n",
        )
        .unwrap();
        let before = fs::read_to_string(&csv_path).unwrap();

        let mut source = FakeSource::with_pages(vec![
            MediaPage {
                items: vec![bv("BV2", "b")],
                has_more: true,
            },
            MediaPage::default(),
        ]);
        source.fail_page = Some(2);

        let result = run(export_folder(&source, &options(&csv_path)));
        assert!(matches!(result, Err(Error::ListingFetch(_))));
        assert_eq!(fs::read_to_string(&csv_path).unwrap(), before);
    }

    #[test]
    fn test_all_rows_share_the_run_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let csv_path = temp_dir.path().join("favlist.csv");
        let mut opts = options(&csv_path);
        opts.timestamp = None;

        let source = FakeSource::single_page(vec![bv("BV1", "a"), bv("BV2", "b")]);
        let outcome = run(export_folder(&source, &opts)).unwrap();

        assert_eq!(outcome.new_entries[0].timestamp, outcome.timestamp);
        assert_eq!(outcome.new_entries[1].timestamp, outcome.timestamp);
    }
}
