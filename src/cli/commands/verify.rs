//! Verify command: find ledger entries with no matching local file.

use std::collections::HashSet;
use std::path::PathBuf;

use colored::Colorize;

use crate::config::{resolve_config_path, ConfigStore};
use crate::downloader::{BbdownRunner, Downloader};
use crate::error::{Error, Result};
use crate::inventory;
use crate::ledger;
use crate::sync::missing_locally;

/// Scan the download directory, write the inventory side file, and
/// re-download every ledger entry missing from disk.
pub fn execute(
    index: usize,
    config_path: Option<&PathBuf>,
    json: bool,
    dry_run: bool,
) -> Result<()> {
    let store = ConfigStore::load(resolve_config_path(config_path.map(PathBuf::as_path)));
    let folder = store.get_listed(index)?;

    if !folder.download_dir.exists() {
        return Err(Error::Config(format!(
            "download directory {} does not exist; edit the folder first",
            folder.download_dir.display()
        )));
    }

    let mapping = inventory::scan_directory_keys(&folder.download_dir);
    let inventory_path = inventory::write_inventory_file(&folder.download_dir, &mapping)?;
    tracing::info!(path = %inventory_path.display(), keys = mapping.len(), "inventory written");

    let rows = ledger::read_rows(&folder.csv_path, &folder.encoding)?;
    let existing: HashSet<String> = mapping.keys().cloned().collect();
    let missing = missing_locally(&rows, &existing);

    let runner = BbdownRunner::new();
    let mut downloaded = 0;
    let mut failed = Vec::new();
    for row in &missing {
        let Some(key) = row.identity_key() else {
            continue;
        };
        match runner.download(key, &folder.download_dir, dry_run) {
            Ok(()) => downloaded += 1,
            Err(err) => {
                tracing::warn!(key, error = %err, "download failed, continuing");
                failed.push(key.to_string());
            }
        }
    }

    if json {
        let output = serde_json::json!({
            "success": true,
            "index": index,
            "inventory": inventory_path.display().to_string(),
            "local_keys": existing.len(),
            "missing": missing.len(),
            "downloaded": downloaded,
            "failed": failed,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Inventory written to {}", inventory_path.display());
    if missing.is_empty() {
        println!("{} no missing videos.", "Done:".green());
    } else {
        println!(
            "{} {} missing videos, {} handed to the downloader.",
            "Done:".green(),
            missing.len(),
            downloaded
        );
    }
    for key in &failed {
        eprintln!("{} download failed for {key}", "warning:".red());
    }
    Ok(())
}
