//! Update command: resync a registered folder and download the delta.

use std::path::PathBuf;

use colored::Colorize;

use crate::config::{resolve_config_path, ConfigStore};
use crate::downloader::BbdownRunner;
use crate::error::Result;
use crate::sync::run_update;

use super::{client_for, runtime};

/// Execute the update flow for the folder at `index`.
pub fn execute(
    index: usize,
    config_path: Option<&PathBuf>,
    json: bool,
    dry_run: bool,
) -> Result<()> {
    let mut store = ConfigStore::load(resolve_config_path(config_path.map(PathBuf::as_path)));
    let folder = store.get_listed(index)?.clone();

    let client = client_for(folder.cookie.as_deref(), folder.timeout_secs)?;
    let runner = BbdownRunner::new();

    let outcome = runtime()?.block_on(run_update(&client, &runner, &folder, dry_run))?;

    // The run succeeded: advance the registered ledger path.
    let mut updated = folder;
    updated.csv_path = outcome.export.csv_path.clone();
    updated.last_synced_at = Some(outcome.export.timestamp.clone());
    store.update_listed(index, updated)?;

    if json {
        let output = serde_json::json!({
            "success": true,
            "index": index,
            "folder": outcome.export.folder.title,
            "csv_path": outcome.export.csv_path.display().to_string(),
            "new_entries": outcome.diff.len(),
            "downloaded": outcome.downloaded,
            "failed": outcome.failed,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if outcome.diff.is_empty() {
        println!("{} no new entries.", "Done:".green());
    } else {
        println!(
            "{} {} new entries, {} handed to the downloader.",
            "Done:".green(),
            outcome.diff.len(),
            outcome.downloaded
        );
    }
    for key in &outcome.failed {
        eprintln!("{} download failed for {key}", "warning:".red());
    }
    println!("  Ledger: {}", outcome.export.csv_path.display());
    Ok(())
}
