//! One-off export command implementation.

use std::env;

use colored::Colorize;

use crate::cli::ExportArgs;
use crate::error::Result;
use crate::sync::{current_timestamp, export_folder, ledger_filename, ExportOptions};

use super::{client_for, runtime};

/// Export a favlist to a CSV ledger without registering it.
pub fn execute(args: &ExportArgs, json: bool) -> Result<()> {
    let timestamp = current_timestamp();
    let csv_path = match &args.csv {
        Some(path) => path.clone(),
        None => {
            let dir = match &args.dir {
                Some(dir) => dir.clone(),
                None => env::current_dir()?,
            };
            dir.join(ledger_filename(&timestamp))
        }
    };

    let options = ExportOptions {
        fav_url: args.url.clone(),
        csv_path,
        encoding: args.encoding.clone(),
        page_size: args.page_size,
        timestamp: Some(timestamp),
    };

    let client = client_for(args.cookie.as_deref(), args.timeout)?;
    let outcome = runtime()?.block_on(export_folder(&client, &options))?;

    if json {
        let output = serde_json::json!({
            "success": true,
            "folder": outcome.folder.title,
            "csv_path": outcome.csv_path.display().to_string(),
            "new_entries": outcome.new_entries.len(),
            "timestamp": outcome.timestamp,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if outcome.new_entries.is_empty() {
        println!("{} no new entries in '{}'.", "Done:".green(), outcome.folder.title);
    } else {
        println!(
            "{} exported {} new entries from '{}'.",
            "Done:".green(),
            outcome.new_entries.len(),
            outcome.folder.title
        );
    }
    println!("  Ledger: {}", outcome.csv_path.display());
    Ok(())
}
