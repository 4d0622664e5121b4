//! Folder registration and management commands.

use std::env;
use std::fs;
use std::path::PathBuf;

use colored::Colorize;

use crate::cli::{FolderAddArgs, FolderCommands, FolderEditArgs};
use crate::config::{resolve_config_path, ConfigStore, FavFolderConfig};
use crate::error::Result;
use crate::sync::{current_timestamp, export_folder, ledger_filename, ExportOptions};

use super::{client_for, runtime};

/// Execute folder commands.
pub fn execute(command: &FolderCommands, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        FolderCommands::Add(args) => add(args, config_path, json),
        FolderCommands::List => list(config_path, json),
        FolderCommands::Edit(args) => edit(args, config_path, json),
        FolderCommands::Remove { index } => remove(*index, config_path, json),
    }
}

fn add(args: &FolderAddArgs, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = ConfigStore::load(resolve_config_path(config_path.map(PathBuf::as_path)));

    let download_dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };
    fs::create_dir_all(&download_dir)?;

    let timestamp = current_timestamp();
    let csv_path = download_dir.join(ledger_filename(&timestamp));

    let options = ExportOptions {
        fav_url: args.url.clone(),
        csv_path,
        encoding: args.encoding.clone(),
        page_size: args.page_size,
        timestamp: Some(timestamp),
    };

    let client = client_for(args.cookie.as_deref(), args.timeout)?;
    let outcome = runtime()?.block_on(export_folder(&client, &options))?;

    let mut config = FavFolderConfig::new(args.url.clone(), download_dir, outcome.csv_path.clone());
    config.encoding = args.encoding.clone();
    config.page_size = args.page_size;
    config.cookie = args.cookie.clone();
    config.timeout_secs = args.timeout;
    config.name = args.name.clone();
    config.last_synced_at = Some(outcome.timestamp.clone());
    store.add(config)?;

    if json {
        let output = serde_json::json!({
            "success": true,
            "index": store.len(),
            "folder": outcome.folder.title,
            "csv_path": outcome.csv_path.display().to_string(),
            "new_entries": outcome.new_entries.len(),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "{} '{}' registered as folder {} ({} entries exported).",
            "Done:".green(),
            outcome.folder.title,
            store.len(),
            outcome.new_entries.len()
        );
        println!("  Ledger: {}", outcome.csv_path.display());
    }
    Ok(())
}

fn list(config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let store = ConfigStore::load(resolve_config_path(config_path.map(PathBuf::as_path)));

    if json {
        let folders: Vec<_> = store
            .folders()
            .iter()
            .enumerate()
            .map(|(i, folder)| {
                serde_json::json!({
                    "index": i + 1,
                    "name": folder.display_name(i + 1),
                    "fav_url": folder.fav_url,
                    "download_dir": folder.download_dir.display().to_string(),
                    "csv_path": folder.csv_path.display().to_string(),
                    "last_synced_at": folder.last_synced_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string(&folders)?);
        return Ok(());
    }

    if store.is_empty() {
        println!("No folders registered. Add one: bfav folder add <url>");
        return Ok(());
    }

    for (i, folder) in store.folders().iter().enumerate() {
        let index = i + 1;
        println!("{index}. {} -> {}", folder.display_name(index), folder.fav_url);
        println!("   ledger: {}", folder.csv_path.display());
        if let Some(synced) = &folder.last_synced_at {
            println!("   last synced: {synced}");
        }
    }
    Ok(())
}

fn edit(args: &FolderEditArgs, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = ConfigStore::load(resolve_config_path(config_path.map(PathBuf::as_path)));
    let mut config = store.get_listed(args.index)?.clone();

    if let Some(url) = &args.url {
        config.fav_url = url.clone();
    }
    if let Some(dir) = &args.dir {
        fs::create_dir_all(dir)?;
        config.download_dir = dir.clone();
    }
    if let Some(csv) = &args.csv {
        config.csv_path = csv.clone();
    }
    if let Some(name) = &args.name {
        // '-' clears the optional field.
        config.name = (name != "-").then(|| name.clone());
    }
    if let Some(encoding) = &args.encoding {
        config.encoding = encoding.clone();
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(cookie) = &args.cookie {
        config.cookie = (cookie != "-").then(|| cookie.clone());
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    store.update_listed(args.index, config)?;

    if json {
        println!(
            "{}",
            serde_json::json!({"success": true, "index": args.index})
        );
    } else {
        println!("{} folder {} updated.", "Done:".green(), args.index);
    }
    Ok(())
}

fn remove(index: usize, config_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let mut store = ConfigStore::load(resolve_config_path(config_path.map(PathBuf::as_path)));
    let removed = store.remove_listed(index)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "success": true,
                "removed": removed.display_name(index),
            })
        );
    } else {
        println!(
            "{} removed '{}' (files on disk were kept).",
            "Done:".green(),
            removed.display_name(index)
        );
    }
    Ok(())
}
