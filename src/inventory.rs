//! Local-file inventory: which identity keys already exist on disk.
//!
//! Downloaded videos carry their BV code in the file name, so a recursive
//! filename scan recovers the set of locally present keys without opening a
//! single file. The scan result is also written to a plain-text side file
//! inside the scanned directory for manual inspection.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

/// File name of the inventory side file, written into the scanned directory.
pub const INVENTORY_FILENAME: &str = "existing_videos.txt";

static BV_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(BV[0-9A-Za-z]{10})").expect("BV pattern"));

/// Extract every BV code occurring in a piece of text.
#[must_use]
pub fn extract_keys(text: &str) -> Vec<String> {
    BV_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Recursively scan a directory, mapping each identity key found in a file
/// name to the files carrying it.
///
/// Unreadable directory entries are skipped.
pub fn scan_directory_keys(directory: &Path) -> HashMap<String, Vec<PathBuf>> {
    let mut mapping: HashMap<String, Vec<PathBuf>> = HashMap::new();
    for entry in WalkDir::new(directory).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        for key in extract_keys(&name) {
            mapping.entry(key).or_default().push(entry.path().to_path_buf());
        }
    }
    mapping
}

/// Write the inventory side file for a scan result.
///
/// Format: one comment header line, then `key<TAB>filename` per (key, file)
/// pair sorted by key; a placeholder line when nothing was found. Returns
/// the file's path.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_inventory_file(
    directory: &Path,
    mapping: &HashMap<String, Vec<PathBuf>>,
) -> io::Result<PathBuf> {
    let inventory_path = directory.join(INVENTORY_FILENAME);
    let mut file = File::create(&inventory_path)?;

    writeln!(file, "# identity keys found in local file names")?;
    if mapping.is_empty() {
        writeln!(file, "(no files carrying an identity key were found)")?;
    } else {
        let mut entries: Vec<_> = mapping.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (key, paths) in entries {
            for path in paths {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    writeln!(file, "{key}\t{name}")?;
                }
            }
        }
    }
    Ok(inventory_path)
}
