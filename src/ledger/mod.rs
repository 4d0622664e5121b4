//! CSV ledger codec.
//!
//! The ledger is an append-only CSV file, one row per accepted video,
//! keyed by identity key. Key uniqueness is a dedup invariant enforced by
//! the export engine, not a file-format constraint: the codec itself will
//! write whatever it is handed.
//!
//! # Header Tolerance
//!
//! Newly created ledgers use the canonical header
//! `timestamp,identity_key,title,folder_name`. Two earlier schema eras named
//! the key column `bv_id` and `BV号`; reads recognize all three spellings and
//! fall back to the canonical name when none match (which may legitimately
//! yield an empty key set for a foreign file).
//!
//! # Encodings
//!
//! Ledgers written by older tooling on Windows are frequently `gbk`; the
//! caller picks the encoding by label (`utf-8`, `gbk`, ...). Bytes that do
//! not decode under the requested encoding are a hard error, never a silent
//! empty result.
//!
//! Appends are not transactional across a process crash: a crash mid-write
//! can leave a partial last row. Accepted operational risk for this tool.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Result};
use crate::model::VideoEntry;

/// Canonical column order for newly created ledgers.
pub const FIELDNAMES: [&str; 4] = ["timestamp", "identity_key", "title", "folder_name"];

/// Recognized spellings of the identity column, canonical first.
pub const KEY_ALIASES: [&str; 3] = ["identity_key", "bv_id", "BV号"];

/// One ledger row read back from disk, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerRow {
    /// Field values by column name, values trimmed.
    pub fields: HashMap<String, String>,
}

impl LedgerRow {
    /// Build a row from `(column, value)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    /// Look up a column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Resolve this row's identity key.
    ///
    /// Aliases are tried in [`KEY_ALIASES`] order; the first non-empty value
    /// wins. Rows without any resolvable key return `None`.
    #[must_use]
    pub fn identity_key(&self) -> Option<&str> {
        KEY_ALIASES
            .iter()
            .find_map(|alias| self.get(alias).map(str::trim).filter(|v| !v.is_empty()))
    }
}

/// Load the set of identity keys already recorded in a ledger.
///
/// A missing file yields an empty set. The key column is chosen once from
/// the header row (first [`KEY_ALIASES`] match); when no alias is present the
/// set is empty.
///
/// # Errors
///
/// Returns an error if the encoding label is unknown, the file cannot be
/// read, or its bytes do not decode under the requested encoding.
pub fn load_existing_keys(path: &Path, encoding: &str) -> Result<HashSet<String>> {
    let Some(text) = read_decoded(path, encoding)? else {
        return Ok(HashSet::new());
    };

    let mut records = parse_records(&text).into_iter();
    let Some(header) = records.next() else {
        return Ok(HashSet::new());
    };

    let Some(key_index) = header
        .iter()
        .position(|name| KEY_ALIASES.contains(&name.as_str()))
    else {
        return Ok(HashSet::new());
    };

    let mut existing = HashSet::new();
    for record in records {
        if let Some(value) = record.get(key_index) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                existing.insert(trimmed.to_string());
            }
        }
    }
    Ok(existing)
}

/// Read all ledger rows in file order.
///
/// A missing file yields an empty list. Values are trimmed; column names are
/// kept as written so alias resolution can happen per row.
///
/// # Errors
///
/// Same failure modes as [`load_existing_keys`].
pub fn read_rows(path: &Path, encoding: &str) -> Result<Vec<LedgerRow>> {
    let Some(text) = read_decoded(path, encoding)? else {
        return Ok(Vec::new());
    };

    let mut records = parse_records(&text).into_iter();
    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };

    let rows = records
        .map(|record| LedgerRow {
            fields: header
                .iter()
                .zip(record.iter())
                .map(|(name, value)| (name.clone(), value.trim().to_string()))
                .collect(),
        })
        .collect();
    Ok(rows)
}

/// Append entries to a ledger, creating it (with a header row) on first use.
///
/// An empty slice is a no-op returning 0 and the file is not touched.
/// Entries are written in input order, one row each.
///
/// # Errors
///
/// Returns an error if the encoding label is unknown, the rows cannot be
/// represented in the requested encoding, or a file operation fails.
pub fn append_entries(path: &Path, encoding: &str, entries: &[VideoEntry]) -> Result<usize> {
    if entries.is_empty() {
        return Ok(0);
    }

    let enc = resolve_encoding(encoding)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let is_new_file = !path.exists();
    let mut out = String::new();
    if is_new_file {
        push_record(&mut out, &FIELDNAMES);
    }
    for entry in entries {
        push_record(
            &mut out,
            &[
                entry.timestamp.as_str(),
                entry.key.as_str(),
                entry.title.as_str(),
                entry.folder_title.as_str(),
            ],
        );
    }

    let bytes = encode_text(&out, enc, path, encoding)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&bytes)?;
    Ok(entries.len())
}

/// Create a header-only ledger.
///
/// Used when a sync finds nothing new but no ledger exists yet, so that
/// downstream tooling can always open a schema-conformant file.
///
/// # Errors
///
/// Returns an error if the encoding label is unknown or the file cannot be
/// written.
pub fn create_empty(path: &Path, encoding: &str) -> Result<()> {
    let enc = resolve_encoding(encoding)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = String::new();
    push_record(&mut out, &FIELDNAMES);
    let bytes = encode_text(&out, enc, path, encoding)?;

    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| Error::EncodingUnsupported {
        label: label.to_string(),
    })
}

/// Read and decode a ledger file; `None` when the file does not exist.
fn read_decoded(path: &Path, encoding: &str) -> Result<Option<String>> {
    let enc = resolve_encoding(encoding)?;
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let (text, _, had_errors) = enc.decode(&bytes);
    if had_errors {
        return Err(Error::LedgerDecode {
            path: path.to_path_buf(),
            encoding: encoding.to_string(),
        });
    }
    Ok(Some(text.into_owned()))
}

fn encode_text(text: &str, enc: &'static Encoding, path: &Path, label: &str) -> Result<Vec<u8>> {
    if enc == UTF_8 {
        return Ok(text.as_bytes().to_vec());
    }
    let (bytes, _, had_errors) = enc.encode(text);
    if had_errors {
        return Err(Error::LedgerEncode {
            path: path.to_path_buf(),
            encoding: label.to_string(),
        });
    }
    Ok(bytes.into_owned())
}

/// Escape a value for CSV (quote if it contains commas, quotes, or newlines).
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn push_record(out: &mut String, fields: &[&str]) {
    let line = fields.iter().map(|f| csv_escape(f)).collect::<Vec<_>>().join(",");
    out.push_str(&line);
    out.push('\n');
}

/// Parse CSV text into records of fields.
///
/// Handles quoted fields, doubled-quote escapes, embedded commas and
/// newlines, and CRLF line endings. Blank lines are dropped.
fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_record(&mut records, &mut record, &mut field);
            }
            '\n' => end_record(&mut records, &mut record, &mut field),
            _ => field.push(c),
        }
    }
    end_record(&mut records, &mut record, &mut field);
    records
}

fn end_record(records: &mut Vec<Vec<String>>, record: &mut Vec<String>, field: &mut String) {
    record.push(std::mem::take(field));
    // A lone empty field is a blank line, not a record.
    if record.len() > 1 || !record[0].is_empty() {
        records.push(std::mem::take(record));
    } else {
        record.clear();
    }
}
