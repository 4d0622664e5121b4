//! Data types for folders, listing items, and ledger entries.

use serde::{Deserialize, Serialize};

/// Prefix used when synthesizing an identity key from a bare numeric id.
pub const NUMERIC_KEY_PREFIX: &str = "av";

/// Remote folder metadata.
///
/// Fetched once per sync and not persisted beyond it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    /// Folder (favlist) identifier.
    pub media_id: u64,
    /// Short folder id as reported by the API.
    #[serde(default)]
    pub fid: u64,
    /// Owner account id.
    #[serde(default)]
    pub mid: u64,
    /// Display title.
    pub title: String,
    /// Declared number of items in the folder.
    #[serde(default)]
    pub media_count: u64,
}

/// One item of the remote folder listing, as returned by the API.
///
/// The identity-bearing field shows up under two spellings depending on the
/// API era, and is absent entirely for some non-video entries; all three
/// cases are modeled as explicit optionals rather than probed ad hoc.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMediaItem {
    /// Primary identity field.
    #[serde(default)]
    pub bv_id: Option<String>,
    /// Alternate spelling used by older listing responses.
    #[serde(default)]
    pub bvid: Option<String>,
    /// Numeric av-id; fallback identity source.
    #[serde(default)]
    pub id: Option<i64>,
    /// Item title.
    #[serde(default)]
    pub title: String,
}

impl RawMediaItem {
    /// Resolve the canonical identity key for this item.
    ///
    /// Resolution order: `bv_id`, then `bvid` (both trimmed, empty values
    /// ignored), then `av{id}` synthesized from the numeric id. Returns
    /// `None` when no identity can be derived; the item is skipped, since
    /// listings may contain non-downloadable placeholder entries.
    #[must_use]
    pub fn identity_key(&self) -> Option<String> {
        for candidate in [&self.bv_id, &self.bvid] {
            if let Some(value) = candidate {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
        self.id.map(|aid| format!("{NUMERIC_KEY_PREFIX}{aid}"))
    }
}

/// One accepted ledger row.
///
/// Built by the export engine once an identity key is resolved; appended to
/// the ledger and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoEntry {
    /// Canonical identity key (BV code or synthesized `av…` key).
    pub key: String,
    /// Video title, trimmed.
    pub title: String,
    /// Title of the folder the entry was exported from.
    pub folder_title: String,
    /// The sync run's timestamp; identical for every row of one run.
    pub timestamp: String,
    /// Numeric av-id, when the listing carried one.
    pub aid: Option<i64>,
}
