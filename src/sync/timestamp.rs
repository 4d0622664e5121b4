//! Run timestamps and ledger file naming.
//!
//! One timestamp is established per sync run, before pagination begins, and
//! shared by every row the run produces. The format is filesystem-safe
//! (dashes instead of colons) because the stamp doubles as the ledger file
//! name prefix.

use chrono::Local;

/// Timestamp format shared by ledger rows and ledger file names.
pub const TS_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Current local time in [`TS_FORMAT`].
#[must_use]
pub fn current_timestamp() -> String {
    Local::now().format(TS_FORMAT).to_string()
}

/// Ledger file name for a run timestamp.
#[must_use]
pub fn ledger_filename(timestamp: &str) -> String {
    format!("{timestamp}-favlist.csv")
}
