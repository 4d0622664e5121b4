//! Folder synchronization.
//!
//! This module holds the reconciliation core of the tool:
//!
//! - **Export**: walk the remote listing, filter through the ledger's dedup
//!   set, append only new rows
//! - **Diff**: new-vs-old snapshot diff and missing-vs-filesystem diff
//! - **Update**: backup → resync → reconcile, restoring the backup when the
//!   resync fails
//! - **Timestamp**: the per-run stamp shared by rows and ledger file names
//!
//! # Guarantees
//!
//! An export either computes and appends the complete set of new entries or
//! fails before any ledger write. The update flow never leaves the ledger
//! worse than before the attempt: it either advances with a computed diff
//! or restores the pre-attempt file exactly.
//!
//! # Example
//!
//! ```ignore
//! use bfav::sync::{export_folder, run_update, ExportOptions};
//!
//! let outcome = export_folder(&client, &options).await?;
//! println!("{} new entries", outcome.new_entries.len());
//!
//! let update = run_update(&client, &runner, &folder_config, false).await?;
//! println!("{} downloaded, {} failed", update.downloaded, update.failed.len());
//! ```

mod diff;
mod export;
mod timestamp;
mod update;

// Re-export main types and functions
pub use diff::{ledger_keys, missing_locally, new_entries};
pub use export::{collect_all_pages, export_folder, ExportOptions, ExportOutcome};
pub use timestamp::{current_timestamp, ledger_filename, TS_FORMAT};
pub use update::{backup_path, run_update, LedgerBackup, UpdateOutcome};
