//! Reconciliation diffs between ledger snapshots.
//!
//! Both diffs are pure: they take rows already read by the ledger codec and
//! perform set-membership filtering only. Each row's key is resolved with
//! the same alias fallback the codec uses ([`LedgerRow::identity_key`]);
//! rows without a resolvable key are skipped.

use std::collections::HashSet;

use crate::ledger::LedgerRow;

/// Extract the identity-key set of a ledger snapshot.
#[must_use]
pub fn ledger_keys(rows: &[LedgerRow]) -> HashSet<String> {
    rows.iter()
        .filter_map(|row| row.identity_key().map(str::to_string))
        .collect()
}

/// Rows of the new snapshot whose key is absent from the old snapshot.
///
/// Used after a resync to compute exactly what must be downloaded. Order is
/// new-snapshot row order.
#[must_use]
pub fn new_entries(old_rows: &[LedgerRow], new_rows: &[LedgerRow]) -> Vec<LedgerRow> {
    let old_keys = ledger_keys(old_rows);
    new_rows
        .iter()
        .filter(|row| {
            row.identity_key()
                .is_some_and(|key| !old_keys.contains(key))
        })
        .cloned()
        .collect()
}

/// Ledger rows whose key has no matching local file.
///
/// `existing_keys` comes from a filename scan of the download directory
/// (see [`crate::inventory`]). Detects local file loss independent of any
/// resync. Order is ledger row order.
#[must_use]
pub fn missing_locally(rows: &[LedgerRow], existing_keys: &HashSet<String>) -> Vec<LedgerRow> {
    rows.iter()
        .filter(|row| {
            row.identity_key()
                .is_some_and(|key| !existing_keys.contains(key))
        })
        .cloned()
        .collect()
}
