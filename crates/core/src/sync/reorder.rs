//! Reordering of raw change sets into dependency-safe table order.

use super::changeset::{ChangeSet, TableChanges};
use super::tables::{is_excluded, order_index};

/// Reorder `changes` for applying or pushing.
///
/// Tables named in [`super::SYNC_TABLE_ORDER`] come first, in that relative
/// order. Tables the order does not know are appended afterwards, keeping
/// their original relative order. Excluded tables are dropped entirely,
/// wherever they appeared. Both sync directions go through this so
/// inclusion is symmetric.
pub fn reorder_for_sync(changes: ChangeSet) -> ChangeSet {
    let mut listed: Vec<(usize, (String, TableChanges))> = Vec::new();
    let mut unlisted: Vec<(String, TableChanges)> = Vec::new();

    for (table, table_changes) in changes.into_entries() {
        if is_excluded(&table) {
            continue;
        }
        match order_index(&table) {
            Some(position) => listed.push((position, (table, table_changes))),
            None => unlisted.push((table, table_changes)),
        }
    }

    // sort_by_key is stable; a duplicate position cannot occur since a
    // ChangeSet holds one entry per table.
    listed.sort_by_key(|(position, _)| *position);

    listed
        .into_iter()
        .map(|(_, entry)| entry)
        .chain(unlisted)
        .collect()
}
