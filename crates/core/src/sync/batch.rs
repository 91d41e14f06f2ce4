//! Push batch planning.

use serde::{Deserialize, Serialize};

use super::changeset::{ChangeSet, Record, RecordId};

/// Maximum total row count allowed in one push request.
pub const PUSH_BATCH_LIMIT: usize = 50;

/// Kind of change an operation carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Items carried by one operation: full rows for created/updated, bare ids
/// for deleted.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationItems {
    Rows(Vec<Record>),
    Ids(Vec<RecordId>),
}

impl OperationItems {
    pub fn len(&self) -> usize {
        match self {
            OperationItems::Rows(rows) => rows.len(),
            OperationItems::Ids(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split off the tail starting at `at`, leaving the head in place.
    fn split_off(&mut self, at: usize) -> OperationItems {
        match self {
            OperationItems::Rows(rows) => OperationItems::Rows(rows.split_off(at)),
            OperationItems::Ids(ids) => OperationItems::Ids(ids.split_off(at)),
        }
    }

    fn extend(&mut self, other: OperationItems) {
        match (self, other) {
            (OperationItems::Rows(rows), OperationItems::Rows(more)) => rows.extend(more),
            (OperationItems::Ids(ids), OperationItems::Ids(more)) => ids.extend(more),
            // A table+kind pair always carries one item shape; reaching this
            // would mean the flattening emitted mismatched slices.
            _ => unreachable!("mismatched operation item shapes for one table+kind"),
        }
    }
}

/// One contiguous run of same-table, same-kind items within a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PushOperation {
    pub table: String,
    pub kind: ChangeKind,
    pub items: OperationItems,
}

/// One request-sized slice of a change set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushBatch {
    operations: Vec<PushOperation>,
}

impl PushBatch {
    pub fn operations(&self) -> &[PushOperation] {
        &self.operations
    }

    /// Total row count across all operations.
    pub fn item_count(&self) -> usize {
        self.operations.iter().map(|op| op.items.len()).sum()
    }

    /// Reassemble the batch into the wire `changes` shape.
    ///
    /// The push contract wants every table to carry all three arrays, so a
    /// kind with no rows in this batch still shows up empty.
    pub fn to_change_set(&self) -> ChangeSet {
        let mut changes = ChangeSet::new();
        for op in &self.operations {
            let table = changes.entry(&op.table);
            match (&op.kind, &op.items) {
                (ChangeKind::Created, OperationItems::Rows(rows)) => {
                    table.created.extend(rows.iter().cloned())
                }
                (ChangeKind::Updated, OperationItems::Rows(rows)) => {
                    table.updated.extend(rows.iter().cloned())
                }
                (ChangeKind::Deleted, OperationItems::Ids(ids)) => {
                    table.deleted.extend(ids.iter().cloned())
                }
                _ => unreachable!("mismatched operation item shapes for one table+kind"),
            }
        }
        changes
    }

    /// Append, merging into the trailing operation when table and kind match
    /// so consecutive slices never duplicate an entry.
    fn push(&mut self, table: &str, kind: ChangeKind, items: OperationItems) {
        if let Some(last) = self.operations.last_mut() {
            if last.table == table && last.kind == kind {
                last.items.extend(items);
                return;
            }
        }
        self.operations.push(PushOperation {
            table: table.to_string(),
            kind,
            items,
        });
    }
}

/// Split `changes` into push batches of at most `limit` total items.
///
/// A change set that fits in one batch is passed through whole, every table
/// with all three kinds, so the single request equals the normalized input.
/// Larger sets are flattened into operations in encounter order and packed
/// greedily: when an operation does not fit, the slice that fits closes the
/// current batch and the remainder continues into the next one.
pub fn plan_push_batches(changes: &ChangeSet, limit: usize) -> Vec<PushBatch> {
    if changes.is_empty() {
        return Vec::new();
    }

    if changes.total_item_count() <= limit {
        let mut batch = PushBatch::default();
        for (table, table_changes) in changes.iter() {
            batch.push(
                table,
                ChangeKind::Created,
                OperationItems::Rows(table_changes.created.clone()),
            );
            batch.push(
                table,
                ChangeKind::Updated,
                OperationItems::Rows(table_changes.updated.clone()),
            );
            batch.push(
                table,
                ChangeKind::Deleted,
                OperationItems::Ids(table_changes.deleted.clone()),
            );
        }
        return vec![batch];
    }

    let mut batches: Vec<PushBatch> = Vec::new();
    let mut current = PushBatch::default();
    let mut room = limit;

    for (table, table_changes) in changes.iter() {
        let flattened = [
            (
                ChangeKind::Created,
                OperationItems::Rows(table_changes.created.clone()),
            ),
            (
                ChangeKind::Updated,
                OperationItems::Rows(table_changes.updated.clone()),
            ),
            (
                ChangeKind::Deleted,
                OperationItems::Ids(table_changes.deleted.clone()),
            ),
        ];

        for (kind, mut items) in flattened {
            if items.is_empty() {
                continue;
            }
            loop {
                if room == 0 {
                    batches.push(std::mem::take(&mut current));
                    room = limit;
                }
                if items.len() <= room {
                    room -= items.len();
                    current.push(table, kind, items);
                    break;
                }
                let rest = items.split_off(room);
                current.push(table, kind, items);
                room = 0;
                items = rest;
            }
        }
    }

    if current.item_count() > 0 {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{record_id, TableChanges};
    use serde_json::json;

    fn rows(prefix: &str, count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| {
                let mut record = Record::new();
                record.insert("id".to_string(), json!(format!("{prefix}{i}")));
                record
            })
            .collect()
    }

    fn created(prefix: &str, count: usize) -> TableChanges {
        TableChanges {
            created: rows(prefix, count),
            ..Default::default()
        }
    }

    #[test]
    fn small_change_set_passes_through_as_one_normalized_batch() {
        let mut changes = ChangeSet::new();
        changes.insert("wallets", created("w", 3));
        changes.insert(
            "transactions",
            TableChanges {
                updated: rows("t", 2),
                deleted: vec!["t9".to_string()],
                ..Default::default()
            },
        );

        let batches = plan_push_batches(&changes, PUSH_BATCH_LIMIT);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].item_count(), 6);
        // Passthrough: reassembling yields the input, empty arrays included.
        assert_eq!(batches[0].to_change_set(), changes);
    }

    #[test]
    fn forty_plus_seventy_rows_pack_into_three_batches() {
        let mut changes = ChangeSet::new();
        changes.insert("wallets", created("w", 40));
        changes.insert("transactions", created("t", 70));

        let batches = plan_push_batches(&changes, 50);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].item_count(), 50);
        assert_eq!(batches[1].item_count(), 50);
        assert_eq!(batches[2].item_count(), 10);

        // Batch 1: all 40 wallets plus the first 10 transactions.
        let first = batches[0].to_change_set();
        assert_eq!(first.get("wallets").unwrap().created.len(), 40);
        assert_eq!(first.get("transactions").unwrap().created.len(), 10);
        assert_eq!(
            record_id(&first.get("transactions").unwrap().created[0]),
            Some("t0")
        );

        // Batch 2: transactions 10..60 as a single merged operation.
        assert_eq!(batches[1].operations().len(), 1);
        let second = batches[1].to_change_set();
        assert_eq!(
            record_id(&second.get("transactions").unwrap().created[0]),
            Some("t10")
        );

        // Batch 3: the remaining 10 transactions.
        let third = batches[2].to_change_set();
        assert_eq!(
            record_id(&third.get("transactions").unwrap().created[9]),
            Some("t69")
        );
    }

    #[test]
    fn batches_conserve_items_and_respect_the_limit() {
        let mut changes = ChangeSet::new();
        changes.insert(
            "wallets",
            TableChanges {
                created: rows("wc", 23),
                updated: rows("wu", 9),
                deleted: (0..4).map(|i| format!("wd{i}")).collect(),
            },
        );
        changes.insert("transactions", created("t", 111));
        changes.insert(
            "attachments",
            TableChanges {
                deleted: (0..17).map(|i| format!("ad{i}")).collect(),
                ..Default::default()
            },
        );

        let total = changes.total_item_count();
        let batches = plan_push_batches(&changes, 50);

        let batched: usize = batches.iter().map(PushBatch::item_count).sum();
        assert_eq!(batched, total);
        assert!(batches.iter().all(|batch| batch.item_count() <= 50));

        // No id appears twice across batches.
        let mut ids: Vec<String> = Vec::new();
        for batch in &batches {
            for op in batch.operations() {
                match &op.items {
                    OperationItems::Rows(rows) => {
                        ids.extend(rows.iter().filter_map(record_id).map(String::from))
                    }
                    OperationItems::Ids(deleted) => ids.extend(deleted.iter().cloned()),
                }
            }
        }
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[test]
    fn an_operation_never_mixes_kinds_when_sliced() {
        let mut changes = ChangeSet::new();
        changes.insert(
            "transactions",
            TableChanges {
                created: rows("tc", 30),
                updated: rows("tu", 30),
                ..Default::default()
            },
        );

        let batches = plan_push_batches(&changes, 50);
        assert_eq!(batches.len(), 2);

        // Batch 1 holds all 30 created plus the first 20 updated.
        let ops = batches[0].operations();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].kind, ChangeKind::Created);
        assert_eq!(ops[0].items.len(), 30);
        assert_eq!(ops[1].kind, ChangeKind::Updated);
        assert_eq!(ops[1].items.len(), 20);

        // The remainder of the updated run continues into batch 2.
        let ops = batches[1].operations();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].kind, ChangeKind::Updated);
        assert_eq!(ops[0].items.len(), 10);
    }

    #[test]
    fn empty_change_set_plans_no_batches() {
        assert!(plan_push_batches(&ChangeSet::new(), 50).is_empty());
    }
}
