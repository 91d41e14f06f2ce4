//! Schema-migration metadata carried on pull requests.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use super::tables::is_excluded;

/// One schema change recorded by the local store's migration runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SchemaChange {
    CreateTable { table: String },
    AddColumns { table: String, columns: Vec<String> },
}

/// Migration state since the last checkpoint, self-reported by the local
/// store. `changes` is empty when no migration ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMigration {
    /// Schema version the store is at now.
    pub schema_version: i32,
    /// Schema version the store was at when the migration interval began.
    /// Absent when the store has no record of it.
    #[serde(default)]
    pub migrated_from: Option<i32>,
    #[serde(default)]
    pub changes: Vec<SchemaChange>,
}

impl PendingMigration {
    /// State of a store with no migration since the last pull.
    pub fn unchanged(schema_version: i32) -> Self {
        Self {
            schema_version,
            migrated_from: None,
            changes: Vec::new(),
        }
    }
}

/// Wire-format migration descriptor sent with every pull request.
///
/// `from == to` means no migration occurred since the last pull.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationDescriptor {
    pub from: i32,
    pub to: i32,
    pub tables: Vec<String>,
    pub columns: BTreeMap<String, Vec<String>>,
}

impl MigrationDescriptor {
    /// Descriptor for a store that has not migrated since the last pull.
    pub fn unchanged(schema_version: i32) -> Self {
        Self {
            from: schema_version,
            to: schema_version,
            tables: Vec::new(),
            columns: BTreeMap::new(),
        }
    }

    /// Build the wire descriptor from the local store's pending state.
    ///
    /// Client migrations are single-step, so `from = to - 1`. A store
    /// reporting an origin further back (a device resuming after skipping
    /// versions) is logged and still described as one step; the server
    /// contract has no shape for multi-version jumps.
    ///
    /// Excluded tables never appear in the descriptor, and a newly created
    /// table is not re-listed under added columns.
    pub fn build(pending: &PendingMigration) -> Self {
        if pending.changes.is_empty() {
            return Self::unchanged(pending.schema_version);
        }

        let to = pending.schema_version;
        let from = to - 1;
        if let Some(origin) = pending.migrated_from {
            if origin < from {
                warn!(
                    "[Sync] Store migrated from version {} to {}; describing as single step {} -> {}",
                    origin, to, from, to
                );
            }
        }

        let mut tables: Vec<String> = Vec::new();
        let mut columns: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for change in &pending.changes {
            match change {
                SchemaChange::CreateTable { table } => {
                    if is_excluded(table) || tables.contains(table) {
                        continue;
                    }
                    tables.push(table.clone());
                    columns.remove(table);
                }
                SchemaChange::AddColumns {
                    table,
                    columns: added,
                } => {
                    if is_excluded(table) || tables.contains(table) {
                        continue;
                    }
                    let entry = columns.entry(table.clone()).or_default();
                    for column in added {
                        if !entry.contains(column) {
                            entry.push(column.clone());
                        }
                    }
                }
            }
        }

        Self {
            from,
            to,
            tables,
            columns,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.from == self.to
    }
}
