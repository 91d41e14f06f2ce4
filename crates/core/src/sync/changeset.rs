//! Change-set model exchanged between the local store and the cloud service.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identity of a row within its table.
pub type RecordId = String;

/// Opaque row payload: column name → scalar value.
///
/// The sync engine never interprets column semantics, only row identity
/// (the `id` column) and table membership.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Row identity of a record, when the adapter supplied one.
pub fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(|value| value.as_str())
}

/// Created/updated/deleted rows of one table for one sync direction.
///
/// All three arrays are always present on the wire, empty where a table has
/// no rows of that kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableChanges {
    #[serde(default)]
    pub created: Vec<Record>,
    #[serde(default)]
    pub updated: Vec<Record>,
    #[serde(default)]
    pub deleted: Vec<RecordId>,
}

impl TableChanges {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Total row count across created, updated and deleted.
    pub fn item_count(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    /// Row ids that appear in more than one of created/updated/deleted.
    ///
    /// The wire contract allows a given id in at most one bucket per table;
    /// a non-empty result means the producer violated that.
    pub fn conflicting_ids(&self) -> Vec<String> {
        let mut seen: Vec<&str> = Vec::new();
        let mut conflicts: Vec<String> = Vec::new();

        let created_ids = self.created.iter().filter_map(record_id);
        let updated_ids = self.updated.iter().filter_map(record_id);
        let deleted_ids = self.deleted.iter().map(String::as_str);

        for id in created_ids.chain(updated_ids).chain(deleted_ids) {
            if seen.contains(&id) {
                if !conflicts.iter().any(|c| c == id) {
                    conflicts.push(id.to_string());
                }
            } else {
                seen.push(id);
            }
        }
        conflicts
    }
}

/// Multi-table change set.
///
/// Iteration order is the order tables were inserted (for payloads parsed
/// off the wire, the document order of the `changes` object). The reorderer
/// and the push batcher rely on this.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    entries: Vec<(String, TableChanges)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the changes for `table`, keeping its position if it
    /// already exists.
    pub fn insert(&mut self, table: impl Into<String>, changes: TableChanges) {
        let table = table.into();
        match self.entries.iter_mut().find(|(name, _)| *name == table) {
            Some((_, existing)) => *existing = changes,
            None => self.entries.push((table, changes)),
        }
    }

    /// Changes for `table`, appending an empty entry if absent.
    pub fn entry(&mut self, table: &str) -> &mut TableChanges {
        let index = match self.entries.iter().position(|(name, _)| name == table) {
            Some(index) => index,
            None => {
                self.entries.push((table.to_string(), TableChanges::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    pub fn get(&self, table: &str) -> Option<&TableChanges> {
        self.entries
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, changes)| changes)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableChanges)> {
        self.entries
            .iter()
            .map(|(name, changes)| (name.as_str(), changes))
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total row count across all tables and kinds.
    pub fn total_item_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, changes)| changes.item_count())
            .sum()
    }

    pub fn into_entries(self) -> Vec<(String, TableChanges)> {
        self.entries
    }
}

impl FromIterator<(String, TableChanges)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (String, TableChanges)>>(iter: I) -> Self {
        let mut set = ChangeSet::new();
        for (table, changes) in iter {
            set.insert(table, changes);
        }
        set
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (table, changes) in &self.entries {
            map.serialize_entry(table, changes)?;
        }
        map.end()
    }
}

// Deserialized by hand so the `changes` object keeps its document order;
// a derived map-backed representation would re-sort the tables.
impl<'de> Deserialize<'de> for ChangeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ChangeSetVisitor;

        impl<'de> Visitor<'de> for ChangeSetVisitor {
            type Value = ChangeSet;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of table name to table changes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut set = ChangeSet::new();
                while let Some((table, changes)) =
                    access.next_entry::<String, TableChanges>()?
                {
                    set.insert(table, changes);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(ChangeSetVisitor)
    }
}
