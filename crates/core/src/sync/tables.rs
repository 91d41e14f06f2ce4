//! Which local tables sync, and in what order.

/// Fixed dependency order for synchronized tables: parents before children.
///
/// `transactions` and `transfers` reference each other by id. The pair is
/// kept adjacent and sent in the same cycle; the server tolerates a dangling
/// reference between the two inside a single applied batch. The order is a
/// hand-authored total order, not derived from schema introspection.
pub const SYNC_TABLE_ORDER: [&str; 7] = [
    "wallets",
    "payees",
    "budgets",
    "transactions",
    "transfers",
    "recurring_rules",
    "attachments",
];

/// Tables that exist locally but never participate in sync.
///
/// `categories` is the bundled category reference set, `exchange_rates` is
/// provider reference data, `budget_caches` is derived locally.
pub const EXCLUDED_TABLES: [&str; 3] = ["categories", "exchange_rates", "budget_caches"];

/// Sync classification of a local table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSync {
    Synchronized,
    Excluded,
}

/// Classify a table for sync. Tables unknown to [`SYNC_TABLE_ORDER`] are
/// synchronized too; they sort after the listed ones.
pub fn classify(table: &str) -> TableSync {
    if is_excluded(table) {
        TableSync::Excluded
    } else {
        TableSync::Synchronized
    }
}

pub fn is_excluded(table: &str) -> bool {
    EXCLUDED_TABLES.contains(&table)
}

/// Position of `table` in the dependency order, if listed.
pub fn order_index(table: &str) -> Option<usize> {
    SYNC_TABLE_ORDER.iter().position(|name| *name == table)
}
