//! Wire types for the cloud sync API.

use pocketledger_core::sync::{ChangeSet, MigrationDescriptor};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/sync/pull`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullChangesRequest {
    /// Checkpoint of the last applied pull; 0 means never synced.
    pub last_pulled_at: i64,
    pub migration: MigrationDescriptor,
}

/// Response of a successful pull.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullChangesResponse {
    pub changes: ChangeSet,
    /// Server time of this window; becomes the new checkpoint once the
    /// changes are applied locally.
    pub timestamp: i64,
    /// Diagnostics surfaced to the user as a blocking alert. They do not
    /// affect checkpoint advancement.
    #[serde(default)]
    pub messages: Vec<String>,
}

/// Body of `POST /api/v1/sync/push`.
///
/// `lastPulledAt` is stringly typed and `migrations` carries the local
/// schema version; the server uses both only for conflict bookkeeping on
/// its own copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushChangesRequest {
    pub changes: ChangeSet,
    pub last_pulled_at: String,
    pub migrations: i32,
}

/// Error body returned by the cloud API on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub code: String,
    pub message: String,
}
