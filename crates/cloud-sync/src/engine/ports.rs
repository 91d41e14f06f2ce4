//! Port traits between the sync engine and its collaborators.
//!
//! The embedded database, the persisted engine state, the HTTP transport and
//! the alert UI all sit behind these traits so the cycle logic stays pure of
//! platform concerns and every collaborator can be faked in tests.

use async_trait::async_trait;
use pocketledger_core::sync::{ChangeSet, PendingMigration, SyncEngineStatus};

use crate::error::Result as ApiResult;
use crate::types::{PullChangesRequest, PullChangesResponse, PushChangesRequest};

/// Local embedded store: change tracking and remote-change application.
///
/// The store owns its own "pending local change" bookkeeping independent of
/// the engine, so a write landing mid-push is picked up by the next cycle's
/// change set, never lost and never double-sent.
#[async_trait]
pub trait ChangeStore: Send + Sync {
    /// Local mutations not yet pushed, since `checkpoint`.
    async fn changes_since(&self, checkpoint: i64) -> Result<ChangeSet, String>;

    /// Apply a remote change set, tables in the order given.
    ///
    /// Must be idempotent per record id: re-applying the same change set
    /// (a crash between apply and checkpoint persist) leaves the store in
    /// the same observable state.
    async fn apply_remote_changes(&self, changes: &ChangeSet) -> Result<(), String>;

    /// Migration state accumulated since the last pull.
    async fn pending_migration(&self) -> Result<PendingMigration, String>;
}

/// Persisted sync-engine state: the checkpoint cell and status bookkeeping.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn checkpoint(&self) -> Result<i64, String>;
    async fn set_checkpoint(&self, checkpoint: i64) -> Result<(), String>;
    async fn mark_pull_completed(&self) -> Result<(), String>;
    async fn mark_push_completed(&self) -> Result<(), String>;
    async fn mark_cycle_outcome(&self, status: String, duration_ms: i64) -> Result<(), String>;
    async fn mark_engine_error(&self, message: String) -> Result<(), String>;
    async fn engine_status(&self) -> Result<SyncEngineStatus, String>;
}

/// Transport to the cloud sync API.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn pull_changes(
        &self,
        token: &str,
        request: &PullChangesRequest,
    ) -> ApiResult<PullChangesResponse>;

    async fn push_changes(&self, token: &str, request: &PushChangesRequest) -> ApiResult<()>;
}

/// Source of the pre-authenticated access token. Refresh happens elsewhere.
pub trait AccessTokenSource: Send + Sync {
    fn access_token(&self) -> Result<String, String>;
}

/// Sink for server diagnostics surfaced to the user as a blocking alert.
pub trait AlertSink: Send + Sync {
    fn surface_message(&self, message: &str);
}
