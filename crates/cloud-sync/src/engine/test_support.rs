//! In-memory port fakes shared by the engine and scheduler tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pocketledger_core::sync::{
    record_id, ChangeSet, PendingMigration, Record, SyncEngineStatus, TableChanges,
};
use serde_json::json;

use crate::error::Result as ApiResult;
use crate::types::{PullChangesRequest, PullChangesResponse, PushChangesRequest};

use super::ports::{AccessTokenSource, AlertSink, ChangeStore, SyncStateStore, SyncTransport};

/// A record with just an id column.
pub(crate) fn row(id: &str) -> Record {
    let mut record = Record::new();
    record.insert("id".to_string(), json!(id));
    record
}

/// Table changes holding `count` created rows with ids `prefix0..`.
pub(crate) fn table_created(prefix: &str, count: usize) -> TableChanges {
    TableChanges {
        created: (0..count).map(|i| row(&format!("{prefix}{i}"))).collect(),
        ..Default::default()
    }
}

/// Scriptable in-memory implementation of every engine port.
///
/// Applies keep a tiny table/id keyed row store so idempotence is
/// observable; unscripted pulls answer with an empty window at the current
/// checkpoint so loops can tick freely.
#[derive(Default)]
pub(crate) struct TestPorts {
    checkpoint: Mutex<i64>,
    fail_set_checkpoint_once: AtomicBool,
    local_changes: Mutex<ChangeSet>,
    pending: Mutex<Option<PendingMigration>>,
    fail_apply_with: Mutex<Option<String>>,

    pull_queue: Mutex<VecDeque<ApiResult<PullChangesResponse>>>,
    push_queue: Mutex<VecDeque<ApiResult<()>>>,
    pull_log: Mutex<Vec<PullChangesRequest>>,
    push_log: Mutex<Vec<PushChangesRequest>>,

    applied: Mutex<Vec<ChangeSet>>,
    rows: Mutex<BTreeMap<(String, String), Record>>,

    alerts: Mutex<Vec<String>>,
    outcomes: Mutex<Vec<(String, i64)>>,
    errors: Mutex<Vec<String>>,
}

impl TestPorts {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_checkpoint_value(&self, value: i64) {
        *self.checkpoint.lock().unwrap() = value;
    }

    pub(crate) fn checkpoint_value(&self) -> i64 {
        *self.checkpoint.lock().unwrap()
    }

    pub(crate) fn fail_next_set_checkpoint(&self) {
        self.fail_set_checkpoint_once.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_local_changes(&self, changes: ChangeSet) {
        *self.local_changes.lock().unwrap() = changes;
    }

    pub(crate) fn set_pending_migration(&self, pending: PendingMigration) {
        *self.pending.lock().unwrap() = Some(pending);
    }

    pub(crate) fn fail_apply(&self, message: &str) {
        *self.fail_apply_with.lock().unwrap() = Some(message.to_string());
    }

    pub(crate) fn enqueue_pull(&self, result: ApiResult<PullChangesResponse>) {
        self.pull_queue.lock().unwrap().push_back(result);
    }

    pub(crate) fn enqueue_push(&self, result: ApiResult<()>) {
        self.push_queue.lock().unwrap().push_back(result);
    }

    pub(crate) fn pull_requests(&self) -> Vec<PullChangesRequest> {
        self.pull_log.lock().unwrap().clone()
    }

    pub(crate) fn push_requests(&self) -> Vec<PushChangesRequest> {
        self.push_log.lock().unwrap().clone()
    }

    pub(crate) fn applied_change_sets(&self) -> Vec<ChangeSet> {
        self.applied.lock().unwrap().clone()
    }

    pub(crate) fn store_rows(&self) -> BTreeMap<(String, String), Record> {
        self.rows.lock().unwrap().clone()
    }

    pub(crate) fn surfaced_alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    pub(crate) fn cycle_outcomes(&self) -> Vec<String> {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .map(|(status, _)| status.clone())
            .collect()
    }

    pub(crate) fn engine_errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeStore for TestPorts {
    async fn changes_since(&self, _checkpoint: i64) -> Result<ChangeSet, String> {
        Ok(self.local_changes.lock().unwrap().clone())
    }

    async fn apply_remote_changes(&self, changes: &ChangeSet) -> Result<(), String> {
        if let Some(message) = self.fail_apply_with.lock().unwrap().clone() {
            return Err(message);
        }
        let mut rows = self.rows.lock().unwrap();
        for (table, table_changes) in changes.iter() {
            for record in table_changes
                .created
                .iter()
                .chain(table_changes.updated.iter())
            {
                if let Some(id) = record_id(record) {
                    rows.insert((table.to_string(), id.to_string()), record.clone());
                }
            }
            for id in &table_changes.deleted {
                rows.remove(&(table.to_string(), id.clone()));
            }
        }
        drop(rows);
        self.applied.lock().unwrap().push(changes.clone());
        Ok(())
    }

    async fn pending_migration(&self) -> Result<PendingMigration, String> {
        Ok(self
            .pending
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| PendingMigration::unchanged(1)))
    }
}

#[async_trait]
impl SyncStateStore for TestPorts {
    async fn checkpoint(&self) -> Result<i64, String> {
        Ok(*self.checkpoint.lock().unwrap())
    }

    async fn set_checkpoint(&self, checkpoint: i64) -> Result<(), String> {
        if self.fail_set_checkpoint_once.swap(false, Ordering::SeqCst) {
            return Err("forced checkpoint persist failure".to_string());
        }
        *self.checkpoint.lock().unwrap() = checkpoint;
        Ok(())
    }

    async fn mark_pull_completed(&self) -> Result<(), String> {
        Ok(())
    }

    async fn mark_push_completed(&self) -> Result<(), String> {
        Ok(())
    }

    async fn mark_cycle_outcome(&self, status: String, duration_ms: i64) -> Result<(), String> {
        self.outcomes.lock().unwrap().push((status, duration_ms));
        Ok(())
    }

    async fn mark_engine_error(&self, message: String) -> Result<(), String> {
        self.errors.lock().unwrap().push(message);
        Ok(())
    }

    async fn engine_status(&self) -> Result<SyncEngineStatus, String> {
        let outcomes = self.outcomes.lock().unwrap();
        Ok(SyncEngineStatus {
            checkpoint: *self.checkpoint.lock().unwrap(),
            last_pull_at: None,
            last_push_at: None,
            last_error: self.errors.lock().unwrap().last().cloned(),
            last_cycle_status: outcomes.last().map(|(status, _)| status.clone()),
            last_cycle_duration_ms: outcomes.last().map(|(_, duration)| *duration),
        })
    }
}

#[async_trait]
impl SyncTransport for TestPorts {
    async fn pull_changes(
        &self,
        _token: &str,
        request: &PullChangesRequest,
    ) -> ApiResult<PullChangesResponse> {
        self.pull_log.lock().unwrap().push(request.clone());
        let scripted = self.pull_queue.lock().unwrap().pop_front();
        match scripted {
            Some(result) => result,
            // Unscripted pulls answer an empty window so loops can tick.
            None => Ok(PullChangesResponse {
                changes: ChangeSet::new(),
                timestamp: *self.checkpoint.lock().unwrap(),
                messages: Vec::new(),
            }),
        }
    }

    async fn push_changes(&self, _token: &str, request: &PushChangesRequest) -> ApiResult<()> {
        self.push_log.lock().unwrap().push(request.clone());
        let scripted = self.push_queue.lock().unwrap().pop_front();
        scripted.unwrap_or(Ok(()))
    }
}

impl AccessTokenSource for TestPorts {
    fn access_token(&self) -> Result<String, String> {
        Ok("test-token".to_string())
    }
}

impl AlertSink for TestPorts {
    fn surface_message(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}
