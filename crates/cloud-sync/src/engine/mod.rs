//! Sync cycle engine: pull, apply, batched push.
//!
//! One cycle runs `Idle → Pulling → Applying → Pushing → Idle` (push-only
//! cycles skip the first two stages). Any stage failure records an error
//! outcome and leaves the engine in `Error` until the next scheduled tick
//! starts fresh; there is no inline retry and no backoff.

use std::time::Instant;

use log::{debug, warn};
use pocketledger_core::sync::{
    plan_push_batches, reorder_for_sync, MigrationDescriptor, SyncCycleResult, SyncPhase,
    PUSH_BATCH_LIMIT,
};

pub mod ports;
mod runtime;
mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use ports::{AccessTokenSource, AlertSink, ChangeStore, SyncStateStore, SyncTransport};
pub use runtime::SyncRuntime;
pub use scheduler::{SyncScheduler, SyncSchedulerConfig};

use crate::types::{PullChangesRequest, PushChangesRequest};

/// What a cycle does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Pull and apply remote changes, then push local ones.
    Full,
    /// Push local changes only.
    PushOnly,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Full => "full",
            SyncMode::PushOnly => "push_only",
        }
    }
}

/// Tracks mutable progress during a cycle and records failures.
struct CycleContext<'a, S: SyncStateStore + ?Sized> {
    state: &'a S,
    runtime: &'a SyncRuntime,
    started_at: Instant,
    pulled_count: usize,
    pushed_count: usize,
    batches_sent: usize,
    checkpoint: i64,
}

impl<'a, S: SyncStateStore + ?Sized> CycleContext<'a, S> {
    /// Record a cycle failure: persist error + outcome, then return a result.
    async fn fail(&self, status: &str, message: String) -> Result<SyncCycleResult, String> {
        self.runtime.set_phase(SyncPhase::Error);
        self.state
            .mark_engine_error(message)
            .await
            .map_err(|e| e.to_string())?;
        let duration_ms = self.started_at.elapsed().as_millis() as i64;
        self.state
            .mark_cycle_outcome(status.to_string(), duration_ms)
            .await
            .map_err(|e| e.to_string())?;
        Ok(SyncCycleResult {
            status: status.to_string(),
            pulled_count: self.pulled_count,
            pushed_count: self.pushed_count,
            batches_sent: self.batches_sent,
            checkpoint: self.checkpoint,
            duration_ms,
        })
    }
}

/// Run one sync cycle.
///
/// A concurrent invocation while a cycle is in flight is dropped (status
/// `skipped_busy`), never queued.
pub async fn run_sync_cycle<P>(
    ports: &P,
    runtime: &SyncRuntime,
    mode: SyncMode,
) -> Result<SyncCycleResult, String>
where
    P: ChangeStore + SyncStateStore + SyncTransport + AccessTokenSource + AlertSink + Send + Sync,
{
    let Ok(_cycle_guard) = runtime.cycle_mutex.try_lock() else {
        debug!("[Sync] Cycle already in progress, dropping {} tick", mode.as_str());
        return Ok(SyncCycleResult {
            status: "skipped_busy".to_string(),
            pulled_count: 0,
            pushed_count: 0,
            batches_sent: 0,
            checkpoint: ports.checkpoint().await.unwrap_or(0),
            duration_ms: 0,
        });
    };

    let started_at = Instant::now();
    let mut ctx = CycleContext {
        state: ports,
        runtime,
        started_at,
        pulled_count: 0,
        pushed_count: 0,
        batches_sent: 0,
        checkpoint: 0,
    };

    ctx.checkpoint = match ports.checkpoint().await {
        Ok(value) => value,
        Err(err) => {
            return ctx
                .fail("state_error", format!("Failed to read checkpoint: {}", err))
                .await;
        }
    };

    let token = match ports.access_token() {
        Ok(value) => value,
        Err(err) => {
            return ctx.fail("auth_error", format!("Auth error: {}", err)).await;
        }
    };

    let pending = match ports.pending_migration().await {
        Ok(value) => value,
        Err(err) => {
            return ctx
                .fail(
                    "state_error",
                    format!("Failed to read migration state: {}", err),
                )
                .await;
        }
    };

    if mode == SyncMode::Full {
        runtime.set_phase(SyncPhase::Pulling);
        let request = PullChangesRequest {
            last_pulled_at: ctx.checkpoint,
            migration: MigrationDescriptor::build(&pending),
        };
        let response = match ports.pull_changes(&token, &request).await {
            Ok(value) => value,
            Err(err) => {
                return ctx.fail("pull_error", format!("Pull failed: {}", err)).await;
            }
        };

        let incoming = reorder_for_sync(response.changes);
        for (table, table_changes) in incoming.iter() {
            let conflicts = table_changes.conflicting_ids();
            if !conflicts.is_empty() {
                warn!(
                    "[Sync] Pull returned {} ids in multiple buckets for '{}'",
                    conflicts.len(),
                    table
                );
            }
        }

        runtime.set_phase(SyncPhase::Applying);
        if let Err(err) = ports.apply_remote_changes(&incoming).await {
            return ctx
                .fail("apply_error", format!("Apply failed: {}", err))
                .await;
        }
        ctx.pulled_count = incoming.total_item_count();

        for message in &response.messages {
            ports.surface_message(message);
        }

        // The checkpoint advances only after a successful apply, so a crash
        // in between re-pulls the same window; the adapter's apply is
        // idempotent per record id.
        if response.timestamp < ctx.checkpoint {
            warn!(
                "[Sync] Server timestamp {} is behind checkpoint {}",
                response.timestamp, ctx.checkpoint
            );
        }
        if let Err(err) = ports.set_checkpoint(response.timestamp).await {
            return ctx
                .fail(
                    "state_error",
                    format!("Failed to persist checkpoint: {}", err),
                )
                .await;
        }
        ctx.checkpoint = response.timestamp;
        ports
            .mark_pull_completed()
            .await
            .map_err(|e| e.to_string())?;
        debug!(
            "[Sync] Applied {} pulled rows, checkpoint now {}",
            ctx.pulled_count, ctx.checkpoint
        );
    }

    runtime.set_phase(SyncPhase::Pushing);
    let local = match ports.changes_since(ctx.checkpoint).await {
        Ok(value) => value,
        Err(err) => {
            return ctx
                .fail(
                    "state_error",
                    format!("Failed to read local changes: {}", err),
                )
                .await;
        }
    };

    let outgoing = reorder_for_sync(local);
    if !outgoing.is_empty() {
        let batches = plan_push_batches(&outgoing, PUSH_BATCH_LIMIT);
        let total_batches = batches.len();
        // Every batch carries the checkpoint captured before the push began;
        // the server uses it for conflict bookkeeping only.
        let last_pulled_at = ctx.checkpoint.to_string();

        for (index, batch) in batches.iter().enumerate() {
            let request = PushChangesRequest {
                changes: batch.to_change_set(),
                last_pulled_at: last_pulled_at.clone(),
                migrations: pending.schema_version,
            };
            if let Err(err) = ports.push_changes(&token, &request).await {
                // Already-sent batches stay committed on the server; the
                // next cycle recomputes a smaller change set from the
                // adapter's own pending-change tracking.
                ctx.batches_sent = index;
                let message = if index > 0 {
                    format!(
                        "Push failed after {} of {} batches: {}",
                        index, total_batches, err
                    )
                } else {
                    format!("Push failed: {}", err)
                };
                return ctx.fail("push_error", message).await;
            }
            ctx.batches_sent = index + 1;
            ctx.pushed_count += batch.item_count();
        }

        ports
            .mark_push_completed()
            .await
            .map_err(|e| e.to_string())?;
        debug!(
            "[Sync] Pushed {} rows in {} batches",
            ctx.pushed_count, ctx.batches_sent
        );
    }

    runtime.set_phase(SyncPhase::Idle);
    let duration_ms = started_at.elapsed().as_millis() as i64;
    ports
        .mark_cycle_outcome("ok".to_string(), duration_ms)
        .await
        .map_err(|e| e.to_string())?;

    Ok(SyncCycleResult {
        status: "ok".to_string(),
        pulled_count: ctx.pulled_count,
        pushed_count: ctx.pushed_count,
        batches_sent: ctx.batches_sent,
        checkpoint: ctx.checkpoint,
        duration_ms,
    })
}
