//! Foreground/background scheduling of sync cycles.
//!
//! Two independent loops run while the app is foregrounded: a full pull+push
//! loop and a more frequent push-only loop. Both are serialized against the
//! same cycle lock, so a push-only tick that collides with a running full
//! sync is skipped, not queued. Backgrounding stops scheduling further
//! ticks; an in-flight network call is never cancelled mid-flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use pocketledger_core::sync::{
    SYNC_FULL_INTERVAL_SECS, SYNC_INTERVAL_JITTER_SECS, SYNC_PUSH_INTERVAL_SECS,
};

use super::ports::{AccessTokenSource, AlertSink, ChangeStore, SyncStateStore, SyncTransport};
use super::runtime::SyncRuntime;
use super::{run_sync_cycle, SyncMode};

/// Tick cadence for the two foreground loops.
#[derive(Debug, Clone, Copy)]
pub struct SyncSchedulerConfig {
    pub full_interval: Duration,
    pub push_interval: Duration,
    pub jitter_bound: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            full_interval: Duration::from_secs(SYNC_FULL_INTERVAL_SECS),
            push_interval: Duration::from_secs(SYNC_PUSH_INTERVAL_SECS),
            jitter_bound: Duration::from_secs(SYNC_INTERVAL_JITTER_SECS),
        }
    }
}

/// Owns the periodic sync loops and ties their lifecycle to application
/// foreground/background transitions.
pub struct SyncScheduler<P> {
    ports: Arc<P>,
    runtime: Arc<SyncRuntime>,
    config: SyncSchedulerConfig,
}

impl<P> SyncScheduler<P>
where
    P: ChangeStore + SyncStateStore + SyncTransport + AccessTokenSource + AlertSink + 'static,
{
    pub fn new(ports: Arc<P>, runtime: Arc<SyncRuntime>, config: SyncSchedulerConfig) -> Self {
        Self {
            ports,
            runtime,
            config,
        }
    }

    pub fn runtime(&self) -> &Arc<SyncRuntime> {
        &self.runtime
    }

    /// Start both loops, each firing an immediate first tick rather than
    /// waiting out the first interval. Idempotent while already running.
    pub async fn on_foreground(&self) {
        let mut stop_guard = self.runtime.stop_tx.lock().await;
        if stop_guard.is_some() {
            debug!("[Sync] Scheduler already running, ignoring foreground transition");
            return;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        *stop_guard = Some(stop_tx);
        drop(stop_guard);

        info!("[Sync] Foregrounded: starting sync loops");
        let full = spawn_loop(
            Arc::clone(&self.ports),
            Arc::clone(&self.runtime),
            SyncMode::Full,
            self.config.full_interval,
            self.config.jitter_bound,
            stop_rx.clone(),
        );
        let push = spawn_loop(
            Arc::clone(&self.ports),
            Arc::clone(&self.runtime),
            SyncMode::PushOnly,
            self.config.push_interval,
            self.config.jitter_bound,
            stop_rx,
        );
        *self.runtime.full_task.lock().await = Some(full);
        *self.runtime.push_task.lock().await = Some(push);
    }

    /// Stop scheduling further ticks. A tick already past its sleep finishes
    /// its cycle; only the sleeps race the stop signal.
    pub async fn on_background(&self) {
        let Some(stop_tx) = self.runtime.stop_tx.lock().await.take() else {
            return;
        };
        info!("[Sync] Backgrounded: stopping sync loops");
        let _ = stop_tx.send(true);
        self.runtime.full_task.lock().await.take();
        self.runtime.push_task.lock().await.take();
    }

    pub async fn is_running(&self) -> bool {
        self.runtime.stop_tx.lock().await.is_some()
    }
}

fn jitter_ms(bound: Duration) -> u64 {
    let bound_ms = bound.as_millis() as u64;
    if bound_ms == 0 {
        return 0;
    }
    Utc::now().timestamp_millis().unsigned_abs() % bound_ms
}

fn spawn_loop<P>(
    ports: Arc<P>,
    runtime: Arc<SyncRuntime>,
    mode: SyncMode,
    interval: Duration,
    jitter_bound: Duration,
    mut stop_rx: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    P: ChangeStore + SyncStateStore + SyncTransport + AccessTokenSource + AlertSink + 'static,
{
    tokio::spawn(async move {
        loop {
            if *stop_rx.borrow() {
                break;
            }

            match run_sync_cycle(ports.as_ref(), runtime.as_ref(), mode).await {
                Ok(result) => debug!(
                    "[Sync] {} tick complete status={} pulled={} pushed={} checkpoint={}",
                    mode.as_str(),
                    result.status,
                    result.pulled_count,
                    result.pushed_count,
                    result.checkpoint
                ),
                Err(err) => warn!("[Sync] {} tick failed: {}", mode.as_str(), err),
            }

            let delay = interval + Duration::from_millis(jitter_ms(jitter_bound));
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("[Sync] {} loop stopped", mode.as_str());
    })
}
