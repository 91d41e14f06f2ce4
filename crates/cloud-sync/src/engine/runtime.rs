//! Shared runtime state for the sync engine.

use std::sync::atomic::{AtomicU8, Ordering};

use pocketledger_core::sync::SyncPhase;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

const PHASE_IDLE: u8 = 0;
const PHASE_PULLING: u8 = 1;
const PHASE_APPLYING: u8 = 2;
const PHASE_PUSHING: u8 = 3;
const PHASE_ERROR: u8 = 4;

/// State shared between the cycle engine and the scheduler.
#[derive(Debug, Default)]
pub struct SyncRuntime {
    /// Serializes cycles. A tick that cannot take it is dropped, not queued.
    pub(crate) cycle_mutex: Mutex<()>,
    phase: AtomicU8,
    pub(crate) full_task: Mutex<Option<JoinHandle<()>>>,
    pub(crate) push_task: Mutex<Option<JoinHandle<()>>>,
    pub(crate) stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl SyncRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current orchestrator phase.
    pub fn phase(&self) -> SyncPhase {
        match self.phase.load(Ordering::Relaxed) {
            PHASE_PULLING => SyncPhase::Pulling,
            PHASE_APPLYING => SyncPhase::Applying,
            PHASE_PUSHING => SyncPhase::Pushing,
            PHASE_ERROR => SyncPhase::Error,
            _ => SyncPhase::Idle,
        }
    }

    pub(crate) fn set_phase(&self, phase: SyncPhase) {
        let value = match phase {
            SyncPhase::Idle => PHASE_IDLE,
            SyncPhase::Pulling => PHASE_PULLING,
            SyncPhase::Applying => PHASE_APPLYING,
            SyncPhase::Pushing => PHASE_PUSHING,
            SyncPhase::Error => PHASE_ERROR,
        };
        self.phase.store(value, Ordering::Relaxed);
    }
}
