//! Engine status and cycle reporting models.

use serde::{Deserialize, Serialize};

/// Orchestrator state machine phases.
///
/// A cycle moves `Idle → Pulling → Applying → Pushing → Idle`; a push-only
/// cycle skips `Pulling`/`Applying`. Any stage failure parks the engine in
/// `Error` until the next scheduled tick starts fresh from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Pulling,
    Applying,
    Pushing,
    Error,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Pulling => "pulling",
            SyncPhase::Applying => "applying",
            SyncPhase::Pushing => "pushing",
            SyncPhase::Error => "error",
        }
    }
}

/// Persisted status of the sync engine, surfaced to the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEngineStatus {
    pub checkpoint: i64,
    pub last_pull_at: Option<String>,
    pub last_push_at: Option<String>,
    pub last_error: Option<String>,
    pub last_cycle_status: Option<String>,
    pub last_cycle_duration_ms: Option<i64>,
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCycleResult {
    pub status: String,
    pub pulled_count: usize,
    pub pushed_count: usize,
    pub batches_sent: usize,
    pub checkpoint: i64,
    pub duration_ms: i64,
}
