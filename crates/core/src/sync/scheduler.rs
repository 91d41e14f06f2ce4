//! Scheduler cadence constants for the sync engine.

/// Full pull+push cadence while the app is foregrounded, in seconds.
pub const SYNC_FULL_INTERVAL_SECS: u64 = 180;

/// Push-only cadence while the app is foregrounded, in seconds.
pub const SYNC_PUSH_INTERVAL_SECS: u64 = 20;

/// Maximum jitter (seconds) added to periodic cycle intervals.
pub const SYNC_INTERVAL_JITTER_SECS: u64 = 5;
