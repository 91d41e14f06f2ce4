//! Cloud synchronization for pocketledger.
//!
//! Reconciles the local embedded database with the cloud service: pull all
//! remote changes since the last checkpoint, apply them in a
//! relationship-safe table order, then push local mutations in bounded
//! batches. Consistency across the two stores is eventual; the local store
//! stays usable whatever the network does.

mod client;
mod error;
pub mod engine;
mod types;

pub use client::{cloud_api_base_url, SyncApiClient};
pub use engine::{
    run_sync_cycle, AccessTokenSource, AlertSink, ChangeStore, SyncMode, SyncRuntime,
    SyncScheduler, SyncSchedulerConfig, SyncStateStore, SyncTransport,
};
pub use error::{Result, SyncApiError};
pub use types::{ApiErrorResponse, PullChangesRequest, PullChangesResponse, PushChangesRequest};
