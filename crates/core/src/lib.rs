//! Core domain logic for pocketledger.
//!
//! This crate is I/O free. It models the change sets exchanged with the
//! cloud service, the table classification and ordering rules, migration
//! descriptors, and push batch planning. The network client and the cycle
//! engine live in `pocketledger-cloud-sync`.

pub mod sync;
