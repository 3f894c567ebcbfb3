//! snapvault - A strict, deterministic backup-and-recovery engine
//!
//! Scheduled consistent dumps of live data stores, immutable object-store
//! archives, storage-side retention sweeps, block-volume snapshots, and
//! operator-driven restore with point-in-time recovery.

pub mod changelog;
pub mod cli;
pub mod config;
pub mod object_store;
pub mod observability;
pub mod packager;
pub mod pipeline;
pub mod producer;
pub mod restore;
pub mod retention;
pub mod scheduler;
pub mod secrets;
pub mod volume;
