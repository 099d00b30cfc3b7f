//! # Tarsync Core Library
//!
//! This crate provides the core functionality for the `tarsync` backup
//! orchestrator: capacity-safe planning, snapshot cataloging, and the
//! backup/restore workflows built around the external `tar`, `pv` and
//! `rsync` tools.
//!
//! It is designed to be used by the `tarsync` command-line application,
//! but its public API can also drive snapshots programmatically.
//!
//! ## Key Modules
//!
//! - [`planner`]: Projects operation sizes and verifies destination
//!   capacity before anything destructive runs.
//! - [`device`]: `df`-style device statistics for a path.
//! - [`catalog`]: Lists, paginates and renders the snapshot store.
//! - [`workflow`]: The backup and restore state machines.
//! - [`archive`] / [`sync`]: Boundaries to the external archive and
//!   synchronization tools.

pub mod archive;
pub mod catalog;
pub mod cli;
pub mod common;
pub mod config;
pub mod device;
pub mod error;
pub use error::TarsyncError;

pub mod logger;
pub mod metadata;
pub mod planner;
pub mod sync;
pub mod tools;
pub mod workflow;
