//! # logsnap
//!
//! Snapshot the logs of several applications for one time window into a
//! single zip archive.
//!
//! ## Overview
//!
//! Every application keeps its logs under a common root, each in its own
//! layout: rotated files with a start time in their name, a still-growing
//! current file, zipped archives, JSON dumps. logsnap selects the files whose
//! lifetime overlaps the window, cuts the matching entries out of each one
//! (multi-line entries stay whole) and packs the mirrored tree into
//! `logsnap_<start>_<end>.zip`.
//!
//! ## Features
//!
//! - **Time-window selection**: interval overlap between each file's lifetime and the window
//! - **Entry extraction**: multi-line aware line filtering, plain or inside zip archives
//! - **Parallel collection**: one task per source, a worker pool per directory
//! - **Batched archiving**: compressed by many threads, merged without recompressing
//! - **Registry of kinds**: new log kinds plug in as provider factories
//!
//! ## Usage
//!
//! ```no_run
//! use logsnap::collectors::collector::Collector;
//! use logsnap::collectors::registry::SourceRegistry;
//! use logsnap::models::TimeWindow;
//! use chrono::{Duration, Local};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let registry = SourceRegistry::with_builtin();
//! let collector = Collector::from_registry(
//!     &registry,
//!     &["xyz-hmi".to_string()],
//!     Path::new("/home/cell/.local/share"),
//!     "/tmp/snapshots",
//! )?;
//!
//! let now = Local::now();
//! let report = collector.collect(&TimeWindow::new(now - Duration::hours(1), now)?)?;
//! println!("Archive: {}", report.archive_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Time windows, file records and per-file/per-source results
//! - [`collectors`]: Providers, filtering, directory walking and the orchestrator
//! - [`config`]: YAML configuration and build metadata
//! - [`error`]: Typed errors of the collection entry points
//! - [`utils`]: Archiving, time parsing and run summaries
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models and structures used throughout the application
pub mod models;

/// Log providers, filters, walkers and the collection orchestrator
pub mod collectors;

/// Utility functions for compression, time parsing and reporting
pub mod utils;

/// Configuration management and build metadata
pub mod config;

/// Typed collection errors
pub mod error;

/// Application constants and configuration values
pub mod constants;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
