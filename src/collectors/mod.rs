//! Log collection.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Collector (one task/source)      │
//! ├─────────────────────────────────────────┤
//! │   LogSource = SourceConfig + providers  │
//! ├─────────────────────────────────────────┤
//! │  DirectoryWalker → per-directory pool   │
//! ├─────────────────────────────────────────┤
//! │  FileSourceProvider                     │
//! │  ┌────────────┬────────────┬─────────┐  │
//! │  │ classifier │ time filter│strategy │  │
//! │  └────────────┴────────────┴─────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A provider classifies file names into [`FileRecord`](crate::models::FileRecord)s,
//! keeps those overlapping the window and runs its content strategy on each.
//! The [`registry`] maps kind names to the providers making up a
//! [`LogSource`](source::LogSource).

/// Collection orchestrator and archive naming
pub mod collector;

/// Generic time-range sorting and filtering
pub mod filter;

/// Classifier and provider traits
pub mod provider;

/// Plain-file and zip-entry readers
pub mod reader;

/// Kind name to source factory mapping
pub mod registry;

/// A log tree plus its providers
pub mod source;

/// Built-in classifiers and providers
pub mod sources;

/// Content extraction strategies
pub mod strategy;

/// Recursive directory walking and worker pools
pub mod walker;
