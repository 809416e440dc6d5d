//! Typed errors returned by the public collection entry points.
//!
//! Everything below the orchestrator works with `anyhow::Result`; this enum is
//! the boundary callers can match on, e.g. to tell "nothing in range" apart
//! from an archive fault.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("invalid time window: {0}")]
    InvalidTimeWindow(String),

    #[error("unsupported log source kind: {0}")]
    UnsupportedSource(String),

    #[error("no log sources to collect from")]
    NoSources,

    #[error("no logs found in range {start} to {end}")]
    NoLogsInRange { start: String, end: String },

    #[error("collection cancelled")]
    Cancelled,

    #[error("blocking collect called from inside a Tokio runtime, use collect_async")]
    NestedRuntime,

    #[error("failed to prepare workspace")]
    Workspace(#[source] anyhow::Error),

    #[error("failed to create archive {}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl CollectError {
    /// True when the run completed but nothing matched the window.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, CollectError::NoLogsInRange { .. })
    }
}

pub type CollectResult<T> = std::result::Result<T, CollectError>;
