use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::constants::HEADER_TIME_FORMAT;

/// Inclusive time window `[start, end]` a collection is restricted to.
///
/// Construction through [`TimeWindow::new`] rejects inverted windows, so every
/// value reaching the collectors satisfies `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl TimeWindow {
    /// Create a window, failing when `start` is after `end`.
    pub fn new(start: DateTime<Local>, end: DateTime<Local>) -> anyhow::Result<Self> {
        let window = TimeWindow { start, end };
        window.validate()?;
        Ok(window)
    }

    /// Check the `start <= end` invariant.
    ///
    /// The fields are public, so the orchestrator re-validates before any I/O.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.start > self.end {
            anyhow::bail!(
                "end time {} is earlier than start time {}",
                self.end.format(HEADER_TIME_FORMAT),
                self.start.format(HEADER_TIME_FORMAT)
            );
        }
        Ok(())
    }

    /// Whether `instant` lies inside the window, both bounds included.
    pub fn contains(&self, instant: &DateTime<Local>) -> bool {
        *instant >= self.start && *instant <= self.end
    }

    /// Whether `[start, end]` overlaps this window, both bounds included.
    pub fn overlaps(&self, start: &DateTime<Local>, end: &DateTime<Local>) -> bool {
        *start <= self.end && *end >= self.start
    }
}

/// Metadata about one discovered log file.
///
/// `start_time` is the timestamp embedded in the file name. `None` marks the
/// currently active log, which always counts as the newest file of its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub file_name: String,
    pub start_time: Option<DateTime<Local>>,
    pub file_type: String,
    pub extra: BTreeMap<String, String>,
}

impl FileRecord {
    pub fn new(
        path: PathBuf,
        file_name: impl Into<String>,
        start_time: Option<DateTime<Local>>,
        file_type: impl Into<String>,
    ) -> Self {
        FileRecord {
            path,
            file_name: file_name.into(),
            start_time,
            file_type: file_type.into(),
            extra: BTreeMap::new(),
        }
    }

    /// True for the active, still-growing log file.
    pub fn is_current(&self) -> bool {
        self.start_time.is_none()
    }
}

/// Outcome of processing one file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileProcessResult {
    /// Where the extracted content was written, `None` when nothing matched.
    pub output_path: Option<PathBuf>,
    /// Non-fatal failure local to this file.
    pub error: Option<String>,
    pub file_count: usize,
    pub file_size_bytes: u64,
    pub total_lines: usize,
    pub matched_lines: usize,
    pub matched_files: usize,
}

impl FileProcessResult {
    /// A result that only carries a per-file failure.
    pub fn failed(source: &std::path::Path, error: &anyhow::Error) -> Self {
        FileProcessResult {
            error: Some(format!("{}: {:#}", source.display(), error)),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregated results of one log source.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceResult {
    pub source_name: String,
    pub output_path: Option<PathBuf>,
    pub results: Vec<FileProcessResult>,
    pub error: Option<String>,
}

impl SourceResult {
    pub fn new(source_name: impl Into<String>) -> Self {
        SourceResult {
            source_name: source_name.into(),
            ..Default::default()
        }
    }

    pub fn total_lines(&self) -> usize {
        self.results.iter().map(|r| r.total_lines).sum()
    }

    pub fn matched_lines(&self) -> usize {
        self.results.iter().map(|r| r.matched_lines).sum()
    }

    pub fn file_count(&self) -> usize {
        self.results.iter().map(|r| r.file_count).sum()
    }

    pub fn file_size_bytes(&self) -> u64 {
        self.results.iter().map(|r| r.file_size_bytes).sum()
    }

    pub fn matched_files(&self) -> usize {
        self.results.iter().map(|r| r.matched_files).sum()
    }

    pub fn failed_files(&self) -> usize {
        self.results.iter().filter(|r| r.is_error()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 2, 28, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_time_window_rejects_inverted_bounds() {
        assert!(TimeWindow::new(at(11, 0), at(10, 0)).is_err());
        assert!(TimeWindow::new(at(10, 0), at(10, 0)).is_ok());
    }

    #[test]
    fn test_time_window_bounds_are_inclusive() {
        let window = TimeWindow::new(at(10, 15), at(10, 45)).unwrap();
        assert!(window.contains(&at(10, 15)));
        assert!(window.contains(&at(10, 45)));
        assert!(!window.contains(&at(10, 46)));

        assert!(window.overlaps(&at(10, 0), &at(10, 15)));
        assert!(window.overlaps(&at(10, 45), &at(11, 0)));
        assert!(!window.overlaps(&at(10, 0), &at(10, 14)));
    }

    #[test]
    fn test_source_result_totals() {
        let mut source = SourceResult::new("xyz-hmi");
        source.results.push(FileProcessResult {
            file_count: 1,
            file_size_bytes: 100,
            total_lines: 10,
            matched_lines: 4,
            ..Default::default()
        });
        source.results.push(FileProcessResult {
            file_count: 1,
            file_size_bytes: 50,
            matched_files: 1,
            ..Default::default()
        });
        source.results.push(FileProcessResult::failed(
            std::path::Path::new("/logs/broken.log"),
            &anyhow::anyhow!("permission denied"),
        ));

        assert_eq!(source.total_lines(), 10);
        assert_eq!(source.matched_lines(), 4);
        assert_eq!(source.file_count(), 2);
        assert_eq!(source.file_size_bytes(), 150);
        assert_eq!(source.matched_files(), 1);
        assert_eq!(source.failed_files(), 1);
    }
}
