//! JSON task dumps of the bin-packing planner, e.g.
//! `task_2025-02-28_10-20-30.json`. Copied whole.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use super::stamped_record;
use crate::collectors::provider::{ClassifiedProvider, FileInfoClassifier};
use crate::collectors::strategy::ContentStrategy;
use crate::models::FileRecord;
use crate::utils::time::parse_local;

const NAME_PATTERN: &str = r"(\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2})";
const NAME_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub struct JsonTaskClassifier {
    pattern: Regex,
}

impl JsonTaskClassifier {
    pub fn new() -> Result<Self> {
        Ok(JsonTaskClassifier {
            pattern: Regex::new(NAME_PATTERN).context("Invalid JSON task name pattern")?,
        })
    }
}

impl FileInfoClassifier for JsonTaskClassifier {
    fn is_match(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }

    fn classify(&self, path: &Path, file_name: &str) -> Result<FileRecord> {
        stamped_record(&self.pattern, path, file_name, "json", |stamp| {
            parse_local(stamp, NAME_TIME_FORMAT)
        })
    }
}

pub fn provider() -> Result<ClassifiedProvider> {
    Ok(ClassifiedProvider::new(
        "json_task",
        JsonTaskClassifier::new()?,
        &[".json"],
        ContentStrategy::Copy,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::provider::FileSourceProvider;
    use crate::models::TimeWindow;
    use chrono::{Local, TimeZone};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_provider_copies_overlapping_tasks() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path();
        fs::write(dir.join("task_2025-02-28_09-00-00.json"), "{}")?;
        fs::write(dir.join("task_2025-02-28_10-30-00.json"), r#"{"id":2}"#)?;
        fs::write(dir.join("task_2025-02-28_12-00-00.json"), "{}")?;
        fs::write(dir.join("notes.json"), "{}")?;
        fs::write(dir.join("task_2025-02-28_10-31-00.txt"), "")?;

        let provider = provider()?;
        let files = provider.find_files(dir, provider.suffixes())?;
        assert_eq!(files.len(), 4);

        let window = TimeWindow::new(
            Local.with_ymd_and_hms(2025, 2, 28, 10, 40, 0).unwrap(),
            Local.with_ymd_and_hms(2025, 2, 28, 11, 0, 0).unwrap(),
        )?;
        let records = provider.filter_files(&files, &window)?;
        let names: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["task_2025-02-28_10-30-00.json"]);

        let out_dir = dir.join("out");
        fs::create_dir(&out_dir)?;
        let result = provider.process_file(&records[0], &window, &out_dir)?;
        assert_eq!(result.matched_files, 1);
        assert_eq!(result.file_size_bytes, 8);
        assert_eq!(
            fs::read_to_string(out_dir.join("task_2025-02-28_10-30-00.json"))?,
            r#"{"id":2}"#
        );
        Ok(())
    }
}
