//! HMI server logs.
//!
//! The server writes to a plain `<name>.log` and rotates it into
//! `<name>.<YYYY-MM-DD_HH-MM-SS_ffffff>.log.zip`, a zip holding the rotated
//! `.log`. Both share the line format `2025-03-05 20:35:21.035 | INFO | ...`.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use super::stamped_record;
use crate::collectors::provider::{ClassifiedProvider, FileInfoClassifier};
use crate::collectors::reader::ReaderKind;
use crate::collectors::strategy::{ContentStrategy, LineFilter, OutputNaming};
use crate::models::FileRecord;
use crate::utils::time::parse_micros_stamp;

pub const CURRENT_SUFFIX: &str = ".log";
pub const ARCHIVE_SUFFIX: &str = ".log.zip";

const ARCHIVE_NAME_PATTERN: &str = r"(\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}_\d{6})";
const LINE_PATTERN: &str = r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}) \|";
const LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// The active log. Carries no start time, so it is always selected.
pub struct CurrentLogClassifier;

impl FileInfoClassifier for CurrentLogClassifier {
    fn is_match(&self, file_name: &str) -> bool {
        file_name.ends_with(CURRENT_SUFFIX)
    }

    fn classify(&self, path: &Path, file_name: &str) -> Result<FileRecord> {
        Ok(FileRecord::new(path.to_path_buf(), file_name, None, "log"))
    }
}

pub struct ArchiveLogClassifier {
    pattern: Regex,
}

impl ArchiveLogClassifier {
    pub fn new() -> Result<Self> {
        Ok(ArchiveLogClassifier {
            pattern: Regex::new(ARCHIVE_NAME_PATTERN)
                .context("Invalid archived server log name pattern")?,
        })
    }
}

impl FileInfoClassifier for ArchiveLogClassifier {
    fn is_match(&self, file_name: &str) -> bool {
        file_name.ends_with(ARCHIVE_SUFFIX)
    }

    fn classify(&self, path: &Path, file_name: &str) -> Result<FileRecord> {
        stamped_record(&self.pattern, path, file_name, "zip", parse_micros_stamp)
    }
}

fn line_filter(reader: ReaderKind) -> Result<LineFilter> {
    Ok(LineFilter {
        pattern: Regex::new(LINE_PATTERN).context("Invalid server log line pattern")?,
        time_format: LINE_TIME_FORMAT,
        naming: OutputNaming::ArchiveAware,
        reader,
    })
}

pub fn current_provider() -> Result<ClassifiedProvider> {
    Ok(ClassifiedProvider::new(
        "current_log",
        CurrentLogClassifier,
        &[CURRENT_SUFFIX],
        ContentStrategy::Filter(line_filter(ReaderKind::PlainFile)?),
    ))
}

pub fn archive_provider() -> Result<ClassifiedProvider> {
    Ok(ClassifiedProvider::new(
        "archive_log",
        ArchiveLogClassifier::new()?,
        &[ARCHIVE_SUFFIX],
        ContentStrategy::Filter(line_filter(ReaderKind::ZipEntry)?),
    ))
}
